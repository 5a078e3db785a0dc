use crate::chart::AxisSpec;
use crate::error::{PipelineError, Result};
use crate::fmt::magnitude;
use crate::views::AxisConfig;

/// Upper bound on ticks per axis; more means the step does not fit the data.
const MAX_TICKS: i64 = 1_000;

/// Ticks every `step` from `floor(min / step) * step` to
/// `ceil(max / step) * step`, both inclusive.
///
/// Ticks are computed as integer multiples of `step`, so they carry no
/// accumulated rounding error.
pub fn generate_ticks(min: f64, max: f64, step: f64) -> Result<Vec<f64>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(PipelineError::InvalidAxis(format!("step must be positive, got {step}")));
    }
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(PipelineError::InvalidAxis(format!("bad bounds ({min}, {max})")));
    }

    let first = (min / step).floor() as i64;
    let last = (max / step).ceil() as i64;
    if last - first > MAX_TICKS {
        return Err(PipelineError::InvalidAxis(format!(
            "step {step} gives {} ticks for ({min}, {max})",
            last - first + 1
        )));
    }

    Ok((first..=last).map(|k| k as f64 * step).collect())
}

/// Smallest and largest value, widened to include zero.
pub fn zero_anchored_bounds(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    values
        .into_iter()
        .fold((0.0, 0.0), |(lo, hi), v| (f64::min(lo, v), f64::max(hi, v)))
}

fn round_away(value: f64, multiple: f64) -> f64 {
    if value >= 0.0 {
        (value / multiple).ceil() * multiple
    } else {
        (value / multiple).floor() * multiple
    }
}

/// Build the value axis for data in `[min, max]`.
pub fn build_axis(min: f64, max: f64, config: &AxisConfig) -> Result<AxisSpec> {
    let (tick_min, tick_max) = match config.round_to {
        Some(r) => (round_away(min, r), round_away(max, r)),
        None => (min, max),
    };
    let tick_values = generate_ticks(tick_min, tick_max, config.step_size)?;
    let tick_labels = tick_values
        .iter()
        .map(|v| magnitude(*v, &config.units))
        .collect();
    let range = config
        .range_padding
        .map(|(lo, hi)| (min * lo, max * hi));

    Ok(AxisSpec {
        tick_values,
        tick_labels,
        range,
    })
}
