use serde::{Deserialize, Serialize};

/// Suffixes for thousand / million / billion axis labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagnitudeUnits {
    pub billion: String,
    pub million: String,
    pub thousand: String,
}

impl MagnitudeUnits {
    /// `Mrd` / `Mio` / `K`
    pub fn german() -> Self {
        Self::new("Mrd", "Mio", "K")
    }

    /// `Mrd` / `Mio` / `Tsd`
    pub fn german_tsd() -> Self {
        Self::new("Mrd", "Mio", "Tsd")
    }

    /// `Bn` / `M` / `K`
    pub fn english() -> Self {
        Self::new("Bn", "M", "K")
    }

    fn new(billion: &str, million: &str, thousand: &str) -> Self {
        MagnitudeUnits {
            billion: billion.to_string(),
            million: million.to_string(),
            thousand: thousand.to_string(),
        }
    }
}

impl Default for MagnitudeUnits {
    fn default() -> Self {
        Self::german()
    }
}

/// Short axis label for an amount: `1 Mrd`, `250 Mio`, `-3 K`, `12`.
///
/// The scaled value is truncated toward zero, so 999,999,999 is `999 Mio`
/// and not `1 Mrd`.
pub fn magnitude(value: f64, units: &MagnitudeUnits) -> String {
    let abs = value.abs();
    let (divisor, suffix) = if abs >= 1e9 {
        (1e9, units.billion.as_str())
    } else if abs >= 1e6 {
        (1e6, units.million.as_str())
    } else if abs >= 1e3 {
        (1e3, units.thousand.as_str())
    } else {
        return format!("{}", value.trunc() as i64);
    };
    format!("{} {suffix}", (value / divisor).trunc() as i64)
}

/// [`magnitude`] with the German `Mrd` / `Mio` / `K` suffixes.
pub fn format_magnitude(value: f64) -> String {
    magnitude(value, &MagnitudeUnits::german())
}

/// Format a euro amount with thousands separators: `1,234,567 €`
pub fn amount(val: f64) -> String {
    let negative = val < 0.0 && val.abs().round() > 0.0;
    let whole = format!("{:.0}", val.abs());

    let mut with_commas = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{with_commas} €")
    } else {
        format!("{with_commas} €")
    }
}
