use serde::Serialize;

use crate::color;
use crate::error::Result;
use crate::fmt;
use crate::pipeline::ranking::{DiffEntry, DiffSubset, RankedSubset, SelectionStatus};
use crate::views::{Orientation, SeriesStyle};

// ---------------------------------------------------------------------------
// Output types handed to the rendering layer
// ---------------------------------------------------------------------------

/// Value axis: tick positions, their labels and an optional fixed range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub tick_values: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Line,
    Bar,
}

/// Colour group of diff bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesGroup {
    Gain,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub category: String,
    pub value: f64,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub group: Option<SeriesGroup>,
    /// `#rrggbb`
    pub color: String,
    pub points: Vec<SeriesPoint>,
}

impl ChartSeries {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

/// One chart, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFigure {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub orientation: Orientation,
    pub category_title: String,
    pub value_title: String,
    pub status: SelectionStatus,
    pub series: Vec<ChartSeries>,
    pub axis: AxisSpec,
}

// ---------------------------------------------------------------------------
// Series assembly
// ---------------------------------------------------------------------------

/// `"{label}: 1,234 €"`
pub fn tooltip(label: &str, value: f64) -> String {
    format!("{label}: {}", fmt::amount(value))
}

fn point(category: String, value: f64, style: &SeriesStyle) -> SeriesPoint {
    SeriesPoint {
        tooltip: tooltip(&style.tooltip, value),
        category,
        value,
    }
}

/// Series of a top-N ranking, in ranking order.
pub fn ranked_series(subset: &RankedSubset, style: &SeriesStyle) -> Result<ChartSeries> {
    Ok(ChartSeries {
        label: style.label.clone(),
        group: None,
        color: color::resolve(style.color.as_deref(), 0, 1)?,
        points: subset
            .entries
            .iter()
            .map(|e| point(e.entity.to_string(), e.value, style))
            .collect(),
    })
}

/// Gain and loss series of a diff selection.
pub fn diff_series(
    subset: &DiffSubset,
    gain: &SeriesStyle,
    loss: &SeriesStyle,
) -> Result<Vec<ChartSeries>> {
    Ok(vec![
        grouped_series(&subset.gains, gain, SeriesGroup::Gain, 0)?,
        grouped_series(&subset.losses, loss, SeriesGroup::Loss, 1)?,
    ])
}

fn grouped_series(
    entries: &[DiffEntry],
    style: &SeriesStyle,
    group: SeriesGroup,
    index: usize,
) -> Result<ChartSeries> {
    Ok(ChartSeries {
        label: style.label.clone(),
        group: Some(group),
        color: color::resolve(style.color.as_deref(), index, 2)?,
        points: entries
            .iter()
            .map(|e| point(e.entity.to_string(), e.difference, style))
            .collect(),
    })
}

/// Line series over labelled periods (years or months).
pub fn line_series(
    points: impl IntoIterator<Item = (String, f64)>,
    style: &SeriesStyle,
    index: usize,
    count: usize,
) -> Result<ChartSeries> {
    Ok(ChartSeries {
        label: style.label.clone(),
        group: None,
        color: color::resolve(style.color.as_deref(), index, count)?,
        points: points
            .into_iter()
            .map(|(category, value)| point(category, value, style))
            .collect(),
    })
}
