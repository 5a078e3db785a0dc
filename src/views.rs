use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::data::model::{SchemaVariant, ValueField};
use crate::error::{PipelineError, Result};
use crate::fmt::MagnitudeUnits;

// ---------------------------------------------------------------------------
// ViewKind – the six reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    /// Export, import and volume since 2008, one line each.
    TotalVolume,
    /// Export, import and volume per month of one year.
    Monthly,
    /// Top 10 partner countries per value field.
    TopPartners,
    /// Top 10 goods per value field.
    TopGoods,
    /// Partner countries with the largest gains and losses against last year.
    DiffCountries,
    /// Goods with the largest gains and losses against last year.
    DiffGoods,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::TotalVolume,
        ViewKind::Monthly,
        ViewKind::TopPartners,
        ViewKind::TopGoods,
        ViewKind::DiffCountries,
        ViewKind::DiffGoods,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ViewKind::TotalVolume => "total-volume",
            ViewKind::Monthly => "monthly",
            ViewKind::TopPartners => "top-partners",
            ViewKind::TopGoods => "top-goods",
            ViewKind::DiffCountries => "diff-countries",
            ViewKind::DiffGoods => "diff-goods",
        }
    }

    /// Table layout the view reads.
    pub fn schema(self) -> SchemaVariant {
        match self {
            ViewKind::TotalVolume => SchemaVariant::YearlyTotal,
            ViewKind::Monthly => SchemaVariant::Monthly,
            ViewKind::TopPartners | ViewKind::DiffCountries => SchemaVariant::ByPartner,
            ViewKind::TopGoods | ViewKind::DiffGoods => SchemaVariant::ByGood,
        }
    }

    /// Whether the view is filtered by a selected year.
    pub fn uses_year(self) -> bool {
        self != ViewKind::TotalVolume
    }

    /// Only the country differences drop the non-country partner rows.
    pub fn excludes_non_countries(self) -> bool {
        self == ViewKind::DiffCountries
    }

    /// Line views draw every field into one chart; bar views draw one chart
    /// per field.
    pub fn is_timeline(self) -> bool {
        matches!(self, ViewKind::TotalVolume | ViewKind::Monthly)
    }

    pub fn orientation(self) -> Orientation {
        match self {
            ViewKind::TotalVolume | ViewKind::Monthly | ViewKind::TopPartners => {
                Orientation::Vertical
            }
            ViewKind::TopGoods | ViewKind::DiffCountries | ViewKind::DiffGoods => {
                Orientation::Horizontal
            }
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ViewKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = ViewKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown view '{s}', expected one of {}", names.join(", "))
            })
    }
}

/// Bar direction: vertical bars have categories on the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

// ---------------------------------------------------------------------------
// Typed view configuration
// ---------------------------------------------------------------------------

/// Value axis settings of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Distance between ticks, in EUR.
    pub step_size: f64,
    /// Round the data maximum up to a multiple of this before ticking.
    pub round_to: Option<f64>,
    /// Explicit axis range as factors of the (min, max) data bounds.
    pub range_padding: Option<(f64, f64)>,
    /// All charts of the view share one axis.
    pub shared: bool,
    pub units: MagnitudeUnits,
}

/// Label, tooltip prefix and colour of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub label: String,
    pub tooltip: String,
    /// Hex or named colour; `None` picks a generated hue.
    pub color: Option<String>,
}

/// One value field of a view.
///
/// Bar views draw one chart per field with `title` and `value_title`; line
/// views draw every field as a series of a single chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStyle {
    pub field: ValueField,
    /// Title template, `{year}` and `{prev_year}` are substituted.
    pub title: String,
    pub value_title: String,
    pub series: SeriesStyle,
    /// Second series of diff charts (the losses).
    pub loss_series: Option<SeriesStyle>,
}

/// Everything the pipeline needs to know about a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub kind: ViewKind,
    /// Title template of line charts.
    pub title: String,
    pub category_title: String,
    pub value_title: String,
    pub axis: AxisConfig,
    pub top_n: usize,
    pub extremes_k: usize,
    pub fields: Vec<FieldStyle>,
}

fn series(label: &str, tooltip: &str, color: &str) -> SeriesStyle {
    SeriesStyle {
        label: label.to_string(),
        tooltip: tooltip.to_string(),
        color: Some(color.to_string()),
    }
}

fn bar_field(field: ValueField, title: &str, value_title: &str, color: &str, tooltip: &str) -> FieldStyle {
    FieldStyle {
        field,
        title: title.to_string(),
        value_title: value_title.to_string(),
        series: series(value_title, tooltip, color),
        loss_series: None,
    }
}

fn line_field(field: ValueField, label: &str, color: &str) -> FieldStyle {
    FieldStyle {
        field,
        title: label.to_string(),
        value_title: label.to_string(),
        series: series(label, label, color),
        loss_series: None,
    }
}

fn diff_field(field: ValueField, title: &str, value_title: &str, gain_tip: &str, loss_tip: &str) -> FieldStyle {
    FieldStyle {
        field,
        title: title.to_string(),
        value_title: value_title.to_string(),
        series: series("Top 4 Zuwächse", gain_tip, "green"),
        loss_series: Some(series("Top 4 Rückgänge", loss_tip, "red")),
    }
}

const LINE_COLORS: [&str; 3] = ["#1f77b4", "#ff7f0e", "#2ca02c"];

impl ViewConfig {
    /// Built-in settings of each report.
    pub fn default_for(kind: ViewKind) -> Self {
        use ValueField::*;

        let axis = |step_size: f64, units: MagnitudeUnits| AxisConfig {
            step_size,
            round_to: None,
            range_padding: None,
            shared: false,
            units,
        };

        match kind {
            ViewKind::TotalVolume => ViewConfig {
                kind,
                title: "Development of Export, Import, and Trade Volume".into(),
                category_title: "Year".into(),
                value_title: "Value in €".into(),
                axis: axis(5e11, MagnitudeUnits::english()),
                top_n: 10,
                extremes_k: 4,
                fields: vec![
                    line_field(Export, "Export Volume", LINE_COLORS[0]),
                    line_field(Import, "Import Volume", LINE_COLORS[1]),
                    line_field(Volume, "Total Trade Volume", LINE_COLORS[2]),
                ],
            },
            ViewKind::Monthly => ViewConfig {
                kind,
                title: "Monatlicher Export-, Import- und Handelsverlauf Deutschlands im Jahr {year}"
                    .into(),
                category_title: "Monat".into(),
                value_title: "Wert in €".into(),
                axis: AxisConfig {
                    round_to: Some(5e10),
                    ..axis(2.5e10, MagnitudeUnits::german())
                },
                top_n: 10,
                extremes_k: 4,
                fields: vec![
                    line_field(Export, "Exportvolumen", LINE_COLORS[0]),
                    line_field(Import, "Importvolumen", LINE_COLORS[1]),
                    line_field(Volume, "Gesamthandelsvolumen", LINE_COLORS[2]),
                ],
            },
            ViewKind::TopPartners => ViewConfig {
                kind,
                title: "Top 10 Handelsländer Deutschlands".into(),
                category_title: "Land".into(),
                value_title: "Wert (Euro)".into(),
                axis: AxisConfig {
                    shared: true,
                    ..axis(2e10, MagnitudeUnits::german())
                },
                top_n: 10,
                extremes_k: 4,
                fields: vec![
                    bar_field(Export, "Top 10 Exportländer im Jahr {year}", "Export Wert (Euro)", "blue", "Wert"),
                    bar_field(Import, "Top 10 Importländer im Jahr {year}", "Import Wert (Euro)", "green", "Wert"),
                    bar_field(
                        Volume,
                        "Top 10 Handelsvolumenländer im Jahr {year}",
                        "Handelsvolumen Wert (Euro)",
                        "orange",
                        "Wert",
                    ),
                ],
            },
            ViewKind::TopGoods => ViewConfig {
                kind,
                title: "Top 10 Export- und Importprodukte nach Jahr".into(),
                category_title: "Warenkategorie".into(),
                value_title: "Wert (Euro)".into(),
                axis: AxisConfig {
                    shared: true,
                    ..axis(2e10, MagnitudeUnits::german())
                },
                top_n: 10,
                extremes_k: 4,
                fields: vec![
                    bar_field(Export, "Top 10 Exportprodukte im Jahr {year}", "Exportwert (Euro)", "blue", "Exportwert"),
                    bar_field(Import, "Top 10 Importprodukte im Jahr {year}", "Importwert (Euro)", "red", "Importwert"),
                    bar_field(
                        Volume,
                        "Top 10 Produkte nach Handelsvolumen im Jahr {year}",
                        "Handelsvolumen (Euro)",
                        "orange",
                        "Handelsvolumen",
                    ),
                ],
            },
            ViewKind::DiffCountries => ViewConfig {
                kind,
                title: "Länder mit größten Handelsdifferenzen pro Jahr".into(),
                category_title: "Land".into(),
                value_title: "Differenz (EUR)".into(),
                axis: AxisConfig {
                    range_padding: Some((1.1, 1.3)),
                    ..axis(1e9, MagnitudeUnits::german())
                },
                top_n: 10,
                extremes_k: 4,
                fields: vec![
                    diff_field(
                        Export,
                        "Exportdifferenzen für {year}",
                        "Exportdifferenz (EUR)",
                        "Höhe des Exportzuwachses",
                        "Höhe des Exportrückgangs",
                    ),
                    diff_field(
                        Import,
                        "Importdifferenzen für {year}",
                        "Importdifferenz (EUR)",
                        "Höhe des Importzuwachses",
                        "Höhe des Importrückgangs",
                    ),
                    diff_field(
                        Volume,
                        "Handelsvolumendifferenzen für {year}",
                        "Handelsvolumendifferenz (EUR)",
                        "Höhe des Handelszuwachses",
                        "Höhe des Handelsrückgangs",
                    ),
                ],
            },
            ViewKind::DiffGoods => ViewConfig {
                kind,
                title: "Handelsdifferenzen nach Warengruppe".into(),
                category_title: "Warengruppe".into(),
                value_title: "Differenz (EUR)".into(),
                axis: AxisConfig {
                    range_padding: Some((1.1, 1.3)),
                    ..axis(1e9, MagnitudeUnits::german_tsd())
                },
                top_n: 10,
                extremes_k: 4,
                fields: vec![
                    diff_field(
                        Export,
                        "Exportdifferenzen nach Warengruppe ({year} vs. {prev_year})",
                        "Exportdifferenz (EUR)",
                        "Exportzuwachs",
                        "Exportrückgang",
                    ),
                    diff_field(
                        Import,
                        "Importdifferenzen nach Warengruppe ({year} vs. {prev_year})",
                        "Importdifferenz (EUR)",
                        "Importzuwachs",
                        "Importrückgang",
                    ),
                    diff_field(
                        Volume,
                        "Handelsvolumendifferenzen nach Warengruppe ({year} vs. {prev_year})",
                        "Handelsvolumendifferenz (EUR)",
                        "Handelszuwachs",
                        "Handelsrückgang",
                    ),
                ],
            },
        }
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(PipelineError::InvalidConfig(format!("{}: {msg}", self.kind)));

        if !(self.axis.step_size.is_finite() && self.axis.step_size > 0.0) {
            return fail(format!("step_size must be positive, got {}", self.axis.step_size));
        }
        if let Some(r) = self.axis.round_to {
            if !(r.is_finite() && r > 0.0) {
                return fail(format!("round_to must be positive, got {r}"));
            }
        }
        if let Some((lo, hi)) = self.axis.range_padding {
            if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && hi > 0.0) {
                return fail(format!("range_padding factors must be positive, got ({lo}, {hi})"));
            }
        }
        if self.top_n == 0 || self.extremes_k == 0 {
            return fail("top_n and extremes_k must be at least 1".to_string());
        }
        if self.fields.is_empty() {
            return fail("at least one field is required".to_string());
        }
        for style in &self.fields {
            for s in std::iter::once(&style.series).chain(style.loss_series.as_ref()) {
                if let Some(c) = &s.color {
                    color::parse_color(c)?;
                }
            }
        }
        Ok(())
    }

    /// Substitute `{year}` and `{prev_year}` in a title template.
    pub fn render_title(template: &str, year: Option<i32>) -> String {
        match year {
            Some(y) => template
                .replace("{prev_year}", &(y - 1).to_string())
                .replace("{year}", &y.to_string()),
            None => template.to_string(),
        }
    }

    fn apply(&mut self, o: &ViewOverrides) -> Result<()> {
        let kind = self.kind;
        let reject = |key: &str, hint: &str| -> Result<()> {
            Err(PipelineError::InvalidConfig(format!("{kind}: '{key}' is not supported, {hint}")))
        };
        if o.title.is_some() && !kind.is_timeline() {
            return reject("title", "set per-field chart titles with 'titles'");
        }
        if !o.titles.is_empty() && kind.is_timeline() {
            return reject("titles", "a line view has a single 'title'");
        }
        if !o.loss_colors.is_empty() && self.fields.iter().all(|f| f.loss_series.is_none()) {
            return reject("loss_colors", "only difference views have loss series");
        }

        if let Some(v) = o.step_size {
            self.axis.step_size = v;
        }
        if let Some(v) = o.round_to {
            self.axis.round_to = Some(v);
        }
        if let Some(v) = o.range_padding {
            self.axis.range_padding = Some(v);
        }
        if let Some(v) = &o.units {
            self.axis.units = v.clone();
        }
        if let Some(v) = o.top_n {
            self.top_n = v;
        }
        if let Some(v) = o.extremes_k {
            self.extremes_k = v;
        }
        if let Some(v) = &o.title {
            self.title = v.clone();
        }
        for style in &mut self.fields {
            if let Some(c) = o.colors.get(&style.field) {
                style.series.color = Some(c.clone());
            }
            if let Some(t) = o.titles.get(&style.field) {
                style.title = t.clone();
            }
            if let (Some(loss), Some(c)) = (&mut style.loss_series, o.loss_colors.get(&style.field)) {
                loss.color = Some(c.clone());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Overrides file and catalog
// ---------------------------------------------------------------------------

/// Partial settings read from the JSON overrides file.
///
/// ```json
/// { "top-partners": { "step_size": 5e10 }, "diff-goods": { "units": { "billion": "Mrd", "million": "Mio", "thousand": "K" } } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewOverrides {
    pub step_size: Option<f64>,
    pub round_to: Option<f64>,
    pub range_padding: Option<(f64, f64)>,
    pub units: Option<MagnitudeUnits>,
    pub top_n: Option<usize>,
    pub extremes_k: Option<usize>,
    /// Chart title of a line view.
    pub title: Option<String>,
    /// Chart title per field of a bar view.
    pub titles: BTreeMap<ValueField, String>,
    /// Colour of the (gain) series per field.
    pub colors: BTreeMap<ValueField, String>,
    /// Colour of the loss series per field, difference views only.
    pub loss_colors: BTreeMap<ValueField, String>,
}

/// The configured views, keyed by kind.
#[derive(Debug, Clone)]
pub struct ViewCatalog {
    views: BTreeMap<ViewKind, ViewConfig>,
}

impl Default for ViewCatalog {
    fn default() -> Self {
        ViewCatalog {
            views: ViewKind::ALL
                .into_iter()
                .map(|k| (k, ViewConfig::default_for(k)))
                .collect(),
        }
    }
}

impl ViewCatalog {
    /// Built-in settings with the overrides of a JSON document applied.
    pub fn from_json(text: &str) -> Result<Self> {
        let overrides: BTreeMap<ViewKind, ViewOverrides> = serde_json::from_str(text)?;
        let mut catalog = ViewCatalog::default();
        for (kind, o) in &overrides {
            debug!("applying overrides to {kind}: {o:?}");
            if let Some(view) = catalog.views.get_mut(kind) {
                view.apply(o)?;
                view.validate()?;
            }
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, kind: ViewKind) -> &ViewConfig {
        // Every kind is inserted by `default()` and never removed.
        &self.views[&kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewConfig> {
        self.views.values()
    }
}
