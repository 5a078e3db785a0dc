use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a source table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell as it comes out of CSV, JSON or Parquet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the cell as an `f64`. Text is parsed, so `"1.5e9"` works.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Null => None,
        }
    }

    /// Interpret the cell as a whole number. Integer-valued floats such as
    /// `2024.0` (what pandas writes for nullable int columns) are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            CellValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| CellValue::Float(s.parse::<f64>().ok()?).as_i64())
            }
            _ => None,
        }
    }

    /// Non-empty text form of the cell, if any.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// One source row: column name → cell.
pub type Row = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// SchemaVariant / Column
// ---------------------------------------------------------------------------

/// The four table layouts the reports read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaVariant {
    /// One row per year with national totals.
    YearlyTotal,
    /// One row per year and month with national totals.
    Monthly,
    /// One row per year and trading partner.
    ByPartner,
    /// One row per year and good (code + label).
    ByGood,
}

impl SchemaVariant {
    pub fn name(self) -> &'static str {
        match self {
            SchemaVariant::YearlyTotal => "yearly-total",
            SchemaVariant::Monthly => "monthly",
            SchemaVariant::ByPartner => "by-partner",
            SchemaVariant::ByGood => "by-good",
        }
    }

    /// Columns that must be present for this layout.
    pub fn required_columns(self) -> &'static [Column] {
        use Column::*;
        match self {
            SchemaVariant::YearlyTotal => &[Year, Export, Import],
            SchemaVariant::Monthly => &[Year, Month, Export, Import],
            SchemaVariant::ByPartner => &[Year, Partner, Export, Import],
            SchemaVariant::ByGood => &[Year, GoodLabel, Export, Import],
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical columns of a trade table and the header names they go by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Year,
    Month,
    Partner,
    GoodCode,
    GoodLabel,
    Export,
    Import,
}

impl Column {
    /// Identifier columns, read as text whatever they look like.
    pub const TEXT: [Column; 3] = [Column::Partner, Column::GoodCode, Column::GoodLabel];

    /// Canonical name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Column::Year => "year",
            Column::Month => "month",
            Column::Partner => "partner",
            Column::GoodCode => "code",
            Column::GoodLabel => "label",
            Column::Export => "export",
            Column::Import => "import",
        }
    }

    /// Header names accepted for this column, first match wins.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Year => &["Jahr", "year"],
            Column::Month => &["Monat", "month"],
            Column::Partner => &["Land", "partner", "country"],
            Column::GoodCode => &["Code", "code"],
            Column::GoodLabel => &["Label", "label"],
            Column::Export => &["export_wert", "gesamt_export", "Ausfuhr: Wert", "export"],
            Column::Import => &["import_wert", "gesamt_import", "Einfuhr: Wert", "import"],
        }
    }

    /// Find the cell for this column in a row.
    pub fn lookup(self, row: &Row) -> Option<&CellValue> {
        self.aliases().iter().find_map(|alias| row.get(*alias))
    }

    /// Whether any of the headers matches this column.
    pub fn present_in<'a>(self, headers: impl IntoIterator<Item = &'a str>) -> bool {
        let aliases = self.aliases();
        headers.into_iter().any(|h| aliases.contains(&h))
    }
}

// ---------------------------------------------------------------------------
// ValueField
// ---------------------------------------------------------------------------

/// The three value columns every view can chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueField {
    Export,
    Import,
    Volume,
}

impl ValueField {
    pub const ALL: [ValueField; 3] = [ValueField::Export, ValueField::Import, ValueField::Volume];

    pub fn name(self) -> &'static str {
        match self {
            ValueField::Export => "export",
            ValueField::Import => "import",
            ValueField::Volume => "volume",
        }
    }

    /// Pick this field out of an export/import pair.
    pub fn pick(self, export: f64, import: f64) -> f64 {
        match self {
            ValueField::Export => export,
            ValueField::Import => import,
            ValueField::Volume => export + import,
        }
    }
}

// ---------------------------------------------------------------------------
// EntityKey
// ---------------------------------------------------------------------------

/// Grouping key of ranked views: a partner country, or a good.
///
/// Ordering is label first, then code, which is also the ranking tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityKey {
    pub label: String,
    pub code: Option<String>,
}

impl EntityKey {
    pub fn new(label: impl Into<String>) -> Self {
        EntityKey {
            label: label.into(),
            code: None,
        }
    }

    pub fn with_code(label: impl Into<String>, code: impl Into<String>) -> Self {
        EntityKey {
            label: label.into(),
            code: Some(code.into()),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

// ---------------------------------------------------------------------------
// TradeRecord – one row of a trade table
// ---------------------------------------------------------------------------

/// A single validated row of a trade table. Values are in EUR.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub year: i32,
    /// 1–12, monthly tables only.
    pub month: Option<u8>,
    pub partner: Option<String>,
    pub good_code: Option<String>,
    pub good_label: Option<String>,
    pub export_value: f64,
    pub import_value: f64,
}

impl TradeRecord {
    /// Export plus import. Never smaller than either of them.
    pub fn trade_volume(&self) -> f64 {
        self.export_value + self.import_value
    }

    pub fn value(&self, field: ValueField) -> f64 {
        field.pick(self.export_value, self.import_value)
    }

    /// Grouping key for ranked views; `None` for national totals.
    pub fn entity(&self) -> Option<EntityKey> {
        if let Some(partner) = &self.partner {
            return Some(EntityKey::new(partner.clone()));
        }
        self.good_label.as_ref().map(|label| EntityKey {
            label: label.clone(),
            code: self.good_code.clone(),
        })
    }

    /// Validate a raw row against a layout and build the record.
    pub fn from_row(variant: SchemaVariant, row: &Row, row_no: usize) -> Result<Self> {
        let year = required(row, Column::Year, row_no)?
            .as_i64()
            .filter(|y| (1..=9999).contains(y))
            .ok_or_else(|| bad_cell(row, Column::Year, row_no, "not a valid year"))?
            as i32;

        let month = match variant {
            SchemaVariant::Monthly => Some(
                required(row, Column::Month, row_no)?
                    .as_i64()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| bad_cell(row, Column::Month, row_no, "month must be 1-12"))?
                    as u8,
            ),
            _ => None,
        };

        let partner = match variant {
            SchemaVariant::ByPartner => Some(required_text(row, Column::Partner, row_no)?),
            _ => None,
        };

        let (good_code, good_label) = match variant {
            SchemaVariant::ByGood => (
                Column::GoodCode.lookup(row).and_then(CellValue::as_text),
                Some(required_text(row, Column::GoodLabel, row_no)?),
            ),
            _ => (None, None),
        };

        Ok(TradeRecord {
            year,
            month,
            partner,
            good_code,
            good_label,
            export_value: amount(row, Column::Export, row_no)?,
            import_value: amount(row, Column::Import, row_no)?,
        })
    }
}

fn required(row: &Row, column: Column, row_no: usize) -> Result<&CellValue> {
    match column.lookup(row) {
        Some(CellValue::Null) | None => Err(PipelineError::integrity(
            column.name(),
            Some(row_no),
            "missing value",
        )),
        Some(cell) => Ok(cell),
    }
}

fn required_text(row: &Row, column: Column, row_no: usize) -> Result<String> {
    required(row, column, row_no)?
        .as_text()
        .ok_or_else(|| PipelineError::integrity(column.name(), Some(row_no), "empty value"))
}

fn amount(row: &Row, column: Column, row_no: usize) -> Result<f64> {
    let value = required(row, column, row_no)?
        .as_f64()
        .ok_or_else(|| bad_cell(row, column, row_no, "not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(bad_cell(row, column, row_no, "must be a finite, non-negative amount"));
    }
    Ok(value)
}

fn bad_cell(row: &Row, column: Column, row_no: usize, reason: &str) -> PipelineError {
    let shown = column
        .lookup(row)
        .map(|c| c.to_string())
        .unwrap_or_default();
    PipelineError::integrity(column.name(), Some(row_no), format!("'{shown}' {reason}"))
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// A loaded trade table with its pre-computed year index.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub variant: SchemaVariant,
    /// All records, in source order.
    pub records: Vec<TradeRecord>,
    /// Sorted set of years present in `records`.
    pub years: BTreeSet<i32>,
}

impl Dataset {
    /// Build the year index from the loaded records.
    pub fn from_records(variant: SchemaVariant, records: Vec<TradeRecord>) -> Self {
        let years = records.iter().map(|r| r.year).collect();
        Dataset {
            variant,
            records,
            years,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.years.contains(&year)
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.last().copied()
    }
}
