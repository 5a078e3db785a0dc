use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::pretty::pretty_format_batches;
use log::{debug, info, log_enabled, Level};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, Dataset, Row, SchemaVariant, TradeRecord};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a trade table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "Jahr": 2024, "Land": "China", ... }, ...]`
/// * `.parquet` – flat table with integer, float and string columns
///
/// Column headers are matched against the names used by the published
/// tables (`Jahr`, `Land`, `export_wert`, `Ausfuhr: Wert`, ...) as well as
/// plain English names. Unknown columns are ignored.
pub fn load_file(path: &Path, variant: SchemaVariant) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => read_csv(std::fs::File::open(path)?)?,
        "json" => read_json(&std::fs::read_to_string(path)?)?,
        "parquet" | "pq" => read_parquet(std::fs::File::open(path)?)?,
        other => return Err(PipelineError::UnsupportedFormat(other.to_string())),
    };
    info!("loaded {} rows from {}", table.rows.len(), path.display());

    build_dataset(variant, &table)
}

/// Raw table as read from a file: column names and untyped rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in file order. Known even when there are no rows.
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Validate a raw table against a layout and build the dataset.
///
/// Required columns are checked against the headers, so a header-only file
/// that lacks one fails the same way a populated one does.
pub fn build_dataset(variant: SchemaVariant, table: &Table) -> Result<Dataset> {
    for column in variant.required_columns() {
        if !column.present_in(table.headers.iter().map(String::as_str)) {
            return Err(PipelineError::integrity(
                column.name(),
                None,
                format!("column missing from {variant} table"),
            ));
        }
    }

    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| TradeRecord::from_row(variant, row, i))
        .collect::<Result<Vec<_>>>()?;

    let dataset = Dataset::from_records(variant, records);
    debug!(
        "{variant} dataset: {} records, years {:?}..{:?}",
        dataset.len(),
        dataset.years.first(),
        dataset.years.last()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Header row with column names. Cells are typed by [`guess_cell_type`],
/// except in identifier columns (partner, good code and label), which stay
/// text so codes like `0101` keep their leading zeros.
pub fn read_csv<R: std::io::Read>(input: R) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let text_only: Vec<bool> = headers
        .iter()
        .map(|h| Column::TEXT.iter().any(|c| c.present_in([h.as_str()])))
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Row = headers
            .iter()
            .zip(&text_only)
            .zip(record.iter())
            .map(|((name, &text), value)| {
                let cell = if text {
                    text_cell(value)
                } else {
                    guess_cell_type(value)
                };
                (name.clone(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

fn text_cell(s: &str) -> CellValue {
    match s.trim() {
        "" => CellValue::Null,
        s => CellValue::Text(s.to_string()),
    }
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "Jahr": 2024, "Land": "China", "export_wert": 9.0e10, "import_wert": 1.57e11 },
///   ...
/// ]
/// ```
///
/// Headers are the keys seen in any record, in first-seen order. An empty
/// array has no headers.
pub fn read_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text)?;
    let records = root
        .as_array()
        .ok_or_else(|| PipelineError::integrity("<root>", None, "expected a JSON array"))?;

    let mut table = Table::default();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| PipelineError::integrity("<record>", Some(i), "not a JSON object"))?;
        for key in obj.keys() {
            if !table.headers.contains(key) {
                table.headers.push(key.clone());
            }
        }
        table.rows.push(
            obj.iter()
                .map(|(key, val)| (key.clone(), json_to_cell(val)))
                .collect(),
        );
    }
    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
pub fn read_parquet(file: std::fs::File) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        if rows.is_empty() && log_enabled!(Level::Debug) {
            let head = batch.slice(0, batch.num_rows().min(5));
            debug!("first parquet rows:\n{}", pretty_format_batches(&[head])?);
        }

        let offset = rows.len();
        for row in 0..batch.num_rows() {
            let cells: Row = schema
                .fields()
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let value = extract_cell(batch.column(i), row)
                        .map_err(|reason| PipelineError::integrity(field.name(), Some(offset + row), reason))?;
                    Ok((field.name().clone(), value))
                })
                .collect::<Result<_>>()?;
            rows.push(cells);
        }
    }
    Ok(Table { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> std::result::Result<CellValue, String> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let mismatch = || format!("column data does not match its {:?} type", col.data_type());
    let value = match col.data_type() {
        DataType::Utf8 => {
            let s = col.as_any().downcast_ref::<StringArray>().ok_or_else(mismatch)?;
            CellValue::Text(s.value(row).to_string())
        }
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().ok_or_else(mismatch)?;
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?;
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().ok_or_else(mismatch)?;
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?;
            CellValue::Float(arr.value(row))
        }
        // Columns the reports never read (booleans, dates, ...) are kept as text.
        other => CellValue::Text(format!("{other:?}")),
    };
    Ok(value)
}
