use log::debug;

use super::model::{Dataset, TradeRecord};
use crate::error::{PipelineError, Result};

/// Rows that are not trading partners in the country statistics:
/// undetermined territories and ship/aircraft supplies.
pub const NON_COUNTRY_PARTNERS: &[&str] = &[
    "Nicht ermittelte Länder und Gebiete",
    "Schiffs- und Luftfahrzeugbedarf",
];

/// Whether a record belongs to one of the [`NON_COUNTRY_PARTNERS`].
pub fn is_non_country(record: &TradeRecord) -> bool {
    record
        .partner
        .as_deref()
        .is_some_and(|p| NON_COUNTRY_PARTNERS.contains(&p))
}

/// Return the records of `year`, in source order.
///
/// A year that is not in the dataset yields an empty selection, not an error.
pub fn select_year(dataset: &Dataset, year: i32) -> Vec<&TradeRecord> {
    let rows: Vec<&TradeRecord> = dataset.records.iter().filter(|r| r.year == year).collect();
    if rows.is_empty() {
        debug!("no {} rows for year {year}", dataset.variant);
    }
    rows
}

/// Like [`select_year`], optionally dropping the non-country partner rows.
pub fn select_year_excluding(
    dataset: &Dataset,
    year: i32,
    exclude_non_countries: bool,
) -> Vec<&TradeRecord> {
    select_year(dataset, year)
        .into_iter()
        .filter(|r| !(exclude_non_countries && is_non_country(r)))
        .collect()
}

/// Check a user-selected year against the years present in the dataset.
pub fn validate_year(dataset: &Dataset, year: i32) -> Result<i32> {
    if dataset.contains_year(year) {
        Ok(year)
    } else {
        Err(PipelineError::UnknownYear {
            year,
            available: dataset.years.iter().copied().collect(),
        })
    }
}
