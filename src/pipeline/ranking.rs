use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use serde::Serialize;

use crate::data::filter::select_year_excluding;
use crate::data::model::{Dataset, EntityKey, TradeRecord, ValueField};

/// How a selection came out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStatus {
    Complete,
    /// No rows for the selected year.
    EmptySelection,
    /// Year-over-year view, but the prior year has no rows.
    MissingPriorYear,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Summed export and import of one partner or good.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTotals {
    pub entity: EntityKey,
    pub export: f64,
    pub import: f64,
}

impl EntityTotals {
    pub fn volume(&self) -> f64 {
        self.export + self.import
    }

    pub fn value(&self, field: ValueField) -> f64 {
        field.pick(self.export, self.import)
    }
}

/// Group rows by entity and sum their values. Groups keep first-seen order;
/// rows without an entity (national totals) are skipped.
pub fn aggregate_by_entity<'a>(rows: impl IntoIterator<Item = &'a TradeRecord>) -> Vec<EntityTotals> {
    let mut index: HashMap<EntityKey, usize> = HashMap::new();
    let mut groups: Vec<EntityTotals> = Vec::new();

    for row in rows {
        let Some(entity) = row.entity() else {
            continue;
        };
        let slot = *index.entry(entity.clone()).or_insert_with(|| {
            groups.push(EntityTotals {
                entity,
                export: 0.0,
                import: 0.0,
            });
            groups.len() - 1
        });
        groups[slot].export += row.export_value;
        groups[slot].import += row.import_value;
    }
    groups
}

/// Sum export and import per period (year or month), ascending by period.
pub fn aggregate_by_period<'a>(
    rows: impl IntoIterator<Item = &'a TradeRecord>,
    period: impl Fn(&TradeRecord) -> i32,
) -> Vec<(i32, f64, f64)> {
    let mut totals: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let slot = totals.entry(period(row)).or_default();
        slot.0 += row.export_value;
        slot.1 += row.import_value;
    }
    totals
        .into_iter()
        .map(|(p, (export, import))| (p, export, import))
        .collect()
}

/// Descending by value; ties broken by label, then code.
fn by_value_desc(a: (f64, &EntityKey), b: (f64, &EntityKey)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1))
}

/// Ascending by value; ties broken by label, then code.
fn by_value_asc(a: (f64, &EntityKey), b: (f64, &EntityKey)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

// ---------------------------------------------------------------------------
// Top-N
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub entity: EntityKey,
    pub value: f64,
}

/// Entities ranked by one value field, largest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSubset {
    pub field: ValueField,
    pub status: SelectionStatus,
    pub entries: Vec<RankedEntry>,
}

impl RankedSubset {
    pub fn max_value(&self) -> Option<f64> {
        self.entries.iter().map(|e| e.value).reduce(f64::max)
    }
}

/// Rank groups by `field` and keep the first `n`.
pub fn rank_top_n(groups: &[EntityTotals], field: ValueField, n: usize) -> RankedSubset {
    let mut entries: Vec<RankedEntry> = groups
        .iter()
        .map(|g| RankedEntry {
            entity: g.entity.clone(),
            value: g.value(field),
        })
        .collect();
    entries.sort_by(|a, b| by_value_desc((a.value, &a.entity), (b.value, &b.entity)));
    entries.truncate(n);

    RankedSubset {
        field,
        status: if groups.is_empty() {
            SelectionStatus::EmptySelection
        } else {
            SelectionStatus::Complete
        },
        entries,
    }
}

/// Select the rows of `year`, group them by entity and rank by `field`.
pub fn select_top_n(
    dataset: &Dataset,
    year: i32,
    field: ValueField,
    n: usize,
    exclude_non_countries: bool,
) -> RankedSubset {
    let rows = select_year_excluding(dataset, year, exclude_non_countries);
    rank_top_n(&aggregate_by_entity(rows), field, n)
}

// ---------------------------------------------------------------------------
// Year-over-year differences
// ---------------------------------------------------------------------------

/// An entity present in both years.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTotals {
    pub entity: EntityKey,
    pub current: EntityTotals,
    pub previous: EntityTotals,
}

/// Inner join of a year's groups with the prior year's.
#[derive(Debug, Clone, PartialEq)]
pub struct YearOverYear {
    pub year: i32,
    pub status: SelectionStatus,
    pub rows: Vec<JoinedTotals>,
}

/// Join the groups of `year` and `year - 1` on their entity key.
///
/// Entities missing from either year are dropped. A missing prior year is
/// reported through the status rather than as an empty join.
pub fn year_over_year(dataset: &Dataset, year: i32, exclude_non_countries: bool) -> YearOverYear {
    let current = aggregate_by_entity(select_year_excluding(dataset, year, exclude_non_countries));
    let previous =
        aggregate_by_entity(select_year_excluding(dataset, year - 1, exclude_non_countries));

    let status = if current.is_empty() {
        SelectionStatus::EmptySelection
    } else if previous.is_empty() {
        warn!("no rows for {}, cannot compare {year} against it", year - 1);
        SelectionStatus::MissingPriorYear
    } else {
        SelectionStatus::Complete
    };

    let mut previous: HashMap<EntityKey, EntityTotals> = previous
        .into_iter()
        .map(|g| (g.entity.clone(), g))
        .collect();
    let rows: Vec<JoinedTotals> = current
        .into_iter()
        .filter_map(|cur| {
            let prev = previous.remove(&cur.entity)?;
            Some(JoinedTotals {
                entity: cur.entity.clone(),
                current: cur,
                previous: prev,
            })
        })
        .collect();

    debug!("{year} vs {}: {} entities in both years", year - 1, rows.len());
    YearOverYear { year, status, rows }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub entity: EntityKey,
    pub current: f64,
    pub previous: f64,
    /// `current - previous`
    pub difference: f64,
}

/// Largest gains and losses of one value field.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffSubset {
    pub field: ValueField,
    pub status: SelectionStatus,
    /// Largest differences, descending.
    pub gains: Vec<DiffEntry>,
    /// Smallest differences, ascending.
    pub losses: Vec<DiffEntry>,
    /// Some entity is in both lists, which happens with fewer than `2k`
    /// joined entities.
    pub overlapping: bool,
}

impl DiffSubset {
    /// Value bounds widened to include zero.
    pub fn bounds(&self) -> (f64, f64) {
        let min = self.losses.iter().map(|e| e.difference).fold(0.0, f64::min);
        let max = self.gains.iter().map(|e| e.difference).fold(0.0, f64::max);
        (min, max)
    }
}

/// Top-`k` and bottom-`k` differences of `field`.
pub fn extremes(yoy: &YearOverYear, field: ValueField, k: usize) -> DiffSubset {
    let mut diffs: Vec<DiffEntry> = yoy
        .rows
        .iter()
        .map(|row| {
            let current = row.current.value(field);
            let previous = row.previous.value(field);
            DiffEntry {
                entity: row.entity.clone(),
                current,
                previous,
                difference: current - previous,
            }
        })
        .collect();

    diffs.sort_by(|a, b| by_value_desc((a.difference, &a.entity), (b.difference, &b.entity)));
    let gains: Vec<DiffEntry> = diffs.iter().take(k).cloned().collect();

    diffs.sort_by(|a, b| by_value_asc((a.difference, &a.entity), (b.difference, &b.entity)));
    let losses: Vec<DiffEntry> = diffs.iter().take(k).cloned().collect();

    let overlapping = gains
        .iter()
        .any(|g| losses.iter().any(|l| l.entity == g.entity));

    DiffSubset {
        field,
        status: yoy.status,
        gains,
        losses,
        overlapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SchemaVariant;

    fn partner(year: i32, name: &str, export: f64, import: f64) -> TradeRecord {
        TradeRecord {
            year,
            month: None,
            partner: Some(name.to_string()),
            good_code: None,
            good_label: None,
            export_value: export,
            import_value: import,
        }
    }

    fn good(year: i32, code: &str, label: &str, export: f64, import: f64) -> TradeRecord {
        TradeRecord {
            year,
            month: None,
            partner: None,
            good_code: Some(code.to_string()),
            good_label: Some(label.to_string()),
            export_value: export,
            import_value: import,
        }
    }

    fn partners_2024() -> Dataset {
        let mut rows = vec![partner(2024, "China", 100e9, 120e9)];
        for (i, name) in [
            "USA", "Frankreich", "Niederlande", "Polen", "Italien", "Österreich", "Schweiz",
            "Belgien", "Tschechien",
        ]
        .iter()
        .enumerate()
        {
            rows.push(partner(2024, name, 150e9 - i as f64 * 10e9, 90e9 - i as f64 * 5e9));
        }
        rows.push(partner(2023, "China", 97e9, 157e9));
        Dataset::from_records(SchemaVariant::ByPartner, rows)
    }

    #[test]
    fn china_leads_imports() {
        let ds = partners_2024();
        let ranked = select_top_n(&ds, 2024, ValueField::Import, 10, false);
        assert_eq!(ranked.entries[0].entity.label, "China");
        assert_eq!(ranked.entries[0].value, 120e9);
        assert_eq!(ranked.entries.len(), 10);
    }

    #[test]
    fn top_n_is_bounded_and_non_increasing() {
        let ds = partners_2024();
        for field in ValueField::ALL {
            for n in [1, 3, 10, 25] {
                let ranked = select_top_n(&ds, 2024, field, n, false);
                assert!(ranked.entries.len() <= n.min(10));
                assert!(ranked.entries.windows(2).all(|w| w[0].value >= w[1].value));
            }
        }
    }

    #[test]
    fn unknown_year_gives_empty_selection() {
        let ds = partners_2024();
        let ranked = select_top_n(&ds, 1990, ValueField::Export, 10, false);
        assert!(ranked.entries.is_empty());
        assert_eq!(ranked.status, SelectionStatus::EmptySelection);
    }

    #[test]
    fn ties_are_broken_by_label() {
        let ds = Dataset::from_records(
            SchemaVariant::ByPartner,
            vec![
                partner(2024, "Zypern", 5.0, 0.0),
                partner(2024, "Albanien", 5.0, 0.0),
                partner(2024, "Malta", 7.0, 0.0),
            ],
        );
        let ranked = select_top_n(&ds, 2024, ValueField::Export, 10, false);
        let names: Vec<_> = ranked.entries.iter().map(|e| e.entity.label.as_str()).collect();
        assert_eq!(names, vec!["Malta", "Albanien", "Zypern"]);
    }

    #[test]
    fn groups_goods_by_code_and_label() {
        let rows = [
            good(2024, "WA87", "Kraftwagen", 100.0, 20.0),
            good(2024, "WA84", "Maschinen", 80.0, 30.0),
            good(2024, "WA87", "Kraftwagen", 50.0, 5.0),
        ];
        let groups = aggregate_by_entity(rows.iter());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].entity, EntityKey::with_code("Kraftwagen", "WA87"));
        assert_eq!(groups[0].export, 150.0);
        assert_eq!(groups[0].import, 25.0);
        for g in &groups {
            let summed: f64 = rows
                .iter()
                .filter(|r| r.entity().as_ref() == Some(&g.entity))
                .map(|r| r.export_value + r.import_value)
                .sum();
            assert!((g.volume() - summed).abs() < 1e-9);
        }
    }

    #[test]
    fn aggregates_periods_in_order() {
        let mut a = partner(2024, "X", 1.0, 2.0);
        a.month = Some(3);
        let mut b = partner(2024, "Y", 4.0, 8.0);
        b.month = Some(1);
        let mut c = partner(2024, "Z", 1.0, 1.0);
        c.month = Some(3);
        let rows = [a, b, c];
        let periods = aggregate_by_period(rows.iter(), |r| r.month.map(i32::from).unwrap_or(0));
        assert_eq!(periods, vec![(1, 4.0, 8.0), (3, 2.0, 3.0)]);
    }

    fn diff_dataset() -> Dataset {
        let mut rows = Vec::new();
        // ten countries, 2023 baseline 100, 2024 moves by (i - 5) * 1e9
        for i in 0..10 {
            let name = format!("Land {i}");
            rows.push(partner(2023, &name, 100e9, 50e9));
            rows.push(partner(2024, &name, 100e9 + (i as f64 - 5.0) * 1e9, 50e9));
        }
        rows.push(partner(2023, "Nicht ermittelte Länder und Gebiete", 1e9, 1e9));
        rows.push(partner(2024, "Nicht ermittelte Länder und Gebiete", 90e9, 1e9));
        rows.push(partner(2024, "Neu dabei", 80e9, 0.0));
        Dataset::from_records(SchemaVariant::ByPartner, rows)
    }

    #[test]
    fn diff_extremes_are_disjoint_with_enough_entities() {
        let ds = diff_dataset();
        let yoy = year_over_year(&ds, 2024, true);
        assert_eq!(yoy.status, SelectionStatus::Complete);
        // "Neu dabei" has no 2023 row and the sentinel is excluded
        assert_eq!(yoy.rows.len(), 10);

        let subset = extremes(&yoy, ValueField::Export, 4);
        let gains: Vec<_> = subset.gains.iter().map(|e| e.difference).collect();
        let losses: Vec<_> = subset.losses.iter().map(|e| e.difference).collect();
        assert_eq!(gains, vec![4e9, 3e9, 2e9, 1e9]);
        assert_eq!(losses, vec![-5e9, -4e9, -3e9, -2e9]);
        assert!(!subset.overlapping);
        assert_eq!(subset.bounds(), (-5e9, 4e9));
    }

    #[test]
    fn sentinel_rows_stay_when_not_excluded() {
        let ds = diff_dataset();
        let yoy = year_over_year(&ds, 2024, false);
        let subset = extremes(&yoy, ValueField::Export, 4);
        assert_eq!(subset.gains[0].entity.label, "Nicht ermittelte Länder und Gebiete");
    }

    #[test]
    fn few_entities_overlap_and_are_flagged() {
        let ds = Dataset::from_records(
            SchemaVariant::ByPartner,
            vec![
                partner(2023, "A", 10.0, 0.0),
                partner(2023, "B", 10.0, 0.0),
                partner(2023, "C", 10.0, 0.0),
                partner(2024, "A", 15.0, 0.0),
                partner(2024, "B", 5.0, 0.0),
                partner(2024, "C", 11.0, 0.0),
            ],
        );
        let subset = extremes(&year_over_year(&ds, 2024, false), ValueField::Volume, 4);
        assert_eq!(subset.gains.len(), 3);
        assert_eq!(subset.losses.len(), 3);
        assert!(subset.overlapping);
        assert_eq!(subset.gains[0].entity.label, "A");
        assert_eq!(subset.losses[0].entity.label, "B");
    }

    #[test]
    fn missing_prior_year_is_explicit() {
        let ds = Dataset::from_records(
            SchemaVariant::ByPartner,
            vec![partner(2008, "China", 1.0, 1.0)],
        );
        let yoy = year_over_year(&ds, 2008, false);
        assert_eq!(yoy.status, SelectionStatus::MissingPriorYear);
        let subset = extremes(&yoy, ValueField::Import, 4);
        assert!(subset.gains.is_empty() && subset.losses.is_empty());
        assert_eq!(subset.status, SelectionStatus::MissingPriorYear);
        assert_eq!(subset.bounds(), (0.0, 0.0));
    }
}
