//! Aggregation and formatting pipeline: dataset + view + year → chart figures.
//!
//! ```text
//!   Dataset ──select year──▶ rows ──group / rank / diff──▶ subsets
//!                                                           │
//!          ViewConfig (step, units, styles) ────────────────┤
//!                                                           ▼
//!                                        ticks + series ──▶ ChartFigure
//! ```
//!
//! Every call recomputes from the immutable dataset; nothing is cached.

pub mod ranking;
pub mod ticks;

use log::debug;

use crate::chart::{self, AxisSpec, ChartFigure, ChartKind};
use crate::data::filter::select_year;
use crate::data::model::Dataset;
use crate::error::{PipelineError, Result};
use crate::views::{FieldStyle, ViewConfig, ViewKind};
use ranking::{
    aggregate_by_entity, aggregate_by_period, extremes, rank_top_n, year_over_year, SelectionStatus,
};
use ticks::{build_axis, zero_anchored_bounds};

/// Month labels of the monthly view.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
];

/// Build the figures of `view` for `year`.
///
/// `year` is ignored by the total-volume view; other views fall back to the
/// latest year of the dataset when it is `None`. A year without rows yields
/// figures with empty series.
pub fn render(dataset: &Dataset, view: &ViewConfig, year: Option<i32>) -> Result<Vec<ChartFigure>> {
    if dataset.variant != view.kind.schema() {
        return Err(PipelineError::SchemaMismatch {
            view: view.kind.to_string(),
            expected: view.kind.schema().to_string(),
            found: dataset.variant.to_string(),
        });
    }

    if view.kind == ViewKind::TotalVolume {
        return Ok(vec![timeline(dataset, view, None)?]);
    }

    let year = year
        .or_else(|| dataset.latest_year())
        .ok_or(PipelineError::NoYears)?;
    debug!("rendering {} for {year}", view.kind);

    match view.kind {
        ViewKind::Monthly => Ok(vec![timeline(dataset, view, Some(year))?]),
        ViewKind::TopPartners | ViewKind::TopGoods => top_n_figures(dataset, view, year),
        _ => diff_figures(dataset, view, year),
    }
}

fn figure(
    view: &ViewConfig,
    style: &FieldStyle,
    year: i32,
    status: SelectionStatus,
    series: Vec<chart::ChartSeries>,
    axis: AxisSpec,
) -> ChartFigure {
    ChartFigure {
        id: format!("{}-{}", view.kind, style.field.name()),
        title: ViewConfig::render_title(&style.title, Some(year)),
        kind: ChartKind::Bar,
        orientation: view.kind.orientation(),
        category_title: view.category_title.clone(),
        value_title: style.value_title.clone(),
        status,
        series,
        axis,
    }
}

// ---------------------------------------------------------------------------
// Line views
// ---------------------------------------------------------------------------

/// One line chart, one series per field. Yearly when `year` is `None`,
/// else the months of `year`.
fn timeline(dataset: &Dataset, view: &ViewConfig, year: Option<i32>) -> Result<ChartFigure> {
    let periods = match year {
        None => aggregate_by_period(&dataset.records, |r| r.year),
        Some(y) => aggregate_by_period(select_year(dataset, y), |r| {
            r.month.map(i32::from).unwrap_or_default()
        }),
    };
    let label = |p: i32| match year {
        None => p.to_string(),
        Some(_) => MONTH_LABELS
            .get((p - 1) as usize)
            .map(|m| m.to_string())
            .unwrap_or_else(|| p.to_string()),
    };

    let count = view.fields.len();
    let series = view
        .fields
        .iter()
        .enumerate()
        .map(|(i, style)| {
            let points = periods
                .iter()
                .map(|&(p, export, import)| (label(p), style.field.pick(export, import)));
            chart::line_series(points, &style.series, i, count)
        })
        .collect::<Result<Vec<_>>>()?;

    let (min, max) = zero_anchored_bounds(series.iter().flat_map(|s| s.values()));
    let status = if periods.is_empty() {
        SelectionStatus::EmptySelection
    } else {
        SelectionStatus::Complete
    };

    Ok(ChartFigure {
        id: view.kind.to_string(),
        title: ViewConfig::render_title(&view.title, year),
        kind: ChartKind::Line,
        orientation: view.kind.orientation(),
        category_title: view.category_title.clone(),
        value_title: view.value_title.clone(),
        status,
        series,
        axis: build_axis(min, max, &view.axis)?,
    })
}

// ---------------------------------------------------------------------------
// Top-N views
// ---------------------------------------------------------------------------

fn top_n_figures(dataset: &Dataset, view: &ViewConfig, year: i32) -> Result<Vec<ChartFigure>> {
    let groups = aggregate_by_entity(select_year(dataset, year));
    let rankings: Vec<_> = view
        .fields
        .iter()
        .map(|style| rank_top_n(&groups, style.field, view.top_n))
        .collect();

    let shared_max = rankings
        .iter()
        .filter_map(|r| r.max_value())
        .fold(0.0, f64::max);

    view.fields
        .iter()
        .zip(&rankings)
        .map(|(style, ranking)| -> Result<ChartFigure> {
            let max = if view.axis.shared {
                shared_max
            } else {
                ranking.max_value().unwrap_or(0.0)
            };
            let axis = build_axis(0.0, max.max(0.0), &view.axis)?;
            let series = vec![chart::ranked_series(ranking, &style.series)?];
            Ok(figure(view, style, year, ranking.status, series, axis))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diff views
// ---------------------------------------------------------------------------

fn diff_figures(dataset: &Dataset, view: &ViewConfig, year: i32) -> Result<Vec<ChartFigure>> {
    let yoy = year_over_year(dataset, year, view.kind.excludes_non_countries());

    view.fields
        .iter()
        .map(|style| -> Result<ChartFigure> {
            let subset = extremes(&yoy, style.field, view.extremes_k);
            if subset.overlapping {
                debug!(
                    "{}: gains and losses overlap, only {} entities in both years",
                    style.field.name(),
                    yoy.rows.len()
                );
            }
            let (min, max) = subset.bounds();
            let axis = build_axis(min, max, &view.axis)?;
            let loss_style = style.loss_series.as_ref().unwrap_or(&style.series);
            let series = chart::diff_series(&subset, &style.series, loss_style)?;
            Ok(figure(view, style, year, subset.status, series, axis))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{SchemaVariant, TradeRecord};
    use crate::views::ViewCatalog;

    fn record(year: i32) -> TradeRecord {
        TradeRecord {
            year,
            month: None,
            partner: None,
            good_code: None,
            good_label: None,
            export_value: 0.0,
            import_value: 0.0,
        }
    }

    fn partner(year: i32, name: &str, export: f64, import: f64) -> TradeRecord {
        TradeRecord {
            partner: Some(name.to_string()),
            export_value: export,
            import_value: import,
            ..record(year)
        }
    }

    fn monthly(year: i32, month: u8, export: f64, import: f64) -> TradeRecord {
        TradeRecord {
            month: Some(month),
            export_value: export,
            import_value: import,
            ..record(year)
        }
    }

    fn good(year: i32, label: &str, export: f64, import: f64) -> TradeRecord {
        TradeRecord {
            good_code: Some(format!("WA{}", label.len())),
            good_label: Some(label.to_string()),
            export_value: export,
            import_value: import,
            ..record(year)
        }
    }

    #[test]
    fn top_partners_share_one_axis() {
        let ds = Dataset::from_records(
            SchemaVariant::ByPartner,
            vec![
                partner(2024, "USA", 161e9, 92e9),
                partner(2024, "China", 90e9, 157e9),
                partner(2024, "Frankreich", 118e9, 69e9),
            ],
        );
        let catalog = ViewCatalog::default();
        let figures = render(&ds, catalog.get(ViewKind::TopPartners), Some(2024)).unwrap();
        assert_eq!(figures.len(), 3);
        assert_eq!(figures[0].title, "Top 10 Exportländer im Jahr 2024");
        assert_eq!(figures[1].series[0].points[0].category, "China");
        assert_eq!(figures[2].series[0].points[0].category, "USA");
        assert_eq!(figures[2].series[0].points[0].value, 253e9);
        // volume max 253e9 → 260e9 in 20e9 steps, on every chart
        for f in &figures {
            assert_eq!(f.axis.tick_values.last().copied(), Some(260e9));
            assert_eq!(f.axis.tick_labels[1], "20 Mrd");
            assert_eq!(f.kind, ChartKind::Bar);
        }
    }

    #[test]
    fn diff_countries_excludes_sentinels_and_pads_range() {
        let ds = Dataset::from_records(
            SchemaVariant::ByPartner,
            vec![
                partner(2023, "USA", 150e9, 90e9),
                partner(2024, "USA", 161e9, 92e9),
                partner(2023, "China", 97e9, 157e9),
                partner(2024, "China", 90e9, 157e9),
                partner(2023, "Schiffs- und Luftfahrzeugbedarf", 1e9, 0.0),
                partner(2024, "Schiffs- und Luftfahrzeugbedarf", 50e9, 0.0),
            ],
        );
        let catalog = ViewCatalog::default();
        let figures = render(&ds, catalog.get(ViewKind::DiffCountries), Some(2024)).unwrap();
        let export = &figures[0];
        assert_eq!(export.title, "Exportdifferenzen für 2024");
        assert_eq!(export.series.len(), 2);
        let gains: Vec<_> = export.series[0].points.iter().map(|p| p.category.as_str()).collect();
        assert!(!gains.contains(&"Schiffs- und Luftfahrzeugbedarf"));
        assert!(export.axis.tick_values.contains(&0.0));
        assert_eq!(export.axis.tick_values.first().copied(), Some(-7e9));
        assert_eq!(export.axis.tick_values.last().copied(), Some(11e9));
        let (lo, hi) = export.axis.range.unwrap();
        assert!((lo - -7.7e9).abs() < 1.0 && (hi - 14.3e9).abs() < 1.0);
    }

    #[test]
    fn diff_goods_without_prior_year_is_empty_not_an_error() {
        let ds = Dataset::from_records(
            SchemaVariant::ByGood,
            vec![good(2008, "Kraftwagen", 5e9, 1e9)],
        );
        let catalog = ViewCatalog::default();
        let figures = render(&ds, catalog.get(ViewKind::DiffGoods), Some(2008)).unwrap();
        assert_eq!(figures.len(), 3);
        for f in &figures {
            assert_eq!(f.status, SelectionStatus::MissingPriorYear);
            assert!(f.series.iter().all(|s| s.points.is_empty()));
            assert_eq!(f.axis.tick_values, vec![0.0]);
        }
        assert_eq!(figures[0].title, "Exportdifferenzen nach Warengruppe (2008 vs. 2007)");
    }

    #[test]
    fn monthly_view_labels_months_and_defaults_to_latest_year() {
        let ds = Dataset::from_records(
            SchemaVariant::Monthly,
            vec![
                monthly(2023, 1, 1e9, 1e9),
                monthly(2024, 2, 131e9, 110e9),
                monthly(2024, 1, 120e9, 100e9),
            ],
        );
        let catalog = ViewCatalog::default();
        let figures = render(&ds, catalog.get(ViewKind::Monthly), None).unwrap();
        let fig = &figures[0];
        assert!(fig.title.ends_with("im Jahr 2024"));
        assert_eq!(fig.kind, ChartKind::Line);
        let cats: Vec<_> = fig.series[0].points.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(cats, vec!["Jan", "Feb"]);
        assert_eq!(fig.series[2].points[1].value, 241e9);
        // max 241e9 rounds to 250e9, ticks every 25e9
        assert_eq!(fig.axis.tick_values.len(), 11);
    }

    #[test]
    fn total_volume_spans_all_years() {
        let ds = Dataset::from_records(
            SchemaVariant::YearlyTotal,
            vec![
                TradeRecord { export_value: 984e9, import_value: 805e9, ..record(2008) },
                TradeRecord { export_value: 1_562e9, import_value: 1_366e9, ..record(2022) },
            ],
        );
        let catalog = ViewCatalog::default();
        let figures = render(&ds, catalog.get(ViewKind::TotalVolume), Some(1999)).unwrap();
        let fig = &figures[0];
        assert_eq!(fig.series.len(), 3);
        assert_eq!(fig.series[0].points[1].category, "2022");
        assert_eq!(fig.axis.tick_labels.last().map(String::as_str), Some("3000 Bn"));
        assert_eq!(fig.series[0].color, "#1f77b4");
    }

    #[test]
    fn year_without_rows_renders_empty_charts() {
        let ds = Dataset::from_records(
            SchemaVariant::ByGood,
            vec![good(2024, "Kraftwagen", 5e9, 1e9)],
        );
        let catalog = ViewCatalog::default();
        let figures = render(&ds, catalog.get(ViewKind::TopGoods), Some(2000)).unwrap();
        for f in &figures {
            assert_eq!(f.status, SelectionStatus::EmptySelection);
            assert!(f.series[0].points.is_empty());
        }
    }

    #[test]
    fn rejects_wrong_table_layout() {
        let ds = Dataset::from_records(SchemaVariant::Monthly, vec![monthly(2024, 1, 1.0, 1.0)]);
        let catalog = ViewCatalog::default();
        let err = render(&ds, catalog.get(ViewKind::TopGoods), Some(2024)).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }
}
