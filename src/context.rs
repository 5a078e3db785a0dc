use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::chart::ChartFigure;
use crate::data::filter::validate_year;
use crate::data::loader::load_file;
use crate::data::model::{Dataset, SchemaVariant};
use crate::error::{PipelineError, Result};
use crate::pipeline;
use crate::views::{ViewCatalog, ViewKind};

// ---------------------------------------------------------------------------
// Report context
// ---------------------------------------------------------------------------

/// Loaded tables and view settings, passed explicitly to every render.
///
/// Datasets are immutable once inserted and shared through `Arc`, so a
/// context can be cloned into concurrent request handlers without locking.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    /// One table per layout.
    datasets: BTreeMap<SchemaVariant, Arc<Dataset>>,
    /// Per-view settings.
    pub catalog: ViewCatalog,
}

impl ReportContext {
    pub fn new(catalog: ViewCatalog) -> Self {
        ReportContext {
            datasets: BTreeMap::new(),
            catalog,
        }
    }

    /// Ingest a loaded table, replacing any table of the same layout.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        info!(
            "{} table: {} records, {} years",
            dataset.variant,
            dataset.len(),
            dataset.years.len()
        );
        self.datasets.insert(dataset.variant, Arc::new(dataset));
    }

    /// Load the table `view` reads from a file.
    pub fn load_for_view(&mut self, view: ViewKind, path: &Path) -> Result<()> {
        let dataset = load_file(path, view.schema())?;
        self.set_dataset(dataset);
        Ok(())
    }

    /// The table a view reads.
    pub fn dataset_for(&self, view: ViewKind) -> Result<Arc<Dataset>> {
        self.datasets
            .get(&view.schema())
            .cloned()
            .ok_or_else(|| PipelineError::MissingDataset(view.schema().to_string()))
    }

    /// Years that can be selected for a view.
    pub fn available_years(&self, view: ViewKind) -> Result<BTreeSet<i32>> {
        Ok(self.dataset_for(view)?.years.clone())
    }

    /// Validate the selected year, then build the view's figures.
    ///
    /// `None` selects the latest year. The total-volume view spans all years
    /// and ignores the selection.
    pub fn render(&self, view: ViewKind, year: Option<i32>) -> Result<Vec<ChartFigure>> {
        let dataset = self.dataset_for(view)?;
        let year = match year {
            Some(y) if view.uses_year() => Some(validate_year(&dataset, y)?),
            _ => None,
        };
        pipeline::render(&dataset, self.catalog.get(view), year)
    }
}
