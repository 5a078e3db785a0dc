//! Chart data for German foreign-trade statistics.
//!
//! Loads a trade table, selects a year, ranks partners or goods, computes
//! year-over-year differences and turns the result into chart figures with
//! ticked, labelled value axes. Rendering the figures is left to the caller.

pub mod chart;
pub mod color;
pub mod context;
pub mod data;
pub mod error;
pub mod fmt;
pub mod pipeline;
pub mod views;

pub use context::ReportContext;
pub use error::{PipelineError, Result};
