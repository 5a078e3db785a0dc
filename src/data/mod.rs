/// Data layer: core types, loading, and year selection.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → rows → validated Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<TradeRecord>, year index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  select one year, drop non-country rows
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
