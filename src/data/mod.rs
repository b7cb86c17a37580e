/// Data layer: the table model and the per-file transformation stages.
///
/// Architecture:
/// ```text
///  bytes + .csv / .xlsx
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Table (dtype inference)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean   │  remove duplicates / fill missing numeric (0..N)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ project  │  keep and reorder a column subset
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │ preview  │   │  export  │  CSV / xlsx buffer + filename
///   └──────────┘   └──────────┘
/// ```

pub mod clean;
pub mod export;
pub mod loader;
pub mod model;
pub mod preview;
pub mod project;
mod xlsx;
