//! Result analysis engine.
//!
//! Pure transformations over a fetched result set: shape/preview summaries,
//! z-score outlier detection with a trend heuristic, and CSV export with a
//! round-trip guarantee. Nothing here touches the network or the session.

pub mod export;
pub mod stats;
pub mod table;

pub use export::{parse_csv, to_csv_string, write_csv};
pub use stats::{
    detect_outliers_and_trend, summarize, AnalysisConfig, ColumnReport, ColumnSummary,
    ResultSummary, Trend,
};
pub use table::{Row, TabularResult};
