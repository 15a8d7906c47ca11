//! Ingestion helpers for pasted tabular input.
//!
//! # Features
//!
//! - **Quick detection**: recognize TSV, Markdown tables and CSV without any
//!   inference call ([`quick_detect`])
//! - **Header detection**: locate the header row and score it on a 0-100
//!   scale ([`detect_header_row`])
//!
//! # Example
//!
//! ```
//! use colmap_ingest::{TableFormat, quick_detect};
//!
//! let table = quick_detect("ID\tName\n1\tA").unwrap();
//! assert_eq!(table.format, TableFormat::Tsv);
//! assert_eq!(table.headers(), ["ID", "Name"]);
//! ```

mod detect;
mod header;

pub use detect::{
    CSV_RELIABILITY_FLOOR, MARKDOWN_CONFIDENCE, TSV_CONFIDENCE, TableDetectionResult,
    TableFormat, quick_detect,
};
pub use header::{HeaderDetection, detect_header_row};
