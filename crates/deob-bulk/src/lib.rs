//! Deobfuscation Bulk: the pipeline over a whole versions list
//!
//! ```text
//! versions.tsv → VersionEntry → BatchJob ─┬→ Pipeline ─┐
//!                                         ├→ Pipeline ─┼→ BatchReport → report.tsv
//!                                         └→ Pipeline ─┘
//! ```

pub mod batch;
pub mod config;
pub mod report;
pub mod versions;

pub use batch::{BatchJob, BatchRunner};
pub use config::BatchConfig;
pub use report::{BatchReport, Summary};
pub use versions::{load_versions, parse_versions, VersionEntry, VersionsError};
