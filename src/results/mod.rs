//! Result artifacts and report generation

mod artifacts;
mod history;
mod render;
mod report;

pub use artifacts::{generate_run_id, validate_run_id, ArtifactStore};
pub use history::{counts_by_endpoint, parse_since, FailureHistory, HistoryQuery};
pub use report::{ReportConfig, ReportGenerator, ReportHandle};
