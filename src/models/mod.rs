//! Data models for regression runs
//!
//! Feature files, executable scenarios, results and the run verdict.

mod feature;
mod result;
mod scenario;
mod verdict;

pub use feature::{normalize_tag, CompareDef, Expectations, Feature};
#[cfg(test)]
pub use feature::ScenarioDef;
pub use result::{Outcome, RunResults, ScenarioResult};
pub use scenario::{Scenario, ScenarioId};
pub use verdict::Verdict;
