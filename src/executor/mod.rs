//! Scenario execution engine
//!
//! Provides the executor seam, the HTTP executor and the parallel suite runner.

mod expect;
mod scenario;
mod suite;

pub use scenario::{HttpScenarioExecutor, ScenarioExecutor};
pub use suite::SuiteRunner;
