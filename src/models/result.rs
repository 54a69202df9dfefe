//! Scenario and run result models
//!
//! Defines scenario outcomes, per-scenario results and the run aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::scenario::ScenarioId;

/// Scenario execution outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Errored,
}

impl Outcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Passed => "✓",
            Outcome::Failed => "✗",
            Outcome::Errored => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASS"),
            Outcome::Failed => write!(f, "FAIL"),
            Outcome::Errored => write!(f, "ERROR"),
        }
    }
}

/// Result of a single scenario execution
///
/// `error` is set exactly when the outcome is not `Passed`; the constructors
/// are the only way this crate builds results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: ScenarioId,
    #[serde(default)]
    pub tags: Vec<String>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ScenarioResult {
    pub fn passed(id: ScenarioId, duration_ms: u64) -> Self {
        Self {
            id,
            tags: Vec::new(),
            outcome: Outcome::Passed,
            error: None,
            duration_ms,
            details: None,
        }
    }

    pub fn failed(id: ScenarioId, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            tags: Vec::new(),
            outcome: Outcome::Failed,
            error: Some(message.into()),
            duration_ms,
            details: None,
        }
    }

    pub fn errored(id: ScenarioId, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            tags: Vec::new(),
            outcome: Outcome::Errored,
            error: Some(error.into()),
            duration_ms,
            details: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_failure(&self) -> bool {
        !self.outcome.is_success()
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.outcome.symbol(),
            self.id,
            self.duration_ms
        )?;
        if let Some(msg) = &self.error {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Aggregate returned by one suite execution
#[derive(Clone, Debug, Serialize)]
pub struct RunResults {
    run_id: String,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    artifact_dir: PathBuf,
    fail_count: usize,
    results: Vec<ScenarioResult>,
}

impl RunResults {
    /// Build the aggregate; `results` must already be in discovery order
    pub fn new(
        run_id: impl Into<String>,
        results: Vec<ScenarioResult>,
        artifact_dir: impl Into<PathBuf>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let fail_count = results.iter().filter(|r| r.is_failure()).count();
        Self {
            run_id: run_id.into(),
            started_at,
            completed_at: Utc::now(),
            artifact_dir: artifact_dir.into(),
            fail_count,
            results,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Number of scenarios whose outcome is not `Passed`
    pub fn fail_count(&self) -> usize {
        self.fail_count
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Error message of every failed or errored scenario, in run order
    pub fn error_messages(&self) -> Vec<String> {
        self.failures().filter_map(|r| r.error.clone()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.results.iter().map(|r| r.duration_ms).sum()
    }

    pub fn wall_time_ms(&self) -> u64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            ((self.total() - self.fail_count) as f64 / self.total() as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.fail_count == 0
    }
}

impl fmt::Display for RunResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Error: {}",
            self.total(),
            self.count(Outcome::Passed),
            self.count(Outcome::Failed),
            self.count(Outcome::Errored)
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.wall_time_ms()
        )
    }
}
