//! Report generation from result artifacts
//!
//! Reads every artifact of a run and writes an HTML report plus a JSON
//! summary under `<output_dir>/<report_name>/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::artifacts::ArtifactStore;
use super::render::{HtmlRenderer, ReportData, ReportRenderer};
use crate::error::{RunnerError, RunnerResult};
use crate::models::{Outcome, ScenarioResult};

pub const SUMMARY_FILE: &str = "summary.json";

/// Where and under which name a report is written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub report_name: String,
    pub title: String,
}

impl ReportConfig {
    pub fn new(output_dir: impl Into<PathBuf>, report_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            report_name: report_name.into(),
            title: "API Regression Report".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn report_dir(&self) -> PathBuf {
        self.output_dir.join(&self.report_name)
    }
}

/// Totals across the whole report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub generated: DateTime<Utc>,
    pub report_name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub pass_rate: f64,
}

impl ReportSummary {
    pub fn from_results(report_name: impl Into<String>, results: &[ScenarioResult]) -> Self {
        let (passed, failed, errored) = count_outcomes(results);
        Self {
            generated: Utc::now(),
            report_name: report_name.into(),
            total: results.len(),
            passed,
            failed,
            errored,
            pass_rate: pass_rate(passed, results.len()),
        }
    }
}

/// Per-feature breakdown
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub feature: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub pass_rate: f64,
}

impl FeatureSummary {
    /// One entry per feature, ordered by feature path
    pub fn breakdown(results: &[ScenarioResult]) -> Vec<Self> {
        let mut grouped: BTreeMap<&str, Vec<&ScenarioResult>> = BTreeMap::new();
        for result in results {
            grouped.entry(result.id.feature.as_str()).or_default().push(result);
        }

        grouped
            .into_iter()
            .map(|(feature, items)| {
                let passed = items.iter().filter(|r| r.outcome == Outcome::Passed).count();
                let failed = items.iter().filter(|r| r.outcome == Outcome::Failed).count();
                let errored = items.iter().filter(|r| r.outcome == Outcome::Errored).count();
                Self {
                    feature: feature.to_string(),
                    total: items.len(),
                    passed,
                    failed,
                    errored,
                    pass_rate: pass_rate(passed, items.len()),
                }
            })
            .collect()
    }
}

/// Files written by one `generate` call
#[derive(Clone, Debug)]
pub struct ReportHandle {
    pub html_path: PathBuf,
    pub json_path: PathBuf,
    pub summary: ReportSummary,
    pub features: Vec<FeatureSummary>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a ReportSummary,
    features: &'a [FeatureSummary],
    results: &'a [ScenarioResult],
}

/// Report generator
pub struct ReportGenerator {
    renderer: Box<dyn ReportRenderer>,
}

impl ReportGenerator {
    /// Generator writing the HTML report
    pub fn new() -> Self {
        Self::with_renderer(Box::new(HtmlRenderer))
    }

    pub fn with_renderer(renderer: Box<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }

    /// Build the report for every artifact under `artifact_dir`
    ///
    /// Artifacts are only read. Running this twice over the same directory
    /// produces the same output apart from the generation timestamp.
    pub fn generate(&self, artifact_dir: &Path, config: &ReportConfig) -> RunnerResult<ReportHandle> {
        let store = ArtifactStore::open(artifact_dir);
        let mut results = store.load_all()?;
        if results.is_empty() {
            return Err(RunnerError::EmptyInput(artifact_dir.to_path_buf()));
        }
        results.sort_by(|a, b| a.id.cmp(&b.id));

        let summary = ReportSummary::from_results(&config.report_name, &results);
        let features = FeatureSummary::breakdown(&results);

        let report_dir = config.report_dir();
        fs::create_dir_all(&report_dir).map_err(|source| RunnerError::ReportWrite {
            path: report_dir.clone(),
            source,
        })?;

        let html = self.renderer.render(&ReportData {
            config,
            summary: &summary,
            features: &features,
            results: &results,
        });
        let html_path = report_dir.join(self.renderer.file_name());
        write_file(&html_path, html.as_bytes())?;

        let json = serde_json::to_vec_pretty(&JsonReport {
            summary: &summary,
            features: &features,
            results: &results,
        })
        .map_err(|e| RunnerError::ReportWrite {
            path: report_dir.join(SUMMARY_FILE),
            source: std::io::Error::other(e),
        })?;
        let json_path = report_dir.join(SUMMARY_FILE);
        write_file(&json_path, &json)?;

        info!(
            "Report '{}' written to {} ({}/{} passed)",
            config.report_name,
            report_dir.display(),
            summary.passed,
            summary.total
        );

        Ok(ReportHandle {
            html_path,
            json_path,
            summary,
            features,
        })
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, contents: &[u8]) -> RunnerResult<()> {
    fs::write(path, contents).map_err(|source| RunnerError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn count_outcomes(results: &[ScenarioResult]) -> (usize, usize, usize) {
    results
        .iter()
        .fold((0, 0, 0), |(p, f, e), r| match r.outcome {
            Outcome::Passed => (p + 1, f, e),
            Outcome::Failed => (p, f + 1, e),
            Outcome::Errored => (p, f, e + 1),
        })
}

fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64) * 100.0
    }
}
