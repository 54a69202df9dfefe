//! Failure history across runs
//!
//! Every failed or errored scenario is appended to a single JSON file
//! together with the time and id of its run. The file is never rotated;
//! `api-regression history --clear` empties it.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{Outcome, RunResults, ScenarioId, ScenarioResult};

/// One failed scenario execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub id: ScenarioId,
    /// Request path without the leading `/`, or `unknown`
    pub endpoint: String,
    pub outcome: Outcome,
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<String>,
}

impl FailureRecord {
    /// `None` for passed results
    pub fn from_result(result: &ScenarioResult, run_id: &str, timestamp: DateTime<Utc>) -> Option<Self> {
        let error = result.error.clone()?;
        let details = result.details.as_ref();

        let differences = details
            .and_then(|d| d.get("differences"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            timestamp,
            run_id: run_id.to_string(),
            id: result.id.clone(),
            endpoint: endpoint_of(details),
            outcome: result.outcome,
            error,
            differences,
        })
    }
}

fn endpoint_of(details: Option<&Value>) -> String {
    details
        .and_then(|d| d.get("url"))
        .and_then(Value::as_str)
        .and_then(|url| Url::parse(url).ok())
        .map(|url| url.path().trim_start_matches('/').to_string())
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Selection applied when viewing the history
#[derive(Clone, Debug, Default)]
pub struct HistoryQuery {
    pub since: Option<DateTime<Utc>>,
    /// Endpoint prefix, with or without the leading `/`
    pub endpoint: Option<String>,
}

impl HistoryQuery {
    pub fn matches(&self, record: &FailureRecord) -> bool {
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        match &self.endpoint {
            Some(prefix) => record
                .endpoint
                .starts_with(prefix.trim_start_matches('/')),
            None => true,
        }
    }

    pub fn apply(&self, records: Vec<FailureRecord>) -> Vec<FailureRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Parse `--since` values: RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS[.f]` or a bare date, all taken as UTC
pub fn parse_since(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Could not parse time '{value}'"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Failure counts per endpoint, sorted by endpoint
pub fn counts_by_endpoint(records: &[FailureRecord]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.endpoint.as_str()).or_insert(0) += 1;
    }
    counts
}

/// JSON file holding failure records of every run
#[derive(Clone, Debug)]
pub struct FailureHistory {
    path: PathBuf,
}

impl FailureHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in append order; a missing file is an empty history
    pub fn load(&self) -> Result<Vec<FailureRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse failure history {}", self.path.display()))
    }

    /// Append records after the existing ones
    pub fn append(&self, records: &[FailureRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut all = self.load()?;
        all.extend_from_slice(records);
        self.save(&all)?;
        debug!("Appended {} records to {}", records.len(), self.path.display());
        Ok(records.len())
    }

    /// Append every failure of a run, stamped with the run's completion time
    pub fn record_run(&self, run: &RunResults) -> Result<usize> {
        let records: Vec<FailureRecord> = run
            .failures()
            .filter_map(|r| FailureRecord::from_result(r, run.run_id(), run.completed_at()))
            .collect();
        self.append(&records)
    }

    /// Replace the history with an empty list
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            self.save(&[])?;
            info!("Cleared failure history {}", self.path.display());
        }
        Ok(())
    }

    fn save(&self, records: &[FailureRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use tempfile::TempDir;

    fn failed(feature: &str, name: &str, url: &str) -> ScenarioResult {
        ScenarioResult::failed(ScenarioId::new(feature, name), 15, "expected 200 got 404")
            .with_details(json!({ "method": "GET", "url": url, "status": 404 }))
    }

    fn run(results: Vec<ScenarioResult>) -> RunResults {
        RunResults::new("run-1", results, "target/results/run-1", Utc::now())
    }

    #[test]
    fn test_record_from_result() {
        let result = failed(
            "collections.feature.yaml",
            "bukhari",
            "https://api.sunnah.com/v1/collections/bukhari?limit=50",
        );
        let record = FailureRecord::from_result(&result, "run-1", Utc::now()).unwrap();
        assert_eq!(record.endpoint, "v1/collections/bukhari");
        assert_eq!(record.error, "expected 200 got 404");
        assert!(record.differences.is_empty());

        let compared = failed("a.feature.yaml", "cmp", "http://localhost/collections").with_details(json!({
            "url": "http://localhost/collections",
            "differences": ["Status code mismatch: 200 vs 500"],
        }));
        let record = FailureRecord::from_result(&compared, "run-1", Utc::now()).unwrap();
        assert_eq!(record.endpoint, "collections");
        assert_eq!(record.differences, vec!["Status code mismatch: 200 vs 500"]);

        let errored = ScenarioResult::errored(ScenarioId::new("a.feature.yaml", "x"), 0, "timeout");
        let record = FailureRecord::from_result(&errored, "run-1", Utc::now()).unwrap();
        assert_eq!(record.endpoint, "unknown");
        assert_eq!(record.outcome, Outcome::Errored);

        let passed = ScenarioResult::passed(ScenarioId::new("a.feature.yaml", "y"), 1);
        assert!(FailureRecord::from_result(&passed, "run-1", Utc::now()).is_none());
    }

    #[test]
    fn test_history_accumulates_across_runs() {
        let temp = TempDir::new().unwrap();
        let history = FailureHistory::new(temp.path().join("nested/failed_endpoints.json"));
        assert!(history.load().unwrap().is_empty());

        let first = run(vec![
            ScenarioResult::passed(ScenarioId::new("a.feature.yaml", "ok"), 3),
            failed("a.feature.yaml", "missing", "http://localhost/collections/nope"),
        ]);
        assert_eq!(history.record_run(&first).unwrap(), 1);

        let second = run(vec![
            failed("a.feature.yaml", "missing", "http://localhost/collections/nope"),
            failed("b.feature.yaml", "book", "http://localhost/collections/bukhari/books/1"),
        ]);
        assert_eq!(history.record_run(&second).unwrap(), 2);

        let records = history.load().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id.name, "missing");
        assert_eq!(records[2].endpoint, "collections/bukhari/books/1");

        let counts = counts_by_endpoint(&records);
        assert_eq!(counts["collections/nope"], 2);
        assert_eq!(counts["collections/bukhari/books/1"], 1);
    }

    #[test]
    fn test_passing_run_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let history = FailureHistory::new(temp.path().join("failed_endpoints.json"));
        let clean = run(vec![ScenarioResult::passed(ScenarioId::new("a.feature.yaml", "ok"), 3)]);

        assert_eq!(history.record_run(&clean).unwrap(), 0);
        assert!(!history.path().exists());
    }

    #[test]
    fn test_query_filters() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let old = FailureRecord::from_result(
            &failed("a.feature.yaml", "old", "http://localhost/collections/bukhari"),
            "run-0",
            now - Duration::days(3),
        )
        .unwrap();
        let recent = FailureRecord::from_result(
            &failed("a.feature.yaml", "recent", "http://localhost/hadiths/100"),
            "run-1",
            now,
        )
        .unwrap();
        let records = vec![old, recent];

        let since = HistoryQuery {
            since: Some(parse_since("2026-03-09").unwrap()),
            endpoint: None,
        };
        let kept = since.apply(records.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.name, "recent");

        let endpoint = HistoryQuery {
            since: None,
            endpoint: Some("/collections".to_string()),
        };
        let kept = endpoint.apply(records.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.name, "old");

        assert_eq!(HistoryQuery::default().apply(records).len(), 2);
    }

    #[test]
    fn test_parse_since_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 9, 8, 30, 0).unwrap();
        assert_eq!(parse_since("2026-03-09 08:30:00").unwrap(), expected);
        assert_eq!(parse_since("2026-03-09T08:30:00").unwrap(), expected);
        assert_eq!(parse_since("2026-03-09T08:30:00.000").unwrap(), expected);
        assert_eq!(parse_since("2026-03-09T10:30:00+02:00").unwrap(), expected);
        assert_eq!(
            parse_since("2026-03-09").unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()
        );
        assert!(parse_since("last tuesday").is_err());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let history = FailureHistory::new(temp.path().join("failed_endpoints.json"));
        history
            .record_run(&run(vec![failed("a.feature.yaml", "x", "http://localhost/books")]))
            .unwrap();
        assert_eq!(history.load().unwrap().len(), 1);

        history.clear().unwrap();
        assert!(history.path().exists());
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("failed_endpoints.json");
        fs::write(&path, "{not json").unwrap();
        let history = FailureHistory::new(&path);

        let err = history
            .record_run(&run(vec![failed("a.feature.yaml", "x", "http://localhost/books")]))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse failure history"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }
}
