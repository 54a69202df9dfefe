//! Output formatters for run results
//!
//! Provides table, JSON, CSV and summary output for the console.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::{Outcome, RunResults, ScenarioResult};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(format!(
                "unknown format '{other}' (expected table, json, json-pretty, csv or summary)"
            )),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn outcome_label(&self, outcome: Outcome) -> &'static str {
        if self.colorize {
            match outcome {
                Outcome::Passed => "\x1b[32m✓ PASS\x1b[0m",
                Outcome::Failed => "\x1b[31m✗ FAIL\x1b[0m",
                Outcome::Errored => "\x1b[33m! ERROR\x1b[0m",
            }
        } else {
            match outcome {
                Outcome::Passed => "✓ PASS",
                Outcome::Failed => "✗ FAIL",
                Outcome::Errored => "! ERROR",
            }
        }
    }

    /// Format a single scenario result
    pub fn format_result(&self, result: &ScenarioResult) -> String {
        match self.format {
            OutputFormat::Table => format!(
                "{} {} [{:>6}ms]",
                self.outcome_label(result.outcome),
                result.id,
                result.duration_ms
            ),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Csv => self.format_csv(std::slice::from_ref(result)),
            OutputFormat::Summary => format!(
                "{} {} ({}ms)",
                result.outcome.symbol(),
                result.id,
                result.duration_ms
            ),
        }
    }

    /// Format a whole run
    pub fn format_run(&self, run: &RunResults) -> String {
        match self.format {
            OutputFormat::Table => self.format_run_table(run),
            OutputFormat::Json => serde_json::to_string(run).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(run).unwrap_or_default(),
            OutputFormat::Csv => self.format_csv(run.results()),
            OutputFormat::Summary => format!(
                "Run {}: {}/{} passed ({:.1}%), {} failed, {} errored in {}ms",
                run.run_id(),
                run.count(Outcome::Passed),
                run.total(),
                run.pass_rate(),
                run.count(Outcome::Failed),
                run.count(Outcome::Errored),
                run.wall_time_ms()
            ),
        }
    }

    fn format_run_table(&self, run: &RunResults) -> String {
        let mut output = String::new();

        output.push_str("\n══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Run {} (started {})\n",
            run.run_id(),
            run.started_at().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str("══════════════════════════════════════════════════════════════\n");

        for result in run.results() {
            output.push_str(&format!(" {}\n", self.format_result(result)));
            if let Some(message) = &result.error {
                output.push_str(&format!("     {message}\n"));
            }
        }

        output.push_str("──────────────────────────────────────────────────────────────\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", run.count(Outcome::Passed))
        } else {
            run.count(Outcome::Passed).to_string()
        };
        let fail_str = if self.colorize && run.fail_count() > 0 {
            format!("\x1b[31m{}\x1b[0m", run.count(Outcome::Failed))
        } else {
            run.count(Outcome::Failed).to_string()
        };

        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Error: {}\n",
            run.total(),
            pass_str,
            fail_str,
            run.count(Outcome::Errored)
        ));
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Duration: {}ms (scenario time {}ms)\n",
            run.pass_rate(),
            run.wall_time_ms(),
            run.total_duration_ms()
        ));
        output.push_str(&format!(" Artifacts: {}\n", run.artifact_dir().display()));

        output
    }

    fn format_csv(&self, results: &[ScenarioResult]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let _ = writer.write_record(["feature", "scenario", "outcome", "duration_ms", "error"]);
        for result in results {
            let _ = writer.write_record([
                result.id.feature.clone(),
                result.id.name.clone(),
                result.outcome.to_string(),
                result.duration_ms.to_string(),
                result.error.clone().unwrap_or_default(),
            ]);
        }
        writer
            .into_inner()
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_default()
    }

    /// Failed and errored scenarios grouped by feature
    pub fn format_failures(&self, results: &[ScenarioResult]) -> String {
        let mut grouped: BTreeMap<&str, Vec<&ScenarioResult>> = BTreeMap::new();
        for result in results.iter().filter(|r| r.is_failure()) {
            grouped.entry(result.id.feature.as_str()).or_default().push(result);
        }

        if grouped.is_empty() {
            return "No failed scenarios".to_string();
        }

        let mut output = String::new();
        for (feature, failures) in grouped {
            output.push_str(&format!("{feature} ({} failed)\n", failures.len()));
            for result in failures {
                output.push_str(&format!(
                    "  {} {}: {}\n",
                    self.outcome_label(result.outcome),
                    result.id.name,
                    result.error.as_deref().unwrap_or("")
                ));
            }
        }
        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}
