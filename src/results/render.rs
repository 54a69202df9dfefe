//! Report renderers

use std::fmt::Write;

use super::report::{FeatureSummary, ReportConfig, ReportSummary};
use crate::models::{Outcome, ScenarioResult};

/// Everything a renderer needs for one report
pub struct ReportData<'a> {
    pub config: &'a ReportConfig,
    pub summary: &'a ReportSummary,
    pub features: &'a [FeatureSummary],
    /// Sorted by scenario id
    pub results: &'a [ScenarioResult],
}

/// Turns report data into a document written under the report directory
pub trait ReportRenderer: Send + Sync {
    /// File name inside the report directory
    fn file_name(&self) -> &str;

    fn render(&self, data: &ReportData<'_>) -> String;
}

/// Self-contained HTML report grouped by feature
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn rate_class(pass_rate: f64) -> &'static str {
        if pass_rate >= 90.0 {
            "rate-high"
        } else if pass_rate >= 70.0 {
            "rate-mid"
        } else {
            "rate-low"
        }
    }

    fn outcome_class(outcome: Outcome) -> &'static str {
        match outcome {
            Outcome::Passed => "pass",
            Outcome::Failed => "fail",
            Outcome::Errored => "error",
        }
    }
}

impl ReportRenderer for HtmlRenderer {
    fn file_name(&self) -> &str {
        "index.html"
    }

    fn render(&self, data: &ReportData<'_>) -> String {
        let summary = data.summary;
        let title = escape_html(&data.config.title);
        let mut output = String::new();

        writeln!(output, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - {}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 10px 0; }}
        th, td {{ padding: 8px 12px; text-align: left; border-bottom: 1px solid #ddd; vertical-align: top; }}
        th {{ background: #007bff; color: white; }}
        details {{ margin: 12px 0; border: 1px solid #ddd; border-radius: 6px; padding: 8px 12px; }}
        summary {{ cursor: pointer; font-weight: bold; }}
        .pass {{ color: #28a745; font-weight: bold; }}
        .fail {{ color: #dc3545; font-weight: bold; }}
        .error {{ color: #fd7e14; font-weight: bold; }}
        .rate-high {{ color: #28a745; }}
        .rate-mid {{ color: #ffc107; }}
        .rate-low {{ color: #dc3545; }}
        .message {{ font-family: monospace; white-space: pre-wrap; color: #a71d2a; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 120px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; }}
        .stat-label {{ color: #666; font-size: 14px; }}
        .generated {{ color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <p class="generated">Generated: {}</p>"#,
            escape_html(&summary.report_name),
            summary.generated.format("%Y-%m-%d %H:%M:%S UTC"),
        )
        .unwrap();

        writeln!(
            output,
            r#"
        <div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">Total</div></div>
        <div class="stat-card"><div class="stat-value pass">{}</div><div class="stat-label">Passed</div></div>
        <div class="stat-card"><div class="stat-value fail">{}</div><div class="stat-label">Failed</div></div>
        <div class="stat-card"><div class="stat-value error">{}</div><div class="stat-label">Errored</div></div>
        <div class="stat-card"><div class="stat-value {}">{:.1}%</div><div class="stat-label">Pass Rate</div></div>"#,
            summary.total,
            summary.passed,
            summary.failed,
            summary.errored,
            Self::rate_class(summary.pass_rate),
            summary.pass_rate
        )
        .unwrap();

        for feature in data.features {
            let open = if feature.passed < feature.total { " open" } else { "" };
            writeln!(
                output,
                r#"
        <details{open}>
            <summary>{} <span class="{}">({}/{} passed, {:.1}%)</span></summary>
            <table>
                <tr><th>Status</th><th>Scenario</th><th>Tags</th><th>Duration</th></tr>"#,
                escape_html(&feature.feature),
                Self::rate_class(feature.pass_rate),
                feature.passed,
                feature.total,
                feature.pass_rate
            )
            .unwrap();

            for result in data.results.iter().filter(|r| r.id.feature == feature.feature) {
                writeln!(
                    output,
                    r#"                <tr><td class="{}">{}</td><td>{}</td><td>{}</td><td>{}ms</td></tr>"#,
                    Self::outcome_class(result.outcome),
                    result.outcome,
                    escape_html(&result.id.name),
                    escape_html(&result.tags.join(", ")),
                    result.duration_ms
                )
                .unwrap();

                if let Some(message) = &result.error {
                    writeln!(
                        output,
                        r#"                <tr><td></td><td colspan="3" class="message">{}</td></tr>"#,
                        escape_html(message)
                    )
                    .unwrap();
                }
            }

            writeln!(output, "            </table>\n        </details>").unwrap();
        }

        writeln!(output, "    </div>\n</body>\n</html>").unwrap();
        output
    }
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
