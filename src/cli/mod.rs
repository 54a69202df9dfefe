//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// API regression harness
#[derive(Parser, Debug)]
#[command(name = "api-regression")]
#[command(version)]
#[command(about = "Run API regression suites in parallel and report the results")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also append logs to this file (e.g. target/test_run.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run scenarios, generate the report and check the verdict
    Run(RunArgs),

    /// Generate a report from an existing artifact directory
    Report(ReportArgs),

    /// List discovered scenarios
    List(ListArgs),

    /// Show failures recorded across runs
    History(HistoryArgs),

    /// Show or create configuration
    Config(ConfigArgs),

    /// Print the JSON schema of feature files
    Schema,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Feature file or directory (overrides the profile)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Tag filter expression, repeatable (e.g. "~@ignore", "@smoke,@books")
    #[arg(short, long)]
    pub tags: Vec<String>,

    /// Maximum concurrent scenarios
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Run profile (regression, direct or a configured one)
    #[arg(long, default_value = "regression")]
    pub profile: String,

    /// Report output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report name (overrides the profile)
    #[arg(short = 'n', long)]
    pub report_name: Option<String>,

    /// Target environment
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Skip report generation
    #[arg(long)]
    pub no_report: bool,

    /// Run id naming the artifact directory (generated when omitted)
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Arguments for report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Directory holding per-scenario JSON artifacts
    pub artifact_dir: PathBuf,

    /// Report output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report name
    #[arg(short = 'n', long)]
    pub report_name: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Feature file or directory (overrides the profile)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Tag filter expression, repeatable
    #[arg(short, long)]
    pub tags: Vec<String>,

    /// Run profile
    #[arg(long, default_value = "regression")]
    pub profile: String,

    /// Show tags and requests
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Only failures at or after this time (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, UTC)
    #[arg(long)]
    pub since: Option<String>,

    /// Only endpoints starting with this path (e.g. collections/bukhari)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Print per-endpoint counts only
    #[arg(short, long)]
    pub summary: bool,

    /// Empty the history after printing it
    #[arg(long)]
    pub clear: bool,

    /// History file (defaults to the configured one)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Arguments for configuration management
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Show environment variable overrides only
        #[arg(long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(default_value = "./api-regression.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file path (defaults to the standard locations)
        file: Option<PathBuf>,
    },

    /// List run profiles
    Profiles {
        /// Show paths, tags and parallelism
        #[arg(short, long)]
        detailed: bool,
    },

    /// Show supported environment variables
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "api-regression",
            "run",
            "--tags",
            "~@ignore",
            "-t",
            "@smoke",
            "-j",
            "8",
            "--no-report",
        ]);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.tags, vec!["~@ignore", "@smoke"]);
                assert_eq!(run.parallel, Some(8));
                assert_eq!(run.profile, "regression");
                assert_eq!(run.format, "table");
                assert!(run.no_report);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = Args::parse_from([
            "api-regression",
            "list",
            "--detailed",
            "-v",
            "--config",
            "custom.yaml",
        ]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("custom.yaml")));
        match args.command {
            Command::List(list) => assert!(list.detailed),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_report_args() {
        let args = Args::parse_from([
            "api-regression",
            "report",
            "target/results/run-1",
            "-n",
            "nightly",
        ]);
        match args.command {
            Command::Report(report) => {
                assert_eq!(report.artifact_dir, PathBuf::from("target/results/run-1"));
                assert_eq!(report.report_name.as_deref(), Some("nightly"));
                assert!(report.output_dir.is_none());
            }
            _ => panic!("Expected Report command"),
        }
    }

    #[test]
    fn test_history_args() {
        let args = Args::parse_from([
            "api-regression",
            "history",
            "--since",
            "2026-03-01",
            "--endpoint",
            "collections/bukhari",
            "--summary",
            "--clear",
            "--log-file",
            "target/test_run.log",
        ]);
        assert_eq!(args.log_file, Some(PathBuf::from("target/test_run.log")));
        match args.command {
            Command::History(history) => {
                assert_eq!(history.since.as_deref(), Some("2026-03-01"));
                assert_eq!(history.endpoint.as_deref(), Some("collections/bukhari"));
                assert!(history.summary);
                assert!(history.clear);
                assert!(history.file.is_none());
            }
            _ => panic!("Expected History command"),
        }
    }

    #[test]
    fn test_config_init_default_path() {
        let args = Args::parse_from(["api-regression", "config", "init"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { path, force },
            }) => {
                assert_eq!(path, PathBuf::from("./api-regression.yaml"));
                assert!(!force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
