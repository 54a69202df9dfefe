//! api-regression - API regression suite runner
//!
//! Runs declarative HTTP feature files in parallel, writes one JSON artifact
//! per scenario, renders an HTML/JSON report and fails when any scenario did
//! not pass.
//!
//! ## Features
//!
//! - YAML feature files with tags, background headers and expectations
//! - Tag filtering (`~@ignore`, `@smoke,@books`)
//! - Bounded parallel execution with panic isolation
//! - Dual-target response comparison for migration checks
//! - HTML report plus `summary.json`
//! - Failure history kept across runs
//!
//! ## Usage
//!
//! ```bash
//! # Full regression run (skips @ignore)
//! api-regression run
//!
//! # Run the minimal feature file only
//! api-regression run --profile direct
//!
//! # Select by tag with 8 workers
//! api-regression run --tags @smoke --parallel 8
//!
//! # Rebuild a report from stored artifacts
//! api-regression report target/results/20260101_120000_0042
//!
//! # Recorded failures since a date, counts only
//! api-regression history --since 2026-01-01 --summary
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod cli;
mod compare;
mod config;
mod discovery;
mod error;
mod executor;
mod http;
mod models;
mod output;
mod results;
mod utils;

use cli::Args;
use config::{ConfigFile, EnvConfig, RunProfile};
use discovery::{discover, TagFilter};
use executor::{HttpScenarioExecutor, SuiteRunner};
use models::{Feature, RunResults, Verdict};
use output::{OutputFormat, ResultFormatter};
use results::{
    counts_by_endpoint, parse_since, FailureHistory, HistoryQuery, ReportConfig, ReportGenerator,
    ReportHandle,
};
use utils::{init_logger, LogLevel, PhaseTimings};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let _log_guard = init_logger(
        LogLevel::from_verbose(args.verbose || env.verbose.unwrap_or(false)),
        args.log_file.as_deref().or(env.log_file.as_deref()),
    )?;

    match args.command {
        cli::Command::Run(run_args) => {
            let config = load_config(args.config.as_deref(), &env)?;
            run_suite(run_args, config, &env).await?;
        }
        cli::Command::Report(report_args) => {
            let config = load_config(args.config.as_deref(), &env)?;
            generate_report(report_args, &config)?;
        }
        cli::Command::List(list_args) => {
            let config = load_config(args.config.as_deref(), &env)?;
            list_scenarios(list_args, &config)?;
        }
        cli::Command::History(history_args) => {
            let config = load_config(args.config.as_deref(), &env)?;
            show_history(history_args, &config)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, args.config.as_deref(), &env)?;
        }
        cli::Command::Schema => {
            let schema = schemars::schema_for!(Feature);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

/// Config file from `--config`, then `API_REGRESSION_CONFIG`, then the
/// standard locations; environment overrides applied on top
fn load_config(path: Option<&Path>, env: &EnvConfig) -> Result<ConfigFile> {
    let mut config = match path.or(env.config_file.as_deref()) {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };
    config.apply_env(env);
    Ok(config)
}

fn resolve_profile(config: &ConfigFile, name: &str) -> Result<RunProfile> {
    config.profile(name).with_context(|| {
        let names: Vec<String> = config.all_profiles().into_iter().map(|p| p.name).collect();
        format!("Unknown profile '{name}' (available: {})", names.join(", "))
    })
}

fn tag_filter(cli_tags: &[String], profile: &RunProfile) -> Result<Option<TagFilter>> {
    let tags: &[String] = if cli_tags.is_empty() {
        &profile.tags
    } else {
        cli_tags
    };
    if tags.is_empty() {
        return Ok(None);
    }
    Ok(Some(TagFilter::parse(tags)?))
}

async fn run_suite(args: cli::RunArgs, mut config: ConfigFile, env: &EnvConfig) -> Result<()> {
    if let Some(name) = args.env {
        config.app.environment = name;
    }
    if let Some(dir) = args.output_dir {
        config.app.output_dir = dir;
    }

    let format: OutputFormat = args.format.parse().map_err(anyhow::Error::msg)?;
    let profile = resolve_profile(&config, &args.profile)?;
    let path = args
        .path
        .unwrap_or_else(|| profile.resolve_path(&config.app.features_dir));
    let filter = tag_filter(&args.tags, &profile)?;
    let parallelism = args
        .parallel
        .or(env.parallel)
        .or(profile.parallelism)
        .unwrap_or(config.app.parallelism);
    let report_name = args
        .report_name
        .unwrap_or_else(|| profile.report_name.clone());

    let environment = config.selected_environment()?;
    info!(
        "Profile '{}' against {} ({})",
        profile.name, environment.name, environment.primary.base_url
    );
    match &filter {
        Some(filter) => info!("Discovering {} with tags {}", path.display(), filter),
        None => info!("Discovering {}", path.display()),
    }

    let executor = HttpScenarioExecutor::from_config(&config.app, environment)
        .context("Failed to create HTTP client")?;
    let mut runner = SuiteRunner::new(Arc::new(executor), config.app.results_dir.clone());
    if let Some(run_id) = args.run_id {
        runner = runner.with_run_id(run_id);
    }

    let mut timings = PhaseTimings::start();
    let run = runner
        .run(&path, filter.as_ref(), parallelism)
        .await
        .map_err(|e| {
            if e.is_discovery() {
                anyhow::Error::new(e).context(format!(
                    "Nothing to run from {} (features dir: {})",
                    path.display(),
                    config.app.features_dir.display()
                ))
            } else {
                e.into()
            }
        })?;
    timings.finish("run");

    let mut formatter = ResultFormatter::new(format);
    if !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_run(&run));
    if run.fail_count() > 0 {
        record_failures(&config.app.history_file, &run);
    }

    if args.no_report {
        if run.total() == 0 {
            anyhow::bail!("no scenarios matched");
        }
    } else {
        let report_config = ReportConfig::new(config.app.output_dir.clone(), report_name)
            .with_title(format!("API Regression Report: {}", environment.name));
        let handle = ReportGenerator::new().generate(run.artifact_dir(), &report_config)?;
        timings.finish("report");
        print_report_location(&handle);
    }

    if run.fail_count() > 0 && format == OutputFormat::Table {
        eprintln!("\n{}", formatter.format_failures(run.results()));
    }
    debug!("Timings: {timings}");

    let verdict = Verdict::from_results(&run);
    if verdict.is_passed() {
        info!("All {} scenarios passed", run.total());
    }
    verdict.into_result()
}

fn generate_report(args: cli::ReportArgs, config: &ConfigFile) -> Result<()> {
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.app.output_dir.clone());
    let report_name = args
        .report_name
        .unwrap_or_else(|| config.app.report_name.clone());

    let report_config = ReportConfig::new(output_dir, report_name);
    let handle = ReportGenerator::new().generate(&args.artifact_dir, &report_config)?;

    println!(
        "{} scenarios: {} passed, {} failed, {} errored ({:.1}%)",
        handle.summary.total,
        handle.summary.passed,
        handle.summary.failed,
        handle.summary.errored,
        handle.summary.pass_rate
    );
    for feature in &handle.features {
        println!(
            "  {:40} {:3}/{:<3} passed ({:.1}%)",
            feature.feature, feature.passed, feature.total, feature.pass_rate
        );
    }
    print_report_location(&handle);
    Ok(())
}

/// Append the run's failures to the history and log per-endpoint totals
fn record_failures(path: &Path, run: &RunResults) {
    let history = FailureHistory::new(path);
    if let Err(e) = history.record_run(run) {
        warn!("Failure history not updated: {e:#}");
        return;
    }

    match history.load() {
        Ok(records) => {
            info!(
                "{} failures recorded in {}",
                records.len(),
                history.path().display()
            );
            for (endpoint, count) in counts_by_endpoint(&records) {
                info!("  - {endpoint}: {count} failures");
            }
        }
        Err(e) => warn!("Failure history unreadable: {e:#}"),
    }
}

fn show_history(args: cli::HistoryArgs, config: &ConfigFile) -> Result<()> {
    let history_file = args
        .file
        .unwrap_or_else(|| config.app.history_file.clone());
    let history = FailureHistory::new(history_file);
    let query = HistoryQuery {
        since: args.since.as_deref().map(parse_since).transpose()?,
        endpoint: args.endpoint,
    };

    let records = query.apply(history.load()?);
    if records.is_empty() {
        println!("No recorded failures match in {}", history.path().display());
    } else {
        println!("{:=<80}", "");
        println!("Failed Endpoints ({} failures)", records.len());
        println!("{:=<80}", "");
        for (endpoint, count) in counts_by_endpoint(&records) {
            println!("  {endpoint}: {count}");
        }

        if !args.summary {
            println!("\n{:=<80}", "");
            println!("Failure Details");
            println!("{:=<80}", "");
            for record in &records {
                println!(
                    "\n{} [{}] {} (run {})",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.outcome,
                    record.id,
                    record.run_id
                );
                println!("  Endpoint: {}", record.endpoint);
                println!("  Error: {}", record.error);
                for difference in record.differences.iter().take(5) {
                    println!("    - {difference}");
                }
                if record.differences.len() > 5 {
                    println!("    ... and {} more differences", record.differences.len() - 5);
                }
            }
        }
    }

    if args.clear {
        history.clear()?;
        println!("\n✓ Cleared {}", history.path().display());
    }
    Ok(())
}

fn print_report_location(handle: &ReportHandle) {
    println!("✓ HTML report: {}", handle.html_path.display());
    println!("✓ JSON summary: {}", handle.json_path.display());
}

fn list_scenarios(args: cli::ListArgs, config: &ConfigFile) -> Result<()> {
    let profile = resolve_profile(config, &args.profile)?;
    let path = args
        .path
        .unwrap_or_else(|| profile.resolve_path(&config.app.features_dir));
    let filter = tag_filter(&args.tags, &profile)?;

    let scenarios = discover(&path, filter.as_ref())?;

    println!("\nScenarios in {} ({} total)\n", path.display(), scenarios.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut current_feature = "";
    for scenario in &scenarios {
        let feature = scenario.id.feature.as_str();
        if feature != current_feature {
            println!("\n{feature}");
            println!("──────────────────────────────────────────────────────────────────────");
            current_feature = feature;
        }

        if args.detailed {
            let request = &scenario.definition.request;
            println!(
                "  {:3}. {:40} {} {} [{}]",
                scenario.index + 1,
                scenario.id.name,
                request.method.to_uppercase(),
                request.path,
                scenario.tags.join(" ")
            );
        } else {
            println!("  {:3}. {}", scenario.index + 1, scenario.id.name);
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}

fn manage_config(args: cli::ConfigArgs, path: Option<&Path>, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            ConfigFile::example().save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { env: env_only, format } => {
            if env_only {
                if !env.has_any() {
                    println!("No API_REGRESSION_* variables are set.\n");
                }
                env.print_summary();
            } else {
                let config = load_config(path, env)?;
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let file = file
                .or_else(|| path.map(Path::to_path_buf))
                .or_else(ConfigFile::find)
                .context("No configuration file found")?;

            match ConfigFile::load(&file) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {}", file.display());
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {}", file.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Profiles { detailed } => {
            let config = load_config(path, env)?;

            println!("Run Profiles:");
            println!("{:-<60}", "");
            for profile in config.all_profiles() {
                if detailed {
                    println!("  {}", profile.name);
                    println!("    Description: {}", profile.description);
                    println!(
                        "    Path: {}",
                        profile.resolve_path(&config.app.features_dir).display()
                    );
                    println!("    Tags: {:?}", profile.tags);
                    println!(
                        "    Parallelism: {}",
                        profile.parallelism.unwrap_or(config.app.parallelism)
                    );
                    println!("    Report: {}", profile.report_name);
                    println!();
                } else {
                    println!("  {:20} - {}", profile.name, profile.description);
                }
            }
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
        }
    }

    Ok(())
}
