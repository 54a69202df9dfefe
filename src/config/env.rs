//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "API_REGRESSION";

/// Configuration read from `API_REGRESSION_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from API_REGRESSION_CONFIG
    pub config_file: Option<PathBuf>,
    /// Environment name from API_REGRESSION_ENV
    pub environment: Option<String>,
    /// Parallelism from API_REGRESSION_PARALLEL
    pub parallel: Option<usize>,
    /// Output directory from API_REGRESSION_OUTPUT_DIR
    pub output_dir: Option<PathBuf>,
    /// Timeout from API_REGRESSION_TIMEOUT
    pub timeout: Option<u64>,
    pub primary_url: Option<String>,
    pub primary_key: Option<String>,
    pub secondary_url: Option<String>,
    pub secondary_key: Option<String>,
    /// Verbose from API_REGRESSION_VERBOSE
    pub verbose: Option<bool>,
    /// Log file from API_REGRESSION_LOG_FILE
    pub log_file: Option<PathBuf>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG").map(PathBuf::from),
            environment: get_env("ENV"),
            parallel: get_env_parse("PARALLEL"),
            output_dir: get_env("OUTPUT_DIR").map(PathBuf::from),
            timeout: get_env_parse("TIMEOUT"),
            primary_url: get_env("PRIMARY_URL"),
            primary_key: get_env("PRIMARY_KEY"),
            secondary_url: get_env("SECONDARY_URL"),
            secondary_key: get_env("SECONDARY_KEY"),
            verbose: get_env_bool("VERBOSE"),
            log_file: get_env("LOG_FILE").map(PathBuf::from),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.environment.is_some()
            || self.parallel.is_some()
            || self.output_dir.is_some()
            || self.timeout.is_some()
            || self.primary_url.is_some()
            || self.primary_key.is_some()
            || self.secondary_url.is_some()
            || self.secondary_key.is_some()
            || self.verbose.is_some()
            || self.log_file.is_some()
    }

    /// Print current environment configuration with keys masked
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {ENV_PREFIX}_CONFIG:        {:?}", self.config_file);
        println!("  {ENV_PREFIX}_ENV:           {:?}", self.environment);
        println!("  {ENV_PREFIX}_PARALLEL:      {:?}", self.parallel);
        println!("  {ENV_PREFIX}_OUTPUT_DIR:    {:?}", self.output_dir);
        println!("  {ENV_PREFIX}_TIMEOUT:       {:?}", self.timeout);
        println!("  {ENV_PREFIX}_PRIMARY_URL:   {:?}", self.primary_url);
        println!("  {ENV_PREFIX}_PRIMARY_KEY:   {}", mask(&self.primary_key));
        println!("  {ENV_PREFIX}_SECONDARY_URL: {:?}", self.secondary_url);
        println!("  {ENV_PREFIX}_SECONDARY_KEY: {}", mask(&self.secondary_key));
        println!("  {ENV_PREFIX}_VERBOSE:       {:?}", self.verbose);
        println!("  {ENV_PREFIX}_LOG_FILE:      {:?}", self.log_file);
    }
}

fn mask(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<set>",
        None => "None",
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all API_REGRESSION environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_CONFIG         Path to configuration file");
    println!("  {ENV_PREFIX}_ENV            Environment name (default: dev)");
    println!("  {ENV_PREFIX}_PARALLEL       Maximum concurrent scenarios");
    println!("  {ENV_PREFIX}_OUTPUT_DIR     Report output directory");
    println!("  {ENV_PREFIX}_TIMEOUT        Request timeout in seconds");
    println!("  {ENV_PREFIX}_PRIMARY_URL    Base URL of the primary target");
    println!("  {ENV_PREFIX}_PRIMARY_KEY    API key sent to the primary target");
    println!("  {ENV_PREFIX}_SECONDARY_URL  Base URL of the comparison target");
    println!("  {ENV_PREFIX}_SECONDARY_KEY  API key sent to the comparison target");
    println!("  {ENV_PREFIX}_VERBOSE        Enable debug logging (true/false)");
    println!("  {ENV_PREFIX}_LOG_FILE       Also write logs to this file");
    println!("  RUST_LOG                      Overrides the log filter");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_PRIMARY_KEY=...");
    println!("  api-regression run --profile regression");
}

/// Sets variables for a test and restores them on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let previous = vars
            .iter()
            .map(|(name, value)| {
                let key = format!("{ENV_PREFIX}_{name}");
                let old = env::var(&key).ok();
                env::set_var(&key, value);
                (key, old)
            })
            .collect();
        Self { previous }
    }
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.primary_url.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_load() {
        let _guard = EnvGuard::set(&[
            ("SECONDARY_URL", "http://localhost:9999/v1"),
            ("TIMEOUT", "42"),
            ("VERBOSE", "yes"),
            ("LOG_FILE", "target/test_run.log"),
        ]);

        let config = EnvConfig::load();
        assert_eq!(
            config.secondary_url.as_deref(),
            Some("http://localhost:9999/v1")
        );
        assert_eq!(config.timeout, Some(42));
        assert_eq!(config.verbose, Some(true));
        assert_eq!(config.log_file, Some(PathBuf::from("target/test_run.log")));
        assert!(config.has_any());
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(&Some("secret".to_string())), "<set>");
        assert_eq!(mask(&None), "None");
    }
}
