//! Configuration module
//!
//! Settings are layered: built-in defaults, then the config file, then
//! `API_REGRESSION_*` environment variables, then command-line flags.

mod env;
mod file;
mod profile;

pub use env::{print_env_help, EnvConfig};
pub use file::{ConfigFile, EnvironmentConfig, TargetConfig};
pub use profile::RunProfile;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::http::RetryPolicy;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Selected environment name
    pub environment: String,

    /// Maximum concurrently running scenarios
    pub parallelism: usize,

    /// Root of the feature tree
    pub features_dir: PathBuf,

    /// Reports are written to `<output_dir>/<report_name>/`
    pub output_dir: PathBuf,

    /// Per-run artifact directories are created under this path
    pub results_dir: PathBuf,

    /// Report name used when no profile sets one
    pub report_name: String,

    /// Failures of every run are appended here
    pub history_file: PathBuf,

    pub http: HttpSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            parallelism: 5,
            features_dir: PathBuf::from("features"),
            output_dir: PathBuf::from("target"),
            results_dir: PathBuf::from("target/results"),
            report_name: "api-regression".to_string(),
            history_file: PathBuf::from("target/failed_endpoints.json"),
            http: HttpSettings::default(),
        }
    }
}

/// HTTP client settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_factor: f64,
    /// Random delay of up to this many milliseconds added to each backoff
    pub jitter_ms: u64,
    /// Pause between the primary and secondary request of a comparison
    pub request_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            backoff_factor: 2.0,
            jitter_ms: 1000,
            request_delay_ms: 500,
        }
    }
}

impl HttpSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            factor: self.backoff_factor,
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.environment, "dev");
        assert_eq!(config.parallelism, 5);
        assert_eq!(config.output_dir, PathBuf::from("target"));
        assert_eq!(
            config.history_file,
            PathBuf::from("target/failed_endpoints.json")
        );
        assert_eq!(config.http.timeout_secs, 10);
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let policy = HttpSettings::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
        assert_eq!(policy.factor, 2.0);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("parallelism: 8\nhttp:\n  timeout_secs: 5\n").unwrap();
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.report_name, "api-regression");
    }
}
