//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::env::EnvConfig;
use super::profile::RunProfile;
use super::AppConfig;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./api-regression.yaml",
    "./api-regression.yml",
    "./.api-regression.yaml",
    "~/.config/api-regression/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Named target environments
    #[serde(default = "default_environments")]
    pub environments: Vec<EnvironmentConfig>,

    /// Run profiles in addition to the built-in ones
    #[serde(default)]
    pub profiles: Vec<RunProfile>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_environments() -> Vec<EnvironmentConfig> {
    vec![EnvironmentConfig::new("dev", "https://api.sunnah.com/v1")
        .with_secondary(TargetConfig::new("http://localhost:8084/v1"))]
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            environments: default_environments(),
            profiles: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::find() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        if self.app.parallelism == 0 {
            anyhow::bail!("parallelism must be at least 1");
        }
        if self.app.http.max_attempts == 0 {
            anyhow::bail!("http.max_attempts must be at least 1");
        }
        if self.app.http.backoff_factor < 1.0 {
            anyhow::bail!(
                "http.backoff_factor must be at least 1.0, got {}",
                self.app.http.backoff_factor
            );
        }

        if self.environment(&self.app.environment).is_none() {
            anyhow::bail!(
                "Environment '{}' is not defined (available: {})",
                self.app.environment,
                self.environment_names().join(", ")
            );
        }

        let mut names = HashSet::new();
        for profile in &self.profiles {
            if !names.insert(profile.name.as_str()) {
                anyhow::bail!("Duplicate profile name '{}'", profile.name);
            }
            if profile.parallelism == Some(0) {
                anyhow::bail!("Profile '{}' has parallelism 0", profile.name);
            }
        }

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        let mut config = Self::default();
        config.environments.push(
            EnvironmentConfig::new("staging", "https://staging.api.example.com/v1")
                .with_secondary(TargetConfig::new("http://localhost:8084/v1")),
        );
        config.profiles.push(
            RunProfile::new("smoke", "api-regression-smoke")
                .with_tags(&["smoke", "~@ignore"]),
        );
        config.profiles.push(
            RunProfile::new("books", "api-regression-books").with_path("books.feature.yaml"),
        );
        config
    }

    /// Get environment by name
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|e| e.name == name)
    }

    /// The environment selected by `app.environment`
    pub fn selected_environment(&self) -> Result<&EnvironmentConfig> {
        self.environment(&self.app.environment).with_context(|| {
            format!(
                "Environment '{}' is not defined (available: {})",
                self.app.environment,
                self.environment_names().join(", ")
            )
        })
    }

    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.iter().map(|e| e.name.as_str()).collect()
    }

    /// Get profile by name; configured profiles shadow the built-in ones
    pub fn profile(&self, name: &str) -> Option<RunProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .or_else(|| RunProfile::builtin().into_iter().find(|p| p.name == name))
    }

    /// Configured and built-in profiles, configured first
    pub fn all_profiles(&self) -> Vec<RunProfile> {
        let mut profiles = self.profiles.clone();
        for builtin in RunProfile::builtin() {
            if !profiles.iter().any(|p| p.name == builtin.name) {
                profiles.push(builtin);
            }
        }
        profiles
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(name) = &env.environment {
            self.app.environment = name.clone();
        }
        if let Some(parallel) = env.parallel {
            self.app.parallelism = parallel;
        }
        if let Some(dir) = &env.output_dir {
            self.app.output_dir = dir.clone();
        }
        if let Some(timeout) = env.timeout {
            self.app.http.timeout_secs = timeout;
        }

        let targets_overridden = env.primary_url.is_some()
            || env.primary_key.is_some()
            || env.secondary_url.is_some()
            || env.secondary_key.is_some();
        if !targets_overridden {
            return;
        }

        let name = self.app.environment.clone();
        if self.environment(&name).is_none() {
            let base_url = env.primary_url.clone().unwrap_or_default();
            self.environments.push(EnvironmentConfig::new(&name, base_url));
        }
        let Some(environment) = self.environments.iter_mut().find(|e| e.name == name) else {
            return;
        };

        if let Some(url) = &env.primary_url {
            environment.primary.base_url = url.clone();
        }
        if let Some(key) = &env.primary_key {
            environment.primary.api_key = Some(key.clone());
        }
        if let Some(url) = &env.secondary_url {
            match environment.secondary.as_mut() {
                Some(secondary) => secondary.base_url = url.clone(),
                None => environment.secondary = Some(TargetConfig::new(url.clone())),
            }
        }
        if let (Some(key), Some(secondary)) = (&env.secondary_key, environment.secondary.as_mut()) {
            secondary.api_key = Some(key.clone());
        }
    }
}

/// Named pair of primary and optional comparison targets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment name (e.g., "dev", "staging")
    pub name: String,
    /// Target every scenario runs against
    pub primary: TargetConfig,
    /// Target used by comparison scenarios
    #[serde(default)]
    pub secondary: Option<TargetConfig>,
}

impl EnvironmentConfig {
    pub fn new(name: impl Into<String>, primary_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: TargetConfig::new(primary_url),
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: TargetConfig) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

/// API base URL and key
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl TargetConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
