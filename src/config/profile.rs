//! Run profiles
//!
//! A profile names a run mode: what to discover, which tags to select and
//! where the report goes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Named run mode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunProfile {
    /// Profile name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Feature file or directory, relative to the features directory;
    /// `None` runs the whole tree
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Tag filter expressions
    #[serde(default)]
    pub tags: Vec<String>,
    /// Overrides the configured parallelism
    #[serde(default)]
    pub parallelism: Option<usize>,
    /// Report base name
    pub report_name: String,
}

impl RunProfile {
    /// Create a profile running the whole feature tree
    pub fn new(name: impl Into<String>, report_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            path: None,
            tags: Vec::new(),
            parallelism: None,
            report_name: report_name.into(),
        }
    }

    /// Whole tree, skipping `@ignore` scenarios
    pub fn regression() -> Self {
        Self {
            name: "regression".to_string(),
            description: "Full regression suite excluding @ignore scenarios".to_string(),
            path: None,
            tags: vec!["~@ignore".to_string()],
            parallelism: Some(5),
            report_name: "api-regression".to_string(),
        }
    }

    /// Single minimal feature file, run without a tag filter
    pub fn direct() -> Self {
        Self {
            name: "direct".to_string(),
            description: "Direct run of the minimal feature file".to_string(),
            path: Some(PathBuf::from("minimal.feature.yaml")),
            tags: Vec::new(),
            parallelism: Some(5),
            report_name: "api-regression-direct".to_string(),
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::regression(), Self::direct()]
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Discovery path for this profile under `features_dir`
    pub fn resolve_path(&self, features_dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => features_dir.join(path),
            None => features_dir.to_path_buf(),
        }
    }
}
