//! Feature file models
//!
//! A feature file is a YAML document holding one or more HTTP scenarios that
//! share tags and a request background.

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Parsed feature file
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct Feature {
    /// Feature title
    pub feature: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags inherited by every scenario in the file
    #[serde(default)]
    pub tags: Vec<String>,

    /// Request defaults merged into every scenario
    #[serde(default)]
    pub background: Background,

    /// Scenarios in file order
    #[serde(default)]
    pub scenarios: Vec<ScenarioDef>,
}

/// Request defaults shared by the scenarios of a feature
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Background {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// A single scenario as written in the feature file
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioDef {
    /// Scenario name, unique within its feature
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub request: RequestDef,

    #[serde(default)]
    pub expect: Expectations,

    /// Compare the primary response against the secondary target
    #[serde(default)]
    pub compare: Option<CompareDef>,
}

/// HTTP request description
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct RequestDef {
    #[serde(default = "default_method")]
    pub method: String,

    /// Path relative to the target base URL, or an absolute URL
    pub path: String,

    #[serde(default)]
    pub params: BTreeMap<String, Value>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// JSON request body
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Assertions applied to the primary response
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Expectations {
    #[serde(default)]
    pub status: Option<u16>,

    #[serde(default)]
    pub body_contains: Vec<String>,

    /// JSON pointer to expected value
    #[serde(default)]
    pub json: BTreeMap<String, Value>,

    /// Expected response headers (names are case-insensitive)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub max_duration_ms: Option<u64>,
}

/// Dual-target comparison settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompareDef {
    /// Compare pagination metadata and `data` items separately
    #[serde(default)]
    pub paginated: bool,

    /// JSON pointers removed from both bodies before diffing
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Feature {
    /// Parse a feature from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let feature: Self = serde_yaml::from_str(yaml).context("Failed to parse feature YAML")?;
        feature.validate()?;
        Ok(feature)
    }

    /// Parse a feature from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature file: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid feature: {}", path.display()))
    }

    /// Check scenario names are present and unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                anyhow::bail!("Scenario without a name in feature '{}'", self.feature);
            }
            if !seen.insert(scenario.name.as_str()) {
                anyhow::bail!(
                    "Duplicate scenario name '{}' in feature '{}'",
                    scenario.name,
                    self.feature
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl ScenarioDef {
    /// Scenario issuing a GET request to `path`
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            request: RequestDef {
                method: default_method(),
                path: path.into(),
                params: BTreeMap::new(),
                headers: BTreeMap::new(),
                body: None,
            },
            expect: Expectations::default(),
            compare: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expect.status = Some(status);
        self
    }
}

/// Strip a leading `@` and surrounding whitespace from a tag
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feature() {
        let yaml = r#"
feature: Collections
tags: ["@collections"]
background:
  headers:
    Accept: application/json
  params:
    limit: 50
scenarios:
  - name: list collections
    tags: [smoke]
    request:
      path: /collections
    expect:
      status: 200
      json:
        /total: 17
  - name: compare collection
    request:
      method: GET
      path: /collections/bukhari
    compare:
      ignore: ["/generatedAt"]
"#;
        let feature = Feature::from_yaml(yaml).unwrap();
        assert_eq!(feature.feature, "Collections");
        assert_eq!(feature.scenarios.len(), 2);
        assert_eq!(feature.background.params["limit"], serde_json::json!(50));
        assert_eq!(feature.scenarios[0].request.method, "GET");
        assert_eq!(feature.scenarios[0].expect.status, Some(200));
        assert!(feature.scenarios[1].compare.is_some());
        assert!(!feature.scenarios[1].compare.as_ref().unwrap().paginated);
    }

    #[test]
    fn test_duplicate_scenario_names() {
        let yaml = r#"
feature: Books
scenarios:
  - name: list
    request: { path: /books }
  - name: list
    request: { path: /books?page=2 }
"#;
        let err = Feature::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate scenario name"));
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("@ignore"), "ignore");
        assert_eq!(normalize_tag(" smoke "), "smoke");
    }
}
