//! Executable scenario models

use serde::{Deserialize, Serialize};
use std::fmt;

use super::feature::{Background, ScenarioDef};

/// Scenario identity: feature path plus scenario name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioId {
    /// Feature file path relative to the discovery root, `/`-separated
    pub feature: String,
    pub name: String,
}

impl ScenarioId {
    pub fn new(feature: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            name: name.into(),
        }
    }

    /// Filesystem-safe rendering of the identity
    pub fn slug(&self) -> String {
        let raw = format!("{}-{}", self.feature, self.name);
        let mut slug = String::with_capacity(raw.len());
        let mut last_dash = true;

        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }

        let slug = slug.trim_end_matches('-');
        slug.chars().take(80).collect()
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.feature, self.name)
    }
}

/// A discovered scenario ready to execute
#[derive(Clone, Debug)]
pub struct Scenario {
    pub id: ScenarioId,
    /// Position in discovery order
    pub index: usize,
    /// Feature tags merged with scenario tags
    pub tags: Vec<String>,
    pub background: Background,
    pub definition: ScenarioDef,
}

impl Scenario {
    pub fn new(feature: impl Into<String>, definition: ScenarioDef) -> Self {
        let id = ScenarioId::new(feature, definition.name.clone());
        Self {
            id,
            index: 0,
            tags: definition.tags.clone(),
            background: Background::default(),
            definition,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Artifact file name, unique per discovery index
    pub fn artifact_name(&self) -> String {
        format!("{:04}-{}.json", self.index, self.id.slug())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.tags.is_empty() {
            write!(f, " [{}]", self.tags.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_id_display() {
        let id = ScenarioId::new("books/list.feature.yaml", "first page");
        assert_eq!(id.to_string(), "books/list.feature.yaml::first page");
    }

    #[test]
    fn test_slug() {
        let id = ScenarioId::new("books/list.feature.yaml", "First Page (200)");
        assert_eq!(id.slug(), "books-list-feature-yaml-first-page-200");
    }

    #[test]
    fn test_artifact_names_are_distinct() {
        let def = ScenarioDef::get("same", "/x");
        let a = Scenario::new("a.feature.yaml", def.clone()).with_index(1);
        let b = Scenario::new("a.feature.yaml", def).with_index(2);
        assert_ne!(a.artifact_name(), b.artifact_name());
        assert_eq!(a.artifact_name(), "0001-a-feature-yaml-same.json");
    }
}
