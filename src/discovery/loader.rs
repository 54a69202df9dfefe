//! Feature file discovery

use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::tags::TagFilter;
use crate::error::{RunnerError, RunnerResult};
use crate::models::{normalize_tag, Feature, Scenario};

const FEATURE_SUFFIXES: [&str; 2] = [".feature.yaml", ".feature.yml"];

/// Whether `path` names a feature file
pub fn is_feature_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| FEATURE_SUFFIXES.iter().any(|s| n.ends_with(s)))
        .unwrap_or(false)
}

/// Discover scenarios under `path`
///
/// A directory is walked recursively in file-name order and scenarios are
/// kept when their tags satisfy `filter`. A single file is run as-is: every
/// scenario it contains is returned whatever the filter says.
pub fn discover(path: &Path, filter: Option<&TagFilter>) -> RunnerResult<Vec<Scenario>> {
    if !path.exists() {
        return Err(RunnerError::Discovery(format!(
            "path does not exist: {}",
            path.display()
        )));
    }

    let scenarios = if path.is_file() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Direct mode: {}", path.display());
        load_feature(path, &name)?
    } else {
        let mut scenarios = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| RunnerError::Discovery(e.to_string()))?;
            if !entry.file_type().is_file() || !is_feature_file(entry.path()) {
                continue;
            }
            let relative = relative_name(path, entry.path());
            scenarios.extend(load_feature(entry.path(), &relative)?);
        }

        match filter {
            Some(filter) => scenarios
                .into_iter()
                .filter(|s| filter.matches(&s.tags))
                .collect(),
            None => scenarios,
        }
    };

    let scenarios: Vec<Scenario> = scenarios
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.with_index(i))
        .collect();

    info!(
        "Discovered {} scenarios under {}",
        scenarios.len(),
        path.display()
    );
    Ok(scenarios)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn load_feature(path: &Path, name: &str) -> RunnerResult<Vec<Scenario>> {
    let feature =
        Feature::from_file(path).map_err(|e| RunnerError::Discovery(format!("{e:#}")))?;

    let feature_tags: Vec<String> = feature.tags.iter().map(|t| normalize_tag(t)).collect();
    debug!(
        "Loaded feature '{}' ({} scenarios) from {}",
        feature.feature,
        feature.scenarios.len(),
        name
    );

    Ok(feature
        .scenarios
        .into_iter()
        .map(|def| {
            let mut tags = feature_tags.clone();
            for tag in def.tags.iter().map(|t| normalize_tag(t)) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            Scenario::new(name, def)
                .with_background(feature.background.clone())
                .with_tags(tags)
        })
        .collect())
}
