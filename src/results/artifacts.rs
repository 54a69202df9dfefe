//! Per-scenario result artifacts
//!
//! Each scenario writes one pretty-printed JSON file into the run's artifact
//! directory. The report generator reads them back.

use chrono::Utc;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{RunnerError, RunnerResult};
use crate::models::ScenarioResult;

/// Generate a unique run ID
pub fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Reject run ids that would not name a single directory below the results dir
pub fn validate_run_id(run_id: &str) -> RunnerResult<()> {
    let mut components = Path::new(run_id).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || run_id.contains(['/', '\\']) {
        return Err(RunnerError::InvalidRunId(run_id.to_string()));
    }
    Ok(())
}

/// Artifact directory of a single run
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open an existing artifact directory for reading
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create an empty artifact directory, removing any previous contents
    pub fn create_fresh(dir: impl Into<PathBuf>) -> RunnerResult<Self> {
        let dir = dir.into();
        if dir.exists() {
            debug!("Clearing stale artifact directory {}", dir.display());
            fs::remove_dir_all(&dir).map_err(|source| RunnerError::ArtifactDir {
                path: dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&dir).map_err(|source| RunnerError::ArtifactDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one scenario result as `<dir>/<file_name>`
    pub async fn write(&self, file_name: &str, result: &ScenarioResult) -> RunnerResult<PathBuf> {
        let path = self.dir.join(file_name);
        let json = serde_json::to_vec_pretty(result).map_err(|e| RunnerError::ArtifactWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|source| RunnerError::ArtifactWrite {
                path: path.clone(),
                source,
            })?;

        debug!("Wrote artifact {}", path.display());
        Ok(path)
    }

    /// All `.json` files under the directory, recursively, in path order
    pub fn discover(&self) -> RunnerResult<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(RunnerError::ArtifactRead {
                path: self.dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "artifact directory not found",
                ),
            });
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| RunnerError::ArtifactRead {
                path: self.dir.clone(),
                source: e.into(),
            })?;
            let is_json = entry
                .path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false);
            if entry.file_type().is_file() && is_json {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    /// Load every artifact that parses as a scenario result
    ///
    /// Files that are unreadable or hold something else are skipped with a
    /// warning.
    pub fn load_all(&self) -> RunnerResult<Vec<ScenarioResult>> {
        let mut results = Vec::new();
        for path in self.discover()? {
            match load_artifact(&path) {
                Ok(result) => results.push(result),
                Err(e) => warn!("Skipping artifact {}: {}", path.display(), e),
            }
        }
        Ok(results)
    }
}

fn load_artifact(path: &Path) -> anyhow::Result<ScenarioResult> {
    let file = File::open(path)?;
    let result = serde_json::from_reader(BufReader::new(file))?;
    Ok(result)
}
