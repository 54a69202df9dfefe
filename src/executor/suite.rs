//! Parallel suite runner
//!
//! Runs discovered scenarios on a bounded pool of tokio tasks. Each task
//! writes its own artifact before finishing and `run` returns only after
//! every task has completed.

use chrono::Utc;
use futures::future::join_all;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::scenario::ScenarioExecutor;
use crate::discovery::{discover, TagFilter};
use crate::error::{RunnerError, RunnerResult};
use crate::models::{RunResults, Scenario, ScenarioResult};
use crate::results::{generate_run_id, validate_run_id, ArtifactStore};
use crate::utils::Timer;

/// Runs scenarios and collects their results
pub struct SuiteRunner {
    executor: Arc<dyn ScenarioExecutor>,
    results_dir: PathBuf,
    run_id: Option<String>,
}

impl SuiteRunner {
    /// Artifacts land in `<results_dir>/<run_id>/`
    pub fn new(executor: Arc<dyn ScenarioExecutor>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            results_dir: results_dir.into(),
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Discover scenarios under `path` and run them
    pub async fn run(
        &self,
        path: &Path,
        filter: Option<&TagFilter>,
        parallelism: usize,
    ) -> RunnerResult<RunResults> {
        if parallelism == 0 {
            return Err(RunnerError::InvalidParallelism(parallelism));
        }
        let scenarios = discover(path, filter)?;
        self.run_scenarios(scenarios, parallelism).await
    }

    /// Run already discovered scenarios; results keep the given order
    pub async fn run_scenarios(
        &self,
        scenarios: Vec<Scenario>,
        parallelism: usize,
    ) -> RunnerResult<RunResults> {
        if parallelism == 0 {
            return Err(RunnerError::InvalidParallelism(parallelism));
        }

        let run_id = self.run_id.clone().unwrap_or_else(generate_run_id);
        validate_run_id(&run_id)?;
        let started_at = Utc::now();
        let store = Arc::new(ArtifactStore::create_fresh(self.results_dir.join(&run_id))?);

        info!(
            "Running {} scenarios (max {} concurrent), run {}",
            scenarios.len(),
            parallelism,
            run_id
        );

        let semaphore = Arc::new(Semaphore::new(parallelism));
        let mut handles = Vec::with_capacity(scenarios.len());

        for scenario in scenarios.iter().cloned() {
            let semaphore = semaphore.clone();
            let executor = self.executor.clone();
            let store = store.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let result = ScenarioResult::errored(scenario.id.clone(), 0, e.to_string())
                            .with_tags(scenario.tags.clone());
                        return persist(&store, &scenario, result).await;
                    }
                };

                debug!("Starting {}", scenario);
                let timer = Timer::start(scenario.id.to_string());

                let result = match executor.execute(&scenario).await {
                    Ok(result) => result,
                    Err(e) => ScenarioResult::errored(scenario.id.clone(), timer.elapsed_ms(), e.to_string())
                        .with_tags(scenario.tags.clone()),
                };

                persist(&store, &scenario, result).await
            });

            handles.push(handle);
        }

        let joined = join_all(handles).await;
        let mut results = Vec::with_capacity(joined.len());

        for (scenario, outcome) in scenarios.iter().zip(joined) {
            let result = match outcome {
                Ok(result) => result,
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        format!("scenario panicked: {}", panic_message(join_error.into_panic()))
                    } else {
                        "scenario task was cancelled".to_string()
                    };
                    let result = ScenarioResult::errored(scenario.id.clone(), 0, message)
                        .with_tags(scenario.tags.clone());
                    persist(&store, scenario, result).await
                }
            };
            results.push(result);
        }

        let run = RunResults::new(run_id, results, store.dir(), started_at);
        info!(
            "Run {} completed in {}ms - Pass: {}/{} ({:.1}%)",
            run.run_id(),
            run.wall_time_ms(),
            run.total() - run.fail_count(),
            run.total(),
            run.pass_rate()
        );

        Ok(run)
    }
}

/// Write the artifact; a write failure turns the result into `Errored`
async fn persist(store: &ArtifactStore, scenario: &Scenario, result: ScenarioResult) -> ScenarioResult {
    if result.is_failure() {
        error!(
            "{} {}: {}",
            result.outcome,
            result.id,
            result.error.as_deref().unwrap_or("")
        );
    }

    match store.write(&scenario.artifact_name(), &result).await {
        Ok(_) => result,
        Err(e) => {
            error!("{}: {}", result.id, e);
            ScenarioResult::errored(result.id.clone(), result.duration_ms, e.to_string())
                .with_tags(result.tags.clone())
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::models::{Outcome, ScenarioDef, ScenarioId, Verdict};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Outcome chosen by scenario name prefix; later scenarios finish first
    struct ScriptedExecutor;

    #[async_trait]
    impl ScenarioExecutor for ScriptedExecutor {
        async fn execute(&self, scenario: &Scenario) -> Result<ScenarioResult, ExecutionError> {
            let delay = 20u64.saturating_sub(scenario.index as u64 * 2);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let id = scenario.id.clone();
            let name = id.name.clone();
            if name.starts_with("fail") {
                Ok(ScenarioResult::failed(id, delay, "expected 200 got 404"))
            } else if name.starts_with("error") {
                Err(ExecutionError::InvalidRequest("bad scenario".to_string()))
            } else if name.starts_with("panic") {
                panic!("executor exploded");
            } else {
                Ok(ScenarioResult::passed(id, delay))
            }
        }
    }

    fn write_feature(dir: &Path, file: &str, names: &[&str]) {
        let mut yaml = String::from("feature: Generated\nscenarios:\n");
        for name in names {
            yaml.push_str(&format!("  - name: {name}\n    request: {{ path: /{name} }}\n"));
        }
        fs::write(dir.join(file), yaml).unwrap();
    }

    fn runner(results_dir: &Path) -> SuiteRunner {
        SuiteRunner::new(Arc::new(ScriptedExecutor), results_dir).with_run_id("run-test")
    }

    #[tokio::test]
    async fn test_every_scenario_once_in_discovery_order() {
        let features = TempDir::new().unwrap();
        let names: Vec<String> = (0..12).map(|i| format!("ok-{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_feature(features.path(), "a.feature.yaml", &refs[..6]);
        write_feature(features.path(), "b.feature.yaml", &refs[6..]);

        for parallelism in [1, 2, 8] {
            let out = TempDir::new().unwrap();
            let run = runner(out.path())
                .run(features.path(), None, parallelism)
                .await
                .unwrap();

            let ids: Vec<&str> = run.results().iter().map(|r| r.id.name.as_str()).collect();
            assert_eq!(ids, refs, "parallelism {parallelism}");

            let unique: HashSet<&ScenarioId> = run.results().iter().map(|r| &r.id).collect();
            assert_eq!(unique.len(), 12);

            let artifacts = ArtifactStore::open(run.artifact_dir()).discover().unwrap();
            assert_eq!(artifacts.len(), 12);
            assert_eq!(run.fail_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_errors_and_panics_are_isolated() {
        let features = TempDir::new().unwrap();
        write_feature(
            features.path(),
            "mixed.feature.yaml",
            &["ok-1", "error-1", "panic-1", "fail-1", "ok-2"],
        );
        let out = TempDir::new().unwrap();

        let run = runner(out.path()).run(features.path(), None, 2).await.unwrap();

        let outcomes: Vec<Outcome> = run.results().iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Passed,
                Outcome::Errored,
                Outcome::Errored,
                Outcome::Failed,
                Outcome::Passed
            ]
        );
        assert_eq!(run.fail_count(), 3);
        assert!(run.results()[1]
            .error
            .as_deref()
            .unwrap()
            .contains("bad scenario"));
        assert!(run.results()[2]
            .error
            .as_deref()
            .unwrap()
            .contains("executor exploded"));

        let artifacts = ArtifactStore::open(run.artifact_dir()).load_all().unwrap();
        assert_eq!(artifacts.len(), 5);
    }

    #[tokio::test]
    async fn test_failure_message_reaches_verdict() {
        let features = TempDir::new().unwrap();
        write_feature(features.path(), "books.feature.yaml", &["ok-1", "fail-1", "ok-2"]);
        let out = TempDir::new().unwrap();

        let run = runner(out.path()).run(features.path(), None, 5).await.unwrap();
        assert_eq!(run.fail_count(), 1);
        assert_eq!(run.error_messages(), vec!["expected 200 got 404"]);

        let err = Verdict::from_results(&run).into_result().unwrap_err();
        assert!(err.to_string().contains("expected 200 got 404"));
    }

    #[tokio::test]
    async fn test_zero_parallelism_rejected() {
        let features = TempDir::new().unwrap();
        write_feature(features.path(), "a.feature.yaml", &["ok-1"]);
        let out = TempDir::new().unwrap();

        let err = runner(out.path())
            .run(features.path(), None, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::InvalidParallelism(0)));
    }

    #[tokio::test]
    async fn test_run_id_cannot_leave_results_dir() {
        let features = TempDir::new().unwrap();
        write_feature(features.path(), "a.feature.yaml", &["ok-1"]);

        let root = TempDir::new().unwrap();
        let results_dir = root.path().join("results");
        let earlier = results_dir.join("20260101_120000_0001");
        fs::create_dir_all(&earlier).unwrap();
        fs::write(earlier.join("older-run.json"), "{}").unwrap();
        let precious = root.path().join("precious");
        fs::create_dir_all(&precious).unwrap();
        fs::write(precious.join("keep.txt"), "data").unwrap();

        let absolute = precious.to_string_lossy().into_owned();
        for run_id in ["", "..", "../precious", absolute.as_str()] {
            let err = SuiteRunner::new(Arc::new(ScriptedExecutor), &results_dir)
                .with_run_id(run_id)
                .run(features.path(), None, 2)
                .await
                .unwrap_err();
            assert!(matches!(err, RunnerError::InvalidRunId(_)), "{run_id:?}");
        }

        assert!(precious.join("keep.txt").exists());
        assert!(earlier.join("older-run.json").exists());
    }

    #[tokio::test]
    async fn test_rerun_replaces_artifacts() {
        let features = TempDir::new().unwrap();
        write_feature(features.path(), "a.feature.yaml", &["ok-1", "ok-2", "ok-3"]);
        let out = TempDir::new().unwrap();

        runner(out.path()).run(features.path(), None, 2).await.unwrap();
        write_feature(features.path(), "a.feature.yaml", &["ok-1"]);
        let run = runner(out.path()).run(features.path(), None, 2).await.unwrap();

        let artifacts = ArtifactStore::open(run.artifact_dir()).discover().unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(run.total(), 1);
    }

    #[tokio::test]
    async fn test_filter_and_direct_mode() {
        let features = TempDir::new().unwrap();
        fs::write(
            features.path().join("tagged.feature.yaml"),
            r#"
feature: Tagged
scenarios:
  - name: ok-kept
    request: { path: /a }
  - name: ok-ignored
    tags: ["@ignore"]
    request: { path: /b }
"#,
        )
        .unwrap();
        let filter = TagFilter::parse(&["~@ignore"]).unwrap();
        let out = TempDir::new().unwrap();

        let tree = runner(out.path())
            .run(features.path(), Some(&filter), 5)
            .await
            .unwrap();
        assert_eq!(tree.total(), 1);

        let direct = runner(out.path())
            .run(&features.path().join("tagged.feature.yaml"), Some(&filter), 5)
            .await
            .unwrap();
        assert_eq!(direct.total(), 2);
    }

    #[tokio::test]
    async fn test_empty_discovery() {
        let features = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let run = runner(out.path()).run(features.path(), None, 5).await.unwrap();
        assert_eq!(run.total(), 0);
        assert_eq!(run.fail_count(), 0);
    }

    #[tokio::test]
    async fn test_run_scenarios_directly() {
        let scenarios = vec![
            Scenario::new("inline", ScenarioDef::get("ok-a", "/a")).with_index(0),
            Scenario::new("inline", ScenarioDef::get("fail-b", "/b")).with_index(1),
        ];
        let out = TempDir::new().unwrap();
        let run = runner(out.path()).run_scenarios(scenarios, 1).await.unwrap();
        assert_eq!(run.count(Outcome::Failed), 1);
        assert_eq!(run.artifact_dir(), out.path().join("run-test"));
    }
}
