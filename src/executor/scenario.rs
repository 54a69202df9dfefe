//! Scenario executors
//!
//! The suite runner only knows the [`ScenarioExecutor`] trait. The HTTP
//! implementation resolves a scenario's request against the primary target,
//! checks expectations and optionally diffs against a secondary target.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::expect;
use crate::compare::{compare_responses, CompareOptions};
use crate::config::{AppConfig, EnvironmentConfig, TargetConfig};
use crate::error::ExecutionError;
use crate::http::{join_url, HttpClient, HttpError, HttpRequest};
use crate::models::{Scenario, ScenarioResult};
use crate::utils::Timer;

/// Executes one scenario and produces its result
///
/// An `Err` is recorded by the runner as an `Errored` outcome; expectation
/// mismatches are `Ok` results with a `Failed` outcome.
#[async_trait]
pub trait ScenarioExecutor: Send + Sync {
    async fn execute(&self, scenario: &Scenario) -> Result<ScenarioResult, ExecutionError>;
}

/// Executor issuing real HTTP requests
#[derive(Clone)]
pub struct HttpScenarioExecutor {
    client: HttpClient,
    primary: TargetConfig,
    secondary: Option<TargetConfig>,
    request_delay: Duration,
}

impl HttpScenarioExecutor {
    pub fn new(client: HttpClient, primary: TargetConfig) -> Self {
        Self {
            client,
            primary,
            secondary: None,
            request_delay: Duration::ZERO,
        }
    }

    pub fn with_secondary(mut self, secondary: TargetConfig) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Pause between the primary and secondary request of a comparison
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Build the executor for an environment using the configured HTTP settings
    pub fn from_config(config: &AppConfig, env: &EnvironmentConfig) -> Result<Self, HttpError> {
        let client = HttpClient::new(config.http.timeout_secs)?.with_retry(config.http.retry_policy());
        let mut executor = Self::new(client, env.primary.clone())
            .with_request_delay(Duration::from_millis(config.http.request_delay_ms));
        if let Some(secondary) = &env.secondary {
            executor = executor.with_secondary(secondary.clone());
        }
        Ok(executor)
    }

    fn build_request(&self, target: &TargetConfig, scenario: &Scenario) -> HttpRequest {
        let def = &scenario.definition.request;
        let mut request = HttpRequest::new(
            def.method.to_uppercase(),
            join_url(&target.base_url, &def.path),
        )
        .header("Accept", "application/json");

        if let Some(key) = target.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.header("X-API-Key", key);
        }
        for (name, value) in scenario.background.headers.iter().chain(&def.headers) {
            request = request.header(name.clone(), value.clone());
        }

        let mut params: BTreeMap<&String, &Value> = scenario.background.params.iter().collect();
        params.extend(def.params.iter());
        for (name, value) in params {
            request = request.query(name.clone(), query_value(value));
        }

        if let Some(body) = &def.body {
            request = request.json(body);
        }
        request
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ScenarioExecutor for HttpScenarioExecutor {
    async fn execute(&self, scenario: &Scenario) -> Result<ScenarioResult, ExecutionError> {
        let def = &scenario.definition;
        if def.request.path.trim().is_empty() {
            return Err(ExecutionError::InvalidRequest(
                "request path is empty".to_string(),
            ));
        }
        let secondary = match &def.compare {
            Some(_) => Some(
                self.secondary
                    .as_ref()
                    .ok_or(ExecutionError::MissingSecondaryTarget)?,
            ),
            None => None,
        };

        let timer = Timer::start(scenario.id.to_string());
        let request = self.build_request(&self.primary, scenario);
        let response = self.client.send_with_retry(&request).await?;

        let mut failures = Vec::new();
        if let Some(error) = &response.error {
            failures.push(error.clone());
        }
        failures.extend(expect::check(&def.expect, &response));

        let mut details = json!({
            "method": request.method,
            "url": request.url,
            "status": response.status_code,
            "response_ms": response.duration_ms,
        });

        if let (Some(compare), Some(target)) = (&def.compare, secondary) {
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            let other = self
                .client
                .send_with_retry(&self.build_request(target, scenario))
                .await?;
            let differences = compare_responses(&response, &other, &CompareOptions::from(compare));
            debug!(
                "{}: {} differences against {}",
                scenario.id,
                differences.len(),
                target.base_url
            );

            details["secondary_url"] = json!(join_url(&target.base_url, &def.request.path));
            details["secondary_status"] = json!(other.status_code);
            details["differences"] = json!(differences);
            failures.extend(differences);
        }

        let duration_ms = timer.stop();
        let result = if failures.is_empty() {
            ScenarioResult::passed(scenario.id.clone(), duration_ms)
        } else {
            ScenarioResult::failed(scenario.id.clone(), duration_ms, failures.join("; "))
        };

        Ok(result
            .with_tags(scenario.tags.clone())
            .with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use crate::models::{CompareDef, Outcome, ScenarioDef};
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn primary_app(total: u64) -> Router {
        Router::new()
            .route(
                "/v1/collections",
                get(move |Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "total": total,
                        "limit": q.get("limit").cloned().unwrap_or_default(),
                        "data": [{"name": "bukhari"}, {"name": "muslim"}]
                    }))
                }),
            )
            .route(
                "/v1/whoami",
                get(|headers: HeaderMap| async move {
                    let key = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    Json(json!({ "key": key }))
                }),
            )
            .route("/v1/missing", get(|| async { StatusCode::NOT_FOUND }))
    }

    fn target(base_url: &str) -> TargetConfig {
        TargetConfig {
            base_url: base_url.to_string(),
            api_key: Some("secret".to_string()),
        }
    }

    fn executor(base_url: &str) -> HttpScenarioExecutor {
        let client = HttpClient::new(5).unwrap().with_retry(RetryPolicy::none());
        HttpScenarioExecutor::new(client, target(base_url))
    }

    #[tokio::test]
    async fn test_passing_scenario() {
        let base = serve(primary_app(2)).await;
        let mut def = ScenarioDef::get("list", "/collections").expect_status(200);
        def.expect.json.insert("/total".to_string(), json!(2));
        def.request.params.insert("limit".to_string(), json!(50));
        let scenario = Scenario::new("collections.feature.yaml", def);

        let result = executor(&base).execute(&scenario).await.unwrap();
        assert_eq!(result.outcome, Outcome::Passed, "{:?}", result.error);
        let details = result.details.unwrap();
        assert_eq!(details["status"], 200);
        assert!(details["url"].as_str().unwrap().ends_with("/v1/collections"));
    }

    #[tokio::test]
    async fn test_api_key_header_sent() {
        let base = serve(primary_app(2)).await;
        let mut def = ScenarioDef::get("whoami", "whoami");
        def.expect.json.insert("/key".to_string(), json!("secret"));
        let scenario = Scenario::new("auth.feature.yaml", def);

        let result = executor(&base).execute(&scenario).await.unwrap();
        assert_eq!(result.outcome, Outcome::Passed, "{:?}", result.error);
    }

    #[tokio::test]
    async fn test_status_mismatch_fails() {
        let base = serve(primary_app(2)).await;
        let scenario = Scenario::new(
            "books.feature.yaml",
            ScenarioDef::get("missing", "/missing").expect_status(200),
        );

        let result = executor(&base).execute(&scenario).await.unwrap();
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.error.as_deref(), Some("expected 200 got 404"));
    }

    #[tokio::test]
    async fn test_compare_against_secondary() {
        let primary = serve(primary_app(2)).await;
        let secondary = serve(primary_app(3)).await;

        let mut def = ScenarioDef::get("compare", "/collections");
        def.compare = Some(CompareDef {
            paginated: true,
            ignore: Vec::new(),
        });
        let scenario = Scenario::new("collections.feature.yaml", def);

        let result = executor(&primary)
            .with_secondary(target(&secondary))
            .execute(&scenario)
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Failed);
        let error = result.error.unwrap();
        assert!(error.contains("Pagination values_changed: root['total']"));
        assert_eq!(result.details.unwrap()["secondary_status"], 200);
    }

    #[tokio::test]
    async fn test_compare_without_secondary_errors() {
        let base = serve(primary_app(2)).await;
        let mut def = ScenarioDef::get("compare", "/collections");
        def.compare = Some(CompareDef::default());
        let scenario = Scenario::new("collections.feature.yaml", def);

        let err = executor(&base).execute(&scenario).await.unwrap_err();
        assert!(matches!(err, ExecutionError::MissingSecondaryTarget));
    }
}
