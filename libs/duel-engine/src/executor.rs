/// Execution Dispatcher - Remote Code Execution Client
///
/// **Responsibility:**
/// Submit a compiled harness to the execution service and return its raw
/// result. Also lists the runtimes the service offers.
///
/// **Retry Policy:**
/// Only HTTP 429 is retried, up to [`RetryPolicy::max_attempts`] requests in
/// total, waiting `initial_backoff` before the second request and doubling
/// after every further throttle. No wait follows the final attempt. Any other
/// non-success status or transport error fails immediately.
///
/// Waits go through the [`Sleeper`] seam so tests can record them instead of
/// sleeping.
use crate::error::EngineError;
use crate::Result;
use async_trait::async_trait;
use duel_common::types::Runtime;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Abstraction over waiting between throttled attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Body of an execute request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFile>,
}

impl ExecuteRequest {
    pub fn new(
        language: impl Into<String>,
        version: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            version: version.into(),
            files: vec![SourceFile {
                name: file_name.into(),
                content: content.into(),
            }],
        }
    }
}

/// One stage (compile or run) as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// stdout and stderr interleaved in write order
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
}

impl StageOutput {
    /// Any stderr byte counts, whitespace included
    pub fn wrote_stderr(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// A stage that wrote to stderr or exited non-zero
    pub fn failed(&self) -> bool {
        self.wrote_stderr() || self.code.is_some_and(|code| code != 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub compile: Option<StageOutput>,
    #[serde(default)]
    pub run: Option<StageOutput>,
}

/// Seam between the engine facade and the execution service
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn runtimes(&self) -> Result<Vec<Runtime>>;
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionResult>;
}

enum DispatchState {
    Attempt { attempt: u32, backoff: Duration },
    Wait { attempt: u32, backoff: Duration },
}

enum AttemptOutcome<T> {
    Accepted(T),
    Throttled,
}

#[derive(Clone)]
pub struct ExecutionClient {
    http: Client,
    base_url: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ExecutionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            EngineError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn send_once<T: DeserializeOwned + Send>(
        &self,
        request: RequestBuilder,
    ) -> Result<AttemptOutcome<T>> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Dispatch(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(AttemptOutcome::Throttled);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Dispatch(format!(
                "execution service answered {}: {}",
                status,
                body.trim()
            )));
        }

        response
            .json::<T>()
            .await
            .map(AttemptOutcome::Accepted)
            .map_err(|e| EngineError::Dispatch(format!("invalid response body: {}", e)))
    }

    /// Run `build` until it is accepted, retrying throttled attempts
    async fn dispatch<T, F>(&self, endpoint: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned + Send,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut state = DispatchState::Attempt {
            attempt: 1,
            backoff: self.policy.initial_backoff,
        };

        loop {
            state = match state {
                DispatchState::Attempt { attempt, backoff } => {
                    debug!(endpoint, attempt, "Dispatching request");
                    match self.send_once(build()).await {
                        Ok(AttemptOutcome::Accepted(body)) => return Ok(body),
                        Ok(AttemptOutcome::Throttled) if attempt < self.policy.max_attempts => {
                            warn!(
                                endpoint,
                                attempt,
                                backoff_ms = backoff.as_millis() as u64,
                                "Execution service throttled request, backing off"
                            );
                            DispatchState::Wait { attempt, backoff }
                        }
                        Ok(AttemptOutcome::Throttled) => {
                            error!(endpoint, attempts = attempt, "Retries exhausted");
                            return Err(EngineError::Dispatch(format!(
                                "still throttled after {} attempts",
                                attempt
                            )));
                        }
                        Err(e) => {
                            error!(endpoint, attempt, error = %e, "Dispatch failed");
                            return Err(e);
                        }
                    }
                }
                DispatchState::Wait { attempt, backoff } => {
                    self.sleeper.sleep(backoff).await;
                    DispatchState::Attempt {
                        attempt: attempt + 1,
                        backoff: backoff * 2,
                    }
                }
            };
        }
    }
}

#[async_trait]
impl CodeRunner for ExecutionClient {
    async fn runtimes(&self) -> Result<Vec<Runtime>> {
        let url = self.url("runtimes");
        self.dispatch("runtimes", || self.http.get(&url)).await
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionResult> {
        let url = self.url("execute");
        self.dispatch("execute", || self.http.post(&url).json(request))
            .await
    }
}
