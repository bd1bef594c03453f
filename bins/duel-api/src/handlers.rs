// HTTP route handlers for the Duel API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use duel_common::redis as problem_cache;
use duel_common::types::{
    GradingOutcome, ProblemGradingContext, RequestInfo, ResponseType, Submission,
};
use duel_engine::{type_grammar, INTERNAL_ERROR_MESSAGE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemResponse {
    pub response_type: ResponseType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ProblemGradingContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "requestInfo")]
    pub request_info: RequestInfo,
}

impl ProblemResponse {
    fn new(response_type: ResponseType, name: String) -> Self {
        Self {
            response_type,
            name,
            context: None,
            error: None,
            request_info: RequestInfo::new(),
        }
    }

    fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Failures are the only outcome that is not a 200
fn outcome_status(outcome: &GradingOutcome) -> StatusCode {
    match outcome.response_type {
        ResponseType::Failure => StatusCode::INTERNAL_SERVER_ERROR,
        ResponseType::Success | ResponseType::Bug => StatusCode::OK,
    }
}

/// A context is accepted only if its return type resolves
fn validate_context(context: &ProblemGradingContext) -> Result<(), String> {
    type_grammar::resolve(&context.return_type)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// GET /runtimes - Runtimes available for submissions
pub async fn list_runtimes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = state
        .engine
        .list_runtimes()
        .await
        .with_request_info(RequestInfo::new());

    let status = match response.response_type {
        ResponseType::Failure => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Json(response))
}

/// POST /runcode - Run a submission against its problem's tests
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<Submission>,
) -> impl IntoResponse {
    let request_info = RequestInfo::new();
    let mut conn = state.redis.clone();

    let context =
        match problem_cache::get_context(&mut conn, &submission.name, state.problem_ttl_secs).await {
            Ok(context) => context,
            Err(e) => {
                error!(
                    request_id = %request_info.request_id,
                    problem = %submission.name,
                    error = %e,
                    "Failed to read problem cache"
                );
                let outcome =
                    GradingOutcome::failure(INTERNAL_ERROR_MESSAGE).with_request_info(request_info);
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(outcome));
            }
        };

    if context.is_none() {
        warn!(problem = %submission.name, "No cached grading context");
    }

    info!(
        request_id = %request_info.request_id,
        problem = %submission.name,
        language = %submission.language,
        "Submission received"
    );

    let outcome = state
        .engine
        .run_and_grade(&submission, context.as_ref())
        .await
        .with_request_info(request_info);

    (outcome_status(&outcome), Json(outcome))
}

/// PUT /problems/{name} - Seed the grading context for a problem
pub async fn store_problem(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(context): Json<ProblemGradingContext>,
) -> impl IntoResponse {
    if let Err(reason) = validate_context(&context) {
        warn!(problem = %name, %reason, "Rejected problem context");
        return (
            StatusCode::BAD_REQUEST,
            Json(ProblemResponse::new(ResponseType::Failure, name).with_error(reason)),
        );
    }

    let mut conn = state.redis.clone();
    match problem_cache::store_context(&mut conn, &name, &context, state.problem_ttl_secs).await {
        Ok(()) => {
            info!(problem = %name, tests = context.tests.len(), "Problem context stored");
            (
                StatusCode::OK,
                Json(ProblemResponse::new(ResponseType::Success, name)),
            )
        }
        Err(e) => {
            error!(problem = %name, error = %e, "Failed to store problem context");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(
                    ProblemResponse::new(ResponseType::Failure, name)
                        .with_error(INTERNAL_ERROR_MESSAGE),
                ),
            )
        }
    }
}

/// GET /problems/{name} - Read back a cached problem context
pub async fn get_problem(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let mut conn = state.redis.clone();
    match problem_cache::get_context(&mut conn, &name, state.problem_ttl_secs).await {
        Ok(Some(context)) => {
            let mut response = ProblemResponse::new(ResponseType::Success, name);
            response.context = Some(context);
            (StatusCode::OK, Json(response))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(
                ProblemResponse::new(ResponseType::Failure, name)
                    .with_error("Problem not found or expired"),
            ),
        ),
        Err(e) => {
            error!(problem = %name, error = %e, "Failed to read problem cache");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(
                    ProblemResponse::new(ResponseType::Failure, name)
                        .with_error(INTERNAL_ERROR_MESSAGE),
                ),
            )
        }
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
