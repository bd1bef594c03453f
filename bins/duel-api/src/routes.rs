// HTTP route table for the Duel API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/runtimes", get(handlers::list_runtimes))
        .route("/runcode", post(handlers::run_code))
        .route(
            "/problems/:name",
            get(handlers::get_problem).put(handlers::store_problem),
        )
        .route("/status", get(handlers::health_check))
}
