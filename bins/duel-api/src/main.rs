mod handlers;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use duel_common::config::Config;
use duel_engine::{ExecutionClient, GradingEngine, LanguageConfigManager};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct AppState {
    pub redis: ConnectionManager,
    pub engine: GradingEngine<ExecutionClient>,
    /// Idle lifetime of cached problem contexts
    pub problem_ttl_secs: u64,
}

/// Languages from the configured file, or the embedded copy when it is absent
fn load_languages(config: &Config) -> Result<LanguageConfigManager> {
    if config.languages_config.exists() {
        LanguageConfigManager::load(&config.languages_config).with_context(|| {
            format!(
                "Failed to load language config from {}",
                config.languages_config.display()
            )
        })
    } else {
        warn!(
            path = %config.languages_config.display(),
            "Language config not found, using built-in languages"
        );
        LanguageConfigManager::builtin().context("Built-in language config is invalid")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Duel API booting...");

    let config = Config::from_env();

    let languages = load_languages(&config)?;
    info!(languages = ?languages.list_languages(), "Loaded language templates");

    let client = redis::Client::open(config.redis_url.as_str())
        .context("Failed to create Redis client")?;
    let redis_conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis: {}", config.redis_url);

    let runner = ExecutionClient::new(
        &config.execution_api_url,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    info!(url = runner.base_url(), "Execution service configured");

    let state = Arc::new(AppState {
        redis: redis_conn,
        engine: GradingEngine::new(languages, runner),
        problem_ttl_secs: config.problem_cache_ttl_secs,
    });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);
    info!("Ready to grade submissions");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
