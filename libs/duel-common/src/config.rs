// Process configuration shared by the API and CLI

use crate::redis::DEFAULT_PROBLEM_TTL_SECS;
use std::path::PathBuf;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_EXECUTION_API_URL: &str = "https://emkc.org/api/v2/piston/";
pub const DEFAULT_LANGUAGES_CONFIG: &str = "config/languages.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3232";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub redis_url: String,
    /// Base URL of the execution service; `runtimes` and `execute` are joined onto it
    pub execution_api_url: String,
    pub languages_config: PathBuf,
    pub bind_addr: String,
    pub problem_cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            execution_api_url: DEFAULT_EXECUTION_API_URL.to_string(),
            languages_config: PathBuf::from(DEFAULT_LANGUAGES_CONFIG),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            problem_cache_ttl_secs: DEFAULT_PROBLEM_TTL_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset or unparsable values
    /// fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            execution_api_url: lookup("EXECUTION_API_URL").unwrap_or(defaults.execution_api_url),
            languages_config: lookup("LANGUAGES_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.languages_config),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            problem_cache_ttl_secs: lookup("PROBLEM_CACHE_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.problem_cache_ttl_secs),
            http_timeout_secs: lookup("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
        }
    }
}
