use crate::types::ProblemGradingContext;
use redis::{AsyncCommands, RedisResult};

/// Per-problem cache semantics shared by everything that touches the cache.
/// The problem listing side writes contexts, the grading side reads them;
/// keys must agree on both ends.

pub const PROBLEM_PREFIX: &str = "Problems/";

/// Contexts expire this long after their last read or write
pub const DEFAULT_PROBLEM_TTL_SECS: u64 = 30 * 60;

/// Generate deterministic cache key for a problem
pub fn problem_key(problem_name: &str) -> String {
    format!("{}{}", PROBLEM_PREFIX, problem_name)
}

fn to_redis_error(context: &'static str, e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, context, e.to_string()))
}

/// Store a problem's grading context with a TTL
pub async fn store_context(
    conn: &mut redis::aio::ConnectionManager,
    problem_name: &str,
    context: &ProblemGradingContext,
    ttl_secs: u64,
) -> RedisResult<()> {
    let key = problem_key(problem_name);
    let payload = serde_json::to_string(context)
        .map_err(|e| to_redis_error("serialization error", e))?;

    conn.set_ex(&key, payload, ttl_secs).await
}

/// Fetch a problem's grading context.
/// A hit refreshes the TTL so active problems stay cached.
pub async fn get_context(
    conn: &mut redis::aio::ConnectionManager,
    problem_name: &str,
    ttl_secs: u64,
) -> RedisResult<Option<ProblemGradingContext>> {
    let key = problem_key(problem_name);
    let payload: Option<String> = conn.get(&key).await?;

    match payload {
        Some(data) => {
            let context: ProblemGradingContext = serde_json::from_str(&data)
                .map_err(|e| to_redis_error("deserialization error", e))?;
            let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
            let _: () = conn.expire(&key, ttl).await?;
            Ok(Some(context))
        }
        None => Ok(None),
    }
}
