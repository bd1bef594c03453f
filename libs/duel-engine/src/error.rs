use thiserror::Error;

/// Every way a grading request can fail internally.
///
/// None of these reach the caller verbatim: the engine facade logs them and
/// answers with one generic message. A submission that writes to stderr is
/// not an error at all; it becomes a `bug` outcome, as does a malformed
/// submission the harness compiler refuses to splice.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot resolve type '{type_string}': {reason}")]
    Resolution { type_string: String, reason: String },

    #[error("No grading context for problem '{0}' (missing or expired)")]
    ContextMissing(String),

    /// Class-based submission whose trimmed source does not end in `}`
    #[error("Malformed submission: {0}")]
    MalformedSubmission(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Result marker not found in program output")]
    MarkerNotFound,

    #[error("Harness produced {actual} results for {expected} test cases")]
    Desync { expected: usize, actual: usize },

    #[error("Cannot parse value '{text}': {reason}")]
    Parse { text: String, reason: String },
}

impl EngineError {
    pub(crate) fn resolution(type_string: &str, reason: impl Into<String>) -> Self {
        EngineError::Resolution {
            type_string: type_string.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(text: &str, reason: impl Into<String>) -> Self {
        EngineError::Parse {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}
