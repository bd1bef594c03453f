use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Code submitted by a player for one problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Problem name, doubles as the function name the harness calls
    pub name: String,
    pub language: String,
    pub version: String,
    pub code: String,
}

/// Which spelling of the test arguments a language expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgsFamily {
    /// Literal syntax shared by Python and JavaScript (`[1, 2]`, `"a"`)
    Script,
    /// Java expressions (`List.of(1, 2)`)
    Java,
}

/// One hidden test vector. Position in the problem's list is the only
/// link between a test and its result in the harness output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "params")]
    pub args: String,
    #[serde(rename = "jparams", default, skip_serializing_if = "Option::is_none")]
    pub java_args: Option<String>,
    pub expected: String,
}

impl TestCase {
    pub fn new(args: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            args: args.into(),
            java_args: None,
            expected: expected.into(),
        }
    }

    pub fn with_java_args(mut self, java_args: impl Into<String>) -> Self {
        self.java_args = Some(java_args.into());
        self
    }

    /// Argument text for a language family, falling back to the script
    /// spelling when no Java spelling was recorded
    pub fn args_for(&self, family: ArgsFamily) -> &str {
        match family {
            ArgsFamily::Script => &self.args,
            ArgsFamily::Java => self.java_args.as_deref().unwrap_or(&self.args),
        }
    }
}

/// Everything the grader needs to know about a problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemGradingContext {
    pub tests: Vec<TestCase>,
    #[serde(rename = "expectExact")]
    pub expect_exact: bool,
    #[serde(rename = "returnType")]
    pub return_type: String,
}

/// Canonicalized expected/actual pair for one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedTest {
    pub expected: String,
    pub actual: String,
}

/// Points awarded out of the number of tests, rendered as `"3/5"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub awarded: usize,
    pub total: usize,
}

impl Score {
    pub fn new(awarded: usize, total: usize) -> Self {
        debug_assert!(awarded <= total);
        Self { awarded, total }
    }

    pub fn is_perfect(&self) -> bool {
        self.awarded == self.total
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.awarded, self.total)
    }
}

impl FromStr for Score {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (awarded, total) = s
            .split_once('/')
            .ok_or_else(|| format!("Invalid score: {}", s))?;
        let awarded = awarded
            .trim()
            .parse()
            .map_err(|_| format!("Invalid score numerator: {}", s))?;
        let total = total
            .trim()
            .parse()
            .map_err(|_| format!("Invalid score denominator: {}", s))?;
        if awarded > total {
            return Err(format!("Score numerator exceeds denominator: {}", s));
        }
        Ok(Score { awarded, total })
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Success,
    /// The submission ran and wrote to stderr
    Bug,
    /// Internal failure; details are logged, never returned
    Failure,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseType::Success => write!(f, "success"),
            ResponseType::Bug => write!(f, "bug"),
            ResponseType::Failure => write!(f, "failure"),
        }
    }
}

/// Result of one "run and grade" request, serialized as the caller-facing response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingOutcome {
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default)]
    pub tests: Vec<GradedTest>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "requestInfo", default, skip_serializing_if = "Option::is_none")]
    pub request_info: Option<RequestInfo>,
}

impl GradingOutcome {
    pub fn success(score: Score, tests: Vec<GradedTest>, output: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Success,
            score: Some(score),
            tests,
            output,
            error: None,
            request_info: None,
        }
    }

    pub fn bug(output: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Bug,
            score: None,
            tests: Vec::new(),
            output,
            error: None,
            request_info: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Failure,
            score: None,
            tests: Vec::new(),
            output: Vec::new(),
            error: Some(message.into()),
            request_info: None,
        }
    }

    pub fn with_request_info(mut self, info: RequestInfo) -> Self {
        self.request_info = Some(info);
        self
    }
}

/// A language runtime offered by the execution service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    pub language: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimesResponse {
    pub response_type: ResponseType,
    #[serde(default)]
    pub body: Vec<Runtime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "requestInfo", default, skip_serializing_if = "Option::is_none")]
    pub request_info: Option<RequestInfo>,
}

impl RuntimesResponse {
    pub fn success(body: Vec<Runtime>) -> Self {
        Self {
            response_type: ResponseType::Success,
            body,
            error: None,
            request_info: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Failure,
            body: Vec::new(),
            error: Some(message.into()),
            request_info: None,
        }
    }

    pub fn with_request_info(mut self, info: RequestInfo) -> Self {
        self.request_info = Some(info);
        self
    }
}

/// Correlation data attached to every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl RequestInfo {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for RequestInfo {
    fn default() -> Self {
        Self::new()
    }
}
