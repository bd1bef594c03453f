/// End-to-end tests for the grading pipeline
///
/// A scripted runner stands in for the execution service and answers with
/// canned program output, so these tests cover harness construction,
/// demultiplexing and grading together without network access. The live
/// test at the bottom talks to the public execution service.

#[cfg(test)]
mod grading_pipeline_tests {
    use crate::config::LanguageConfigManager;
    use crate::engine::{GradingEngine, INTERNAL_ERROR_MESSAGE};
    use crate::error::EngineError;
    use crate::executor::{CodeRunner, ExecuteRequest, ExecutionClient, ExecutionResult, StageOutput};
    use crate::Result;
    use async_trait::async_trait;
    use duel_common::types::{
        ProblemGradingContext, ResponseType, Runtime, Score, Submission, TestCase,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    /// Runner that replays one canned result and records what it was sent
    #[derive(Default)]
    struct ScriptedRunner {
        result: Option<ExecutionResult>,
        runtimes: Option<Vec<Runtime>>,
        requests: Mutex<Vec<ExecuteRequest>>,
    }

    impl ScriptedRunner {
        fn printing(output: &str) -> Self {
            Self::replying(ExecutionResult {
                run: Some(StageOutput {
                    stdout: output.to_string(),
                    output: output.to_string(),
                    code: Some(0),
                    ..Default::default()
                }),
                ..Default::default()
            })
        }

        fn replying(result: ExecutionResult) -> Self {
            Self {
                result: Some(result),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CodeRunner for ScriptedRunner {
        async fn runtimes(&self) -> Result<Vec<Runtime>> {
            self.runtimes
                .clone()
                .ok_or_else(|| EngineError::Dispatch("service unavailable".to_string()))
        }

        async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionResult> {
            self.requests.lock().unwrap().push(request.clone());
            self.result
                .clone()
                .ok_or_else(|| EngineError::Dispatch("service unavailable".to_string()))
        }
    }

    fn engine(runner: ScriptedRunner) -> GradingEngine<ScriptedRunner> {
        GradingEngine::new(LanguageConfigManager::builtin().unwrap(), runner)
    }

    fn greet_context() -> ProblemGradingContext {
        ProblemGradingContext {
            tests: ["Henry", "Mary", "Harry"]
                .iter()
                .map(|name| TestCase::new(format!("\"{}\"", name), format!("Hello {}", name)))
                .collect(),
            expect_exact: true,
            return_type: "String".to_string(),
        }
    }

    fn submission(language: &str, code: &str) -> Submission {
        Submission {
            name: "greet".to_string(),
            language: language.to_string(),
            version: "*".to_string(),
            code: code.to_string(),
        }
    }

    const GREET_OUTPUT: &str = "STORAGE=Hello Henry==SEP==Hello Mary==SEP==Hello Harry\n";

    #[tokio::test]
    async fn test_greet_scores_full_marks_in_every_language() {
        let sources = [
            ("python", "def greet(name):\n    return \"Hello \" + name"),
            ("javascript", "function greet(name) { return \"Hello \" + name; }"),
            (
                "java",
                "public class Main {\n  public static String greet(String name) { return \"Hello \" + name; }\n}",
            ),
        ];

        for (language, code) in sources {
            let engine = engine(ScriptedRunner::printing(GREET_OUTPUT));
            let outcome = engine
                .run_and_grade(&submission(language, code), Some(&greet_context()))
                .await;

            assert_eq!(outcome.response_type, ResponseType::Success, "{}", language);
            assert_eq!(outcome.score, Some(Score::new(3, 3)));
            assert_eq!(outcome.tests.len(), 3);
            for test in &outcome.tests {
                assert_eq!(test.expected, test.actual);
            }
            assert!(outcome.output.is_empty());
        }
    }

    #[tokio::test]
    async fn test_dispatched_request_carries_harness() {
        let engine = engine(ScriptedRunner::printing(GREET_OUTPUT));
        let code = "public class Main {\n  public static String greet(String n) { return n; }\n}";
        engine
            .run_and_grade(&submission("java", code), Some(&greet_context()))
            .await;

        let requests = engine.runner().requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.language, "java");
        assert_eq!(request.version, "*");
        assert_eq!(request.files[0].name, "devduel.java");
        assert!(request.files[0].content.contains("String.valueOf(greet(\"Mary\"))"));
        assert!(request.files[0].content.contains("public static void main"));
    }

    #[tokio::test]
    async fn test_user_prints_are_returned_in_order() {
        let engine = engine(ScriptedRunner::printing(&format!(
            "checking Henry\nchecking Mary\n{}",
            GREET_OUTPUT
        )));
        let outcome = engine
            .run_and_grade(&submission("python", "def greet(n): ..."), Some(&greet_context()))
            .await;

        assert_eq!(outcome.response_type, ResponseType::Success);
        assert_eq!(outcome.output, vec!["checking Henry", "checking Mary"]);
    }

    #[tokio::test]
    async fn test_partial_credit() {
        let engine = engine(ScriptedRunner::printing(
            "STORAGE=Hello Henry==SEP==Hi Mary==SEP==Hello Harry",
        ));
        let outcome = engine
            .run_and_grade(&submission("python", "def greet(n): ..."), Some(&greet_context()))
            .await;

        assert_eq!(outcome.score, Some(Score::new(2, 3)));
        assert_eq!(outcome.tests[1].expected, "Hello Mary");
        assert_eq!(outcome.tests[1].actual, "Hi Mary");
    }

    #[tokio::test]
    async fn test_stderr_reports_bug_without_score() {
        let traceback = "Traceback (most recent call last):\nNameError: name 'x' is not defined\n";
        let engine = engine(ScriptedRunner::replying(ExecutionResult {
            run: Some(StageOutput {
                stderr: traceback.to_string(),
                output: format!("before crash\n{}", traceback),
                code: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        }));
        let outcome = engine
            .run_and_grade(&submission("python", "def greet(n): x"), Some(&greet_context()))
            .await;

        assert_eq!(outcome.response_type, ResponseType::Bug);
        assert_eq!(outcome.score, None);
        assert!(outcome.tests.is_empty());
        assert_eq!(outcome.output[0], "before crash");
        assert_eq!(outcome.output.len(), 3);
    }

    #[tokio::test]
    async fn test_whitespace_only_stderr_is_still_a_bug() {
        let engine = engine(ScriptedRunner::replying(ExecutionResult {
            run: Some(StageOutput {
                stdout: GREET_OUTPUT.to_string(),
                stderr: "\n".to_string(),
                output: GREET_OUTPUT.to_string(),
                code: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        }));
        let outcome = engine
            .run_and_grade(&submission("python", "def greet(n): ..."), Some(&greet_context()))
            .await;

        assert_eq!(outcome.response_type, ResponseType::Bug);
        assert_eq!(outcome.score, None);
        assert!(!outcome.output.is_empty());
    }

    #[tokio::test]
    async fn test_service_message_fails_even_with_clean_run() {
        let engine = engine(ScriptedRunner::replying(ExecutionResult {
            message: Some("python-3.10.0 runtime is unknown".to_string()),
            run: Some(StageOutput {
                stdout: GREET_OUTPUT.to_string(),
                output: GREET_OUTPUT.to_string(),
                code: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        }));
        let outcome = engine
            .run_and_grade(&submission("python", "def greet(n): ..."), Some(&greet_context()))
            .await;

        assert_eq!(outcome.response_type, ResponseType::Failure);
        assert_eq!(outcome.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
        assert_eq!(outcome.score, None);
    }

    #[tokio::test]
    async fn test_compile_failure_reports_bug() {
        let engine = engine(ScriptedRunner::replying(ExecutionResult {
            compile: Some(StageOutput {
                stderr: "devduel.java:2: error: ';' expected\n".to_string(),
                output: "devduel.java:2: error: ';' expected\n".to_string(),
                code: Some(1),
                ..Default::default()
            }),
            run: None,
            ..Default::default()
        }));
        let code = "public class Main {\n  public static String greet(String n) { return n }\n}";
        let outcome = engine
            .run_and_grade(&submission("java", code), Some(&greet_context()))
            .await;

        assert_eq!(outcome.response_type, ResponseType::Bug);
        assert_eq!(outcome.output, vec!["devduel.java:2: error: ';' expected"]);
    }

    #[tokio::test]
    async fn test_malformed_class_source_is_a_bug_and_never_dispatched() {
        let engine = engine(ScriptedRunner::printing(GREET_OUTPUT));
        let outcome = engine
            .run_and_grade(
                &submission("java", "public class Main { // missing brace"),
                Some(&greet_context()),
            )
            .await;

        assert_eq!(outcome.response_type, ResponseType::Bug);
        assert_eq!(outcome.output.len(), 1);
        assert!(engine.runner().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_internal_failures_hide_their_cause() {
        let context = greet_context();
        let cases: Vec<(ScriptedRunner, &str, Option<&ProblemGradingContext>)> = vec![
            // no stored context
            (ScriptedRunner::printing(GREET_OUTPUT), "python", None),
            // marker never printed
            (ScriptedRunner::printing("Hello Henry\n"), "python", Some(&context)),
            // fewer results than tests
            (
                ScriptedRunner::printing("STORAGE=Hello Henry==SEP==Hello Mary"),
                "python",
                Some(&context),
            ),
            // execution service down
            (ScriptedRunner::default(), "python", Some(&context)),
            // no template for the language
            (ScriptedRunner::printing(GREET_OUTPUT), "cobol", Some(&context)),
        ];

        for (runner, language, context) in cases {
            let outcome = engine(runner)
                .run_and_grade(&submission(language, "code"), context)
                .await;
            assert_eq!(outcome.response_type, ResponseType::Failure);
            assert_eq!(outcome.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
            assert_eq!(outcome.score, None);
        }
    }

    #[tokio::test]
    async fn test_set_problem_end_to_end() {
        let context = ProblemGradingContext {
            tests: vec![
                TestCase::new("[1,2,2,3,4,5]", "{1, 2, 3, 4, 5}")
                    .with_java_args("java.util.List.of(1,2,2,3,4,5)"),
                TestCase::new("[5,5]", "{5}"),
            ],
            expect_exact: false,
            return_type: "Set<Integer>".to_string(),
        };
        let engine = engine(ScriptedRunner::printing(
            "STORAGE=[5, 4, 3, 2, 1]==SEP==[5]",
        ));
        let mut sub = submission("javascript", "function dedupe(xs) { return new Set(xs); }");
        sub.name = "dedupe".to_string();
        let outcome = engine.run_and_grade(&sub, Some(&context)).await;

        assert_eq!(outcome.response_type, ResponseType::Success);
        assert_eq!(outcome.score, Some(Score::new(2, 2)));
        assert_eq!(outcome.tests[0].actual, "{1,2,3,4,5}");
    }

    #[tokio::test]
    async fn test_runtimes_filtered_to_configured_languages() {
        let runner = ScriptedRunner {
            runtimes: Some(vec![
                Runtime { language: "python".to_string(), version: "3.10.0".to_string() },
                Runtime { language: "rust".to_string(), version: "1.68.2".to_string() },
                Runtime { language: "java".to_string(), version: "15.0.2".to_string() },
            ]),
            ..Default::default()
        };
        let response = engine(runner).list_runtimes().await;

        assert_eq!(response.response_type, ResponseType::Success);
        let languages: Vec<_> = response.body.iter().map(|r| r.language.as_str()).collect();
        assert_eq!(languages, vec!["python", "java"]);
    }

    #[tokio::test]
    async fn test_runtimes_failure() {
        let response = engine(ScriptedRunner::default()).list_runtimes().await;
        assert_eq!(response.response_type, ResponseType::Failure);
        assert_eq!(response.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
        assert!(response.body.is_empty());
    }

    /// Test: Real round trip through the public execution service
    #[tokio::test]
    #[ignore] // Requires network access to the execution service
    async fn test_live_python_greet() {
        let client = ExecutionClient::new(
            duel_common::config::DEFAULT_EXECUTION_API_URL,
            Duration::from_secs(30),
        )
        .expect("Failed to build execution client");
        let engine = GradingEngine::new(LanguageConfigManager::builtin().unwrap(), client);

        let outcome = engine
            .run_and_grade(
                &Submission {
                    name: "greet".to_string(),
                    language: "python".to_string(),
                    version: "3.10.0".to_string(),
                    code: "def greet(name):\n    return \"Hello \" + name".to_string(),
                },
                Some(&greet_context()),
            )
            .await;

        assert_eq!(outcome.response_type, ResponseType::Success);
        assert_eq!(outcome.score, Some(Score::new(3, 3)));
    }
}
