/// Harness Compiler
///
/// Turns a submission into the exact source text sent to the execution
/// service: the user's code plus one call per test case, each result pushed
/// into an accumulator that is printed last behind the result marker.
///
/// **Splicing rules:**
/// - Script languages: the generated block follows the source after a blank line
/// - Class-based languages: the block is wrapped in the language's main method
///   and inserted just before the final `}` of the trimmed source
///
/// Splicing is textual. A brace inside a trailing comment or string is not
/// told apart from a structural one; user syntax is never validated here.
use crate::config::{LanguageConfig, LanguageConfigManager, TEST_CODE_PLACEHOLDER, VALUE_PLACEHOLDER};
use crate::error::EngineError;
use crate::Result;
use duel_common::types::TestCase;
use tracing::debug;

/// Source text ready to submit, with the file name the service should use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSource {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct HarnessCompiler {
    languages: LanguageConfigManager,
}

impl HarnessCompiler {
    pub fn new(languages: LanguageConfigManager) -> Self {
        Self { languages }
    }

    pub fn languages(&self) -> &LanguageConfigManager {
        &self.languages
    }

    /// Build the harness for one submission.
    ///
    /// Fails with `Configuration` when the language has no template and with
    /// `MalformedSubmission` when a class-based source does not end in `}`.
    pub fn compile(
        &self,
        language: &str,
        problem_name: &str,
        source_code: &str,
        tests: &[TestCase],
    ) -> Result<HarnessSource> {
        let config = self.languages.get_config(language)?;
        let test_block = test_block(config, problem_name, tests);

        let content = if config.class_based {
            splice_into_class(config, source_code, &test_block)?
        } else {
            format!("{}\n\n{}", source_code, test_block)
        };

        debug!(
            language = %config.name,
            problem = problem_name,
            tests = tests.len(),
            harness_bytes = content.len(),
            "Harness compiled"
        );

        Ok(HarnessSource {
            file_name: config.file_name(),
            content,
        })
    }
}

/// Accumulator setup, one append line per test in order, then the print trailer
fn test_block(config: &LanguageConfig, problem_name: &str, tests: &[TestCase]) -> String {
    let templates = &config.harness;
    let mut block = String::new();

    block.push_str(&templates.init);
    block.push('\n');
    for test in tests {
        let call = format!("{}({})", problem_name, test.args_for(config.args_family));
        block.push_str(&templates.append.replace(VALUE_PLACEHOLDER, &call));
        block.push('\n');
    }
    block.push_str(&templates.print);
    block.push('\n');

    block
}

fn splice_into_class(config: &LanguageConfig, source_code: &str, test_block: &str) -> Result<String> {
    let trimmed = source_code.trim();
    let body = trimmed.strip_suffix('}').ok_or_else(|| {
        EngineError::MalformedSubmission(format!(
            "{} source must end with the closing brace of its class",
            config.name
        ))
    })?;

    // validated on load for class-based languages
    let main_method = config.harness.main_method.as_deref().unwrap_or_default();
    Ok(format!(
        "{}{}}}",
        body,
        main_method.replace(TEST_CODE_PLACEHOLDER, test_block)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> HarnessCompiler {
        HarnessCompiler::new(LanguageConfigManager::builtin().unwrap())
    }

    fn greet_tests() -> Vec<TestCase> {
        ["Henry", "Mary", "Harry"]
            .iter()
            .map(|name| TestCase::new(format!("\"{}\"", name), format!("Hello {}", name)))
            .collect()
    }

    #[test]
    fn test_python_block_appended_after_blank_line() {
        let source = "def greet(name):\n    return \"Hello \" + name";
        let harness = compiler()
            .compile("python", "greet", source, &greet_tests())
            .unwrap();

        assert_eq!(harness.file_name, "devduel.py");
        assert!(harness.content.starts_with(&format!("{}\n\n__duel_results = []\n", source)));
        assert!(harness
            .content
            .ends_with("print(\"STORAGE=\" + \"==SEP==\".join(__duel_results))\n"));
    }

    #[test]
    fn test_calls_emitted_in_test_order_without_dedup() {
        let mut tests = greet_tests();
        tests.push(tests[0].clone());
        let harness = compiler()
            .compile("javascript", "greet", "function greet(n) { return n; }", &tests)
            .unwrap();

        let calls: Vec<&str> = harness
            .content
            .lines()
            .filter(|line| line.starts_with("__duelResults.push"))
            .collect();
        assert_eq!(
            calls,
            vec![
                "__duelResults.push(__duelFormat(greet(\"Henry\")));",
                "__duelResults.push(__duelFormat(greet(\"Mary\")));",
                "__duelResults.push(__duelFormat(greet(\"Harry\")));",
                "__duelResults.push(__duelFormat(greet(\"Henry\")));",
            ]
        );
    }

    #[test]
    fn test_java_main_spliced_before_final_brace() {
        let source = "public class Solution {\n  public static int sum(java.util.List<Integer> xs) { return 0; }\n}\n\n";
        let tests = vec![TestCase::new("[1, 2]", "3").with_java_args("List.of(1, 2)")];
        let harness = compiler().compile("java", "sum", source, &tests).unwrap();

        assert_eq!(harness.file_name, "devduel.java");
        assert!(harness.content.contains("public static void main(String[] args) {"));
        assert!(harness
            .content
            .contains("__duelResults.add(String.valueOf(sum(List.of(1, 2))));"));
        assert!(!harness.content.contains("sum([1, 2])"));

        let main_at = harness.content.find("public static void main").unwrap();
        let method_at = harness.content.find("public static int sum").unwrap();
        assert!(method_at < main_at);
        assert!(harness.content.ends_with("  }\n}"));
    }

    #[test]
    fn test_java_without_closing_brace_is_malformed() {
        let result = compiler().compile("java", "greet", "public class Solution {", &greet_tests());
        assert!(matches!(result, Err(EngineError::MalformedSubmission(_))));
    }

    #[test]
    fn test_unknown_language() {
        let result = compiler().compile("brainfuck", "greet", "+", &greet_tests());
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_zero_tests_still_prints_marker() {
        let harness = compiler().compile("python", "noop", "def noop(): pass", &[]).unwrap();
        assert!(harness.content.contains("__duel_results = []\nprint("));
    }
}
