/// Grading Comparator - Type-Aware Scoring Logic
///
/// **Core Responsibility:**
/// Compare the values a harness printed against each test's expected value
/// and award one point per match.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP or the execution service
/// - Knows nothing about language templates
/// - Pure function: (marker line, test cases, return type, exactness) → score
///
/// **Strategies (picked from the resolved return type):**
/// - `expectExact`: textual equality after dropping whitespace (kept for
///   `String`); `Double` actuals are first rounded half-up to 6 places
/// - List: the same elements with the same multiplicities, in any order
/// - Set: both sides read as sequences and deduplicated; the same number of
///   distinct elements wins the point
/// - Anything else: deep structural equality of the parsed values
///
/// A result count that differs from the test count, or any value that cannot
/// be parsed, fails the whole evaluation. Partial scores are never produced
/// from a broken run.
use crate::demux::split_results;
use crate::error::EngineError;
use crate::literal;
use crate::type_grammar::{self, ScalarKind, TypeShape};
use crate::Result;
use duel_common::types::{GradedTest, Score, TestCase};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Decimal places kept when rounding double results
pub const DOUBLE_PLACES: usize = 6;

/// Score plus the canonical expected/actual text of every test, in test order
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: Score,
    pub tests: Vec<GradedTest>,
}

#[derive(Debug, Clone, PartialEq)]
enum Strategy {
    Exact {
        whitespace_significant: bool,
        round_double: bool,
    },
    List(TypeShape),
    Set(TypeShape),
    Structural(TypeShape),
}

fn pick_strategy(shape: TypeShape, expect_exact: bool) -> Strategy {
    if expect_exact {
        return Strategy::Exact {
            whitespace_significant: shape == TypeShape::Scalar(ScalarKind::Text),
            round_double: matches!(
                shape,
                TypeShape::Scalar(ScalarKind::Double) | TypeShape::Scalar(ScalarKind::Float)
            ),
        };
    }
    match shape {
        TypeShape::ListOf(_) => Strategy::List(shape),
        TypeShape::SetOf(element) => Strategy::Set(TypeShape::ListOf(element)),
        other => Strategy::Structural(other),
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Round a printed number half-up (away from zero) to `places` decimals.
///
/// Integral values render with a single `.0` (`-40` → `-40.0`); otherwise
/// trailing zeros are dropped (`98.60000000000001` → `98.6`).
pub fn round_half_up(text: &str, places: usize) -> Result<String> {
    let number: f64 = text
        .trim()
        .parse()
        .map_err(|_| EngineError::parse(text, "not a number"))?;
    if !number.is_finite() {
        return Err(EngineError::parse(text, "not a finite number"));
    }
    if number == number.floor() {
        return Ok(format!("{:.1}", number));
    }

    // Display for f64 is the shortest round-trip form and never uses exponents
    let repr = number.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(places))
        .map(|b| b - b'0')
        .collect();
    let mut int_len = int_part.len();

    if frac_part.as_bytes().get(places).is_some_and(|&next| next >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                int_len += 1;
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let render = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let int_text = render(&digits[..int_len]);
    let frac_text = render(&digits[int_len..]);
    let frac_text = frac_text.trim_end_matches('0');

    let magnitude = if frac_text.is_empty() {
        int_text
    } else {
        format!("{}.{}", int_text, frac_text)
    };
    let is_zero = digits.iter().all(|&d| d == 0);

    Ok(if number < 0.0 && !is_zero {
        format!("-{}", magnitude)
    } else {
        magnitude
    })
}

/// Read a value under a shape. Text scalars are taken verbatim so commas and
/// quotes inside them survive.
fn read_value(text: &str, shape: &TypeShape) -> Result<Value> {
    match shape {
        TypeShape::Scalar(ScalarKind::Text) | TypeShape::Scalar(ScalarKind::Character) => {
            Ok(Value::String(text.trim().to_string()))
        }
        _ => literal::parse_as(text, shape),
    }
}

/// Canonical element texts in sorted order, duplicates kept
fn sorted_elements(items: &[Value]) -> Vec<String> {
    let mut rendered: Vec<String> = items.iter().map(literal::render).collect();
    rendered.sort();
    rendered
}

/// Canonical element texts with duplicates removed
fn distinct_elements(items: &[Value]) -> BTreeSet<String> {
    items.iter().map(literal::render).collect()
}

fn as_items<'a>(value: &'a Value, text: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| EngineError::parse(text, "expected a sequence"))
}

/// Turn `{a, b}` or `[a, b]` into `[a, b]`
fn as_sequence_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some('{' | '['), Some('}' | ']')) => {
            Ok(format!("[{}]", &trimmed[1..trimmed.len() - 1]))
        }
        _ => Err(EngineError::parse(text, "expected a list or set literal")),
    }
}

/// Compare one test. Returns whether the point is awarded and the
/// canonical texts to report.
fn evaluate_test(expected: &str, actual: &str, strategy: &Strategy) -> Result<(bool, GradedTest)> {
    let (passed, expected, actual) = match strategy {
        Strategy::Exact {
            whitespace_significant,
            round_double,
        } => {
            let (expected, mut actual) = if *whitespace_significant {
                (expected.to_string(), actual.to_string())
            } else {
                (strip_whitespace(expected), strip_whitespace(actual))
            };
            if *round_double {
                actual = round_half_up(&actual, DOUBLE_PLACES)?;
            }
            (expected == actual, expected, actual)
        }
        Strategy::List(shape) => {
            let expected_value = read_value(expected, shape)?;
            let actual_value = read_value(actual, shape)?;
            let expected_items = as_items(&expected_value, expected)?;
            let actual_items = as_items(&actual_value, actual)?;

            let passed = expected_items.len() == actual_items.len()
                && sorted_elements(expected_items) == sorted_elements(actual_items);
            (
                passed,
                literal::render(&expected_value),
                literal::render(&actual_value),
            )
        }
        Strategy::Set(sequence_shape) => {
            let expected_value = read_value(&as_sequence_text(expected)?, sequence_shape)?;
            let actual_value = read_value(&as_sequence_text(actual)?, sequence_shape)?;
            let expected_items = distinct_elements(as_items(&expected_value, expected)?);
            let actual_items = distinct_elements(as_items(&actual_value, actual)?);
            (
                expected_items.len() == actual_items.len(),
                set_text(&expected_items),
                set_text(&actual_items),
            )
        }
        Strategy::Structural(shape) => {
            let expected_value = read_value(expected, shape)?;
            let actual_value = read_value(actual, shape)?;
            (
                expected_value == actual_value,
                literal::render(&expected_value),
                literal::render(&actual_value),
            )
        }
    };

    // a passing test reports the same text on both sides
    let expected = if passed && !matches!(strategy, Strategy::Exact { .. }) {
        actual.clone()
    } else {
        expected
    };

    Ok((passed, GradedTest { expected, actual }))
}

fn set_text(items: &BTreeSet<String>) -> String {
    let inner: Vec<&str> = items.iter().map(String::as_str).collect();
    format!("{{{}}}", inner.join(","))
}

/// Aggregate per-test verdicts into the final evaluation
pub fn aggregate_results(verdicts: Vec<(bool, GradedTest)>) -> Evaluation {
    let total = verdicts.len();
    let awarded = verdicts.iter().filter(|(passed, _)| *passed).count();
    Evaluation {
        score: Score::new(awarded, total),
        tests: verdicts.into_iter().map(|(_, graded)| graded).collect(),
    }
}

/// Grade a marker line against a problem's tests.
///
/// ## Arguments
/// * `storage_line` - The marker line from the program's output
/// * `tests` - Test cases, in the order the harness called them
/// * `return_type` - The problem's declared return type
/// * `expect_exact` - Whether textual equality is required
/// * `language` - Submission language, for diagnostics
pub fn evaluate(
    storage_line: &str,
    tests: &[TestCase],
    return_type: &str,
    expect_exact: bool,
    language: &str,
) -> Result<Evaluation> {
    let mut segments = split_results(storage_line);
    if tests.is_empty() && segments == [""] {
        segments.clear();
    }
    if segments.len() != tests.len() {
        return Err(EngineError::Desync {
            expected: tests.len(),
            actual: segments.len(),
        });
    }

    let shape = type_grammar::resolve(return_type)?;
    let strategy = pick_strategy(shape, expect_exact);
    debug!(language, return_type, ?strategy, "Evaluating results");

    let mut verdicts = Vec::with_capacity(tests.len());
    for (idx, (test, actual)) in tests.iter().zip(segments).enumerate() {
        let verdict = evaluate_test(&test.expected, actual, &strategy)?;
        debug!(
            test_num = idx + 1,
            passed = verdict.0,
            expected = %verdict.1.expected,
            actual = %verdict.1.actual,
            "Test evaluated"
        );
        verdicts.push(verdict);
    }

    let evaluation = aggregate_results(verdicts);
    info!(language, score = %evaluation.score, "Evaluation complete");
    Ok(evaluation)
}
