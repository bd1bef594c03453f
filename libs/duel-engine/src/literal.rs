/// Lenient Value Literals
///
/// Each language prints return values its own way: Python writes
/// `{'a': '1'}` and `True`, Java writes `{a=1}` and `[x, y]` with bare
/// strings, JavaScript goes through `JSON.stringify`. This module reads all of
/// them into `serde_json::Value` so the grader compares one representation.
///
/// Accepted forms:
/// - `[a, b]` sequences and `{a, b}` set literals (both become arrays)
/// - `{k: v}` and `{k=v}` maps (keys become strings)
/// - `"..."` and `'...'` strings with backslash escapes
/// - numbers, `true`/`false`/`null` in any case, `None`, `undefined`
/// - any other run of characters up to a delimiter, as a trimmed bare string
use crate::error::EngineError;
use crate::type_grammar::{ScalarKind, TypeShape};
use crate::Result;
use serde_json::{Map, Number, Value};

/// Parse one literal; the whole input must be consumed
pub fn parse(text: &str) -> Result<Value> {
    let mut reader = Reader {
        source: text,
        chars: text.chars().collect(),
        pos: 0,
    };
    let value = reader.parse_value()?;
    reader.skip_whitespace();
    if let Some(c) = reader.peek() {
        return Err(reader.error(format!("trailing '{}' at position {}", c, reader.pos)));
    }
    Ok(value)
}

/// Parse a literal and coerce it to a type shape
pub fn parse_as(text: &str, shape: &TypeShape) -> Result<Value> {
    let value = parse(text)?;
    coerce(value, shape).map_err(|reason| EngineError::parse(text, reason))
}

struct Reader<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Reader<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> EngineError {
        EngineError::parse(self.source, reason)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => self.parse_sequence(),
            Some('{') => self.parse_braced(),
            Some(quote @ ('"' | '\'')) => self.parse_string(quote).map(Value::String),
            Some(c @ (']' | '}' | ',' | ':' | '=')) => {
                Err(self.error(format!("unexpected '{}' at position {}", c, self.pos)))
            }
            Some(_) => Ok(self.parse_atom()),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_sequence(&mut self) -> Result<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some(c) => return Err(self.error(format!("expected ',' or ']', found '{}'", c))),
                None => return Err(self.error("unterminated '['")),
            }
        }
    }

    /// `{}` is an empty map; `{k: v}`/`{k=v}` a map; `{a, b}` a set literal
    fn parse_braced(&mut self) -> Result<Value> {
        self.expect('{')?;
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value()?;
        self.skip_whitespace();
        if matches!(self.peek(), Some(':' | '=')) {
            self.parse_map_entries(first)
        } else {
            self.parse_set_items(first)
        }
    }

    fn parse_map_entries(&mut self, first_key: Value) -> Result<Value> {
        let mut map = Map::new();
        let mut key = first_key;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(':' | '=') => self.pos += 1,
                _ => return Err(self.error("expected ':' or '=' after map key")),
            }
            let value = self.parse_value()?;
            map.insert(key_text(key), value);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    key = self.parse_value()?;
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated '{'")),
            }
        }
    }

    fn parse_set_items(&mut self, first: Value) -> Result<Value> {
        let mut items = vec![first];
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    items.push(self.parse_value()?);
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated '{'")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_atom(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | ']' | '}' | ':' | '=' | '[' | '{') {
                break;
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        atom_value(raw.trim())
    }
}

fn atom_value(atom: &str) -> Value {
    match atom.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "none" | "undefined" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = atom.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = atom.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(atom.to_string())
}

fn key_text(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Scalar text as a program would print it
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

/// Reshape a parsed value to match a declared type.
///
/// Numbers printed as text and text printed bare are normalized here, e.g.
/// Java's `{a=1}` under `Map<String, String>` yields `{"a": "1"}`.
pub fn coerce(value: Value, shape: &TypeShape) -> std::result::Result<Value, String> {
    match shape {
        TypeShape::Scalar(kind) => coerce_scalar(value, *kind),
        TypeShape::ListOf(element) | TypeShape::SetOf(element) => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| coerce(item, element))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(format!("expected a sequence for {}, found {}", shape, other)),
        },
        TypeShape::MapOf(key_shape, value_shape) => match value {
            Value::Object(entries) => {
                let mut out = Map::new();
                for (key, entry) in entries {
                    let key = coerce(Value::String(key), key_shape).map(key_text)?;
                    out.insert(key, coerce(entry, value_shape)?);
                }
                Ok(Value::Object(out))
            }
            other => Err(format!("expected a map for {}, found {}", shape, other)),
        },
        TypeShape::Named(_) => Ok(value),
    }
}

fn coerce_scalar(value: Value, kind: ScalarKind) -> std::result::Result<Value, String> {
    match kind {
        ScalarKind::Text | ScalarKind::Character => scalar_text(&value)
            .map(Value::String)
            .ok_or_else(|| format!("expected {}, found {}", kind, value)),
        ScalarKind::Integer | ScalarKind::Long | ScalarKind::Short | ScalarKind::Byte => {
            let integer = match &value {
                Value::Number(n) => n.as_i64().or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                }),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            integer
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| format!("expected {}, found {}", kind, value))
        }
        ScalarKind::Double | ScalarKind::Float => {
            let float = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            float
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected {}, found {}", kind, value))
        }
        ScalarKind::Boolean => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(format!("expected {}, found {}", kind, value)),
        },
    }
}

/// Compact canonical text of a value
pub fn render(value: &Value) -> String {
    value.to_string()
}
