/// Return-Type Grammar
///
/// Problems declare their return type as text such as `List<Integer>`,
/// `Set<String>` or `Map<String, String>`. The grader only needs the shape
/// of that type to pick a comparison strategy, so this module turns the text
/// into a closed [`TypeShape`] and never builds values from it.
///
/// **Grammar:**
/// ```text
/// type := identifier ( '<' type ( ',' type )* '>' )?
/// ```
/// Whitespace is ignored. Identifiers match case-insensitively against a
/// fixed alias table; anything else well-formed becomes [`TypeShape::Named`].
use crate::error::EngineError;
use crate::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Character,
    Integer,
    Long,
    Short,
    Byte,
    Double,
    Float,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Scalar(ScalarKind),
    ListOf(Box<TypeShape>),
    SetOf(Box<TypeShape>),
    MapOf(Box<TypeShape>, Box<TypeShape>),
    /// A type the alias table does not know; compared structurally
    Named(String),
}

/// Element type assumed for raw collections (`List` without arguments)
const RAW_ELEMENT: &str = "Object";

enum Constructor {
    Scalar(ScalarKind),
    List,
    Set,
    Map,
}

fn lookup(identifier: &str) -> Option<Constructor> {
    let constructor = match identifier.to_ascii_lowercase().as_str() {
        "list" | "arraylist" | "linkedlist" => Constructor::List,
        "set" | "hashset" | "treeset" => Constructor::Set,
        "map" | "hashmap" | "treemap" => Constructor::Map,
        "string" | "str" => Constructor::Scalar(ScalarKind::Text),
        "character" | "char" => Constructor::Scalar(ScalarKind::Character),
        "integer" | "int" => Constructor::Scalar(ScalarKind::Integer),
        "long" => Constructor::Scalar(ScalarKind::Long),
        "short" => Constructor::Scalar(ScalarKind::Short),
        "byte" => Constructor::Scalar(ScalarKind::Byte),
        "double" => Constructor::Scalar(ScalarKind::Double),
        "float" => Constructor::Scalar(ScalarKind::Float),
        "boolean" | "bool" => Constructor::Scalar(ScalarKind::Boolean),
        _ => return None,
    };
    Some(constructor)
}

/// Resolve a type string into its shape
pub fn resolve(type_string: &str) -> Result<TypeShape> {
    let compact: Vec<char> = type_string.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(EngineError::resolution(type_string, "empty type"));
    }

    let mut parser = Parser {
        source: type_string,
        chars: compact,
        pos: 0,
    };
    let shape = parser.parse_type()?;

    if let Some(c) = parser.peek() {
        let reason = if c == '>' {
            "unbalanced brackets: unexpected '>'".to_string()
        } else {
            format!("unexpected '{}' after type", c)
        };
        return Err(EngineError::resolution(type_string, reason));
    }

    Ok(shape)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> EngineError {
        EngineError::resolution(self.source, reason)
    }

    fn parse_type(&mut self) -> Result<TypeShape> {
        let identifier = self.parse_identifier()?;

        let mut args = Vec::new();
        if self.peek() == Some('<') {
            self.pos += 1;
            loop {
                args.push(self.parse_type()?);
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some('>') => {
                        self.pos += 1;
                        break;
                    }
                    None => return Err(self.error("unbalanced brackets: missing '>'")),
                    Some(c) => {
                        return Err(self.error(format!("unexpected '{}' in type arguments", c)))
                    }
                }
            }
        }

        self.build(identifier, args)
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' {
                self.pos += 1;
            } else {
                break;
            }
        }

        let identifier: String = self.chars[start..self.pos].iter().collect();
        match identifier.chars().next() {
            None => Err(match self.peek() {
                Some(c) => self.error(format!("expected identifier, found '{}'", c)),
                None => self.error("expected identifier"),
            }),
            Some(first) if !(first.is_alphabetic() || first == '_') => {
                Err(self.error(format!("unresolvable identifier '{}'", identifier)))
            }
            Some(_) => Ok(identifier),
        }
    }

    fn build(&self, identifier: String, mut args: Vec<TypeShape>) -> Result<TypeShape> {
        let raw = || Box::new(TypeShape::Named(RAW_ELEMENT.to_string()));

        match lookup(&identifier) {
            Some(Constructor::Scalar(kind)) => {
                if !args.is_empty() {
                    return Err(self.error(format!("'{}' takes no type arguments", identifier)));
                }
                Ok(TypeShape::Scalar(kind))
            }
            Some(Constructor::List) | Some(Constructor::Set) => {
                let element = match args.len() {
                    0 => raw(),
                    1 => Box::new(args.remove(0)),
                    n => {
                        return Err(self.error(format!(
                            "'{}' takes 1 type argument, found {}",
                            identifier, n
                        )))
                    }
                };
                if matches!(lookup(&identifier), Some(Constructor::List)) {
                    Ok(TypeShape::ListOf(element))
                } else {
                    Ok(TypeShape::SetOf(element))
                }
            }
            Some(Constructor::Map) => match args.len() {
                0 => Ok(TypeShape::MapOf(raw(), raw())),
                2 => {
                    let value = args.remove(1);
                    let key = args.remove(0);
                    Ok(TypeShape::MapOf(Box::new(key), Box::new(value)))
                }
                n => Err(self.error(format!(
                    "'{}' takes 2 type arguments, found {}",
                    identifier, n
                ))),
            },
            // Arguments of an unknown generic were still checked for syntax;
            // only the outer name matters for comparison.
            None => Ok(TypeShape::Named(identifier)),
        }
    }
}

impl TypeShape {
    pub fn is_list(&self) -> bool {
        matches!(self, TypeShape::ListOf(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, TypeShape::SetOf(_))
    }

    /// Element shape of a list or set
    pub fn element(&self) -> Option<&TypeShape> {
        match self {
            TypeShape::ListOf(element) | TypeShape::SetOf(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Text => "String",
            ScalarKind::Character => "Character",
            ScalarKind::Integer => "Integer",
            ScalarKind::Long => "Long",
            ScalarKind::Short => "Short",
            ScalarKind::Byte => "Byte",
            ScalarKind::Double => "Double",
            ScalarKind::Float => "Float",
            ScalarKind::Boolean => "Boolean",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Scalar(kind) => write!(f, "{}", kind),
            TypeShape::ListOf(element) => write!(f, "List<{}>", element),
            TypeShape::SetOf(element) => write!(f, "Set<{}>", element),
            TypeShape::MapOf(key, value) => write!(f, "Map<{}, {}>", key, value),
            TypeShape::Named(name) => write!(f, "{}", name),
        }
    }
}
