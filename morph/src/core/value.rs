//! Values stored in the run context.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A context attribute value.
///
/// Steps communicate exclusively through these values, so the set of shapes is
/// deliberately small: scalars, paths, file collections and generic lists/sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Path(PathBuf),
    /// Collection of files, as produced by file-finding utilities.
    Files(Vec<PathBuf>),
    List(Vec<Value>),
    /// Unordered collection of distinct values.
    Set(Vec<Value>),
}

impl Value {
    /// Build a `Set`, collapsing duplicates while keeping first-seen order.
    pub fn set<I: IntoIterator<Item = Value>>(values: I) -> Self {
        let mut distinct: Vec<Value> = Vec::new();
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        Value::Set(distinct)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a single file path.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            Value::Text(s) => Some(Path::new(s)),
            _ => None,
        }
    }

    /// Interpret the value as a collection of files.
    ///
    /// Accepts `Files`, a single `Path`, or a `List`/`Set` made only of paths.
    pub fn as_files(&self) -> Option<Vec<PathBuf>> {
        match self {
            Value::Files(files) => Some(files.clone()),
            Value::Path(p) => Some(vec![p.clone()]),
            Value::List(items) | Value::Set(items) => items
                .iter()
                .map(|item| match item {
                    Value::Path(p) => Some(p.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Short label for the value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Path(_) => "path",
            Value::Files(_) => "files",
            Value::List(_) => "list",
            Value::Set(_) => "set",
        }
    }

    /// Parse a command-line style literal: bool, then integer, then text.
    pub fn parse_literal(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            return Value::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        Value::Text(raw.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Files(files) => {
                let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
                write!(f, "[{}]", names.join(", "))
            }
            Value::List(items) | Value::Set(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::Path(value)
    }
}

impl From<Vec<PathBuf>> for Value {
    fn from(value: Vec<PathBuf>) -> Self {
        Value::Files(value)
    }
}

impl From<BTreeSet<PathBuf>> for Value {
    fn from(value: BTreeSet<PathBuf>) -> Self {
        Value::Files(value.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_collapses_duplicates() {
        let set = Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        assert_eq!(set, Value::Set(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn list_of_paths_reads_as_files() {
        let list = Value::List(vec![
            Value::Path(PathBuf::from("a")),
            Value::Path(PathBuf::from("b")),
        ]);
        assert_eq!(
            list.as_files(),
            Some(vec![PathBuf::from("a"), PathBuf::from("b")])
        );
        let mixed = Value::List(vec![Value::Path(PathBuf::from("a")), Value::Int(3)]);
        assert_eq!(mixed.as_files(), None);
    }

    #[test]
    fn parse_literal_prefers_bool_then_int() {
        assert_eq!(Value::parse_literal("true"), Value::Bool(true));
        assert_eq!(Value::parse_literal("42"), Value::Int(42));
        assert_eq!(Value::parse_literal("blue"), Value::Text("blue".into()));
    }
}
