//! Translation of shortcut filters (`author`, `categoryIn`, ...) into backend
//! arguments.

use std::str::FromStr;

use serde_json::Value;

use crate::error::{Error, Result};

/// How a shortcut's argument is sanitized before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    String,
    Integer,
    Array,
}

impl Coercion {
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Coercion::String => to_trimmed_string(value),
            Coercion::Integer => Value::from(to_integer(&value)),
            Coercion::Array => sanitize_array(value),
        }
    }
}

/// Filters that bind straight to one backend argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Author,
    AuthorName,
    AuthorIn,
    AuthorNotIn,
    Cat,
    CategoryName,
    CategoryAnd,
    CategoryIn,
    CategoryNotIn,
    Status,
}

impl Shortcut {
    pub const ALL: &'static [Shortcut] = &[
        Shortcut::Author,
        Shortcut::AuthorName,
        Shortcut::AuthorIn,
        Shortcut::AuthorNotIn,
        Shortcut::Cat,
        Shortcut::CategoryName,
        Shortcut::CategoryAnd,
        Shortcut::CategoryIn,
        Shortcut::CategoryNotIn,
        Shortcut::Status,
    ];

    /// Method name as written in a chained call.
    pub fn name(&self) -> &'static str {
        match self {
            Shortcut::Author => "author",
            Shortcut::AuthorName => "authorName",
            Shortcut::AuthorIn => "authorIn",
            Shortcut::AuthorNotIn => "authorNotIn",
            Shortcut::Cat => "cat",
            Shortcut::CategoryName => "categoryName",
            Shortcut::CategoryAnd => "categoryAnd",
            Shortcut::CategoryIn => "categoryIn",
            Shortcut::CategoryNotIn => "categoryNotIn",
            Shortcut::Status => "status",
        }
    }

    /// Backend argument the value is bound under.
    pub fn target(&self) -> &'static str {
        match self {
            Shortcut::Author => "author",
            Shortcut::AuthorName => "author_name",
            Shortcut::AuthorIn => "author__in",
            Shortcut::AuthorNotIn => "author__not_in",
            Shortcut::Cat => "cat",
            Shortcut::CategoryName => "category_name",
            Shortcut::CategoryAnd => "category__and",
            Shortcut::CategoryIn => "category__in",
            Shortcut::CategoryNotIn => "category__not_in",
            Shortcut::Status => "post_status",
        }
    }

    pub fn coercion(&self) -> Coercion {
        match self {
            Shortcut::Author | Shortcut::AuthorName | Shortcut::CategoryName | Shortcut::Status => {
                Coercion::String
            }
            Shortcut::Cat | Shortcut::CategoryAnd => Coercion::Integer,
            Shortcut::AuthorIn
            | Shortcut::AuthorNotIn
            | Shortcut::CategoryIn
            | Shortcut::CategoryNotIn => Coercion::Array,
        }
    }
}

impl FromStr for Shortcut {
    type Err = Error;

    /// Accepts the camelCase method name or its snake_case spelling.
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s.chars().filter(|c| *c != '_').collect();
        Shortcut::ALL
            .iter()
            .copied()
            .find(|shortcut| shortcut.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::Unsupported(s.to_string()))
    }
}

/// Resolves shortcut calls to `(argument, value)` pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAdapter;

impl QueryAdapter {
    pub fn translate(&self, name: &str, value: impl Into<Value>) -> Result<(&'static str, Value)> {
        let shortcut: Shortcut = name.parse()?;
        Ok(self.translate_shortcut(shortcut, value.into()))
    }

    pub fn translate_shortcut(&self, shortcut: Shortcut, value: Value) -> (&'static str, Value) {
        (shortcut.target(), shortcut.coercion().apply(value))
    }
}

fn to_trimmed_string(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(true) => Value::String("1".to_string()),
        Value::Bool(false) | Value::Null => Value::String(String::new()),
        other => other,
    }
}

/// Integer cast with the usual loose rules: leading digits of a string,
/// truncated floats, `0` for anything else empty.
fn to_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => leading_integer(s.trim()),
        Value::Bool(b) => i64::from(*b),
        Value::Array(items) => i64::from(!items.is_empty()),
        Value::Object(map) => i64::from(!map.is_empty()),
        Value::Null => 0,
    }
}

fn leading_integer(s: &str) -> i64 {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

fn sanitize_array(value: Value) -> Value {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    Value::Array(
        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            })
            .collect(),
    )
}
