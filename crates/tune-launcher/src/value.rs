//! Raw form values and the typed values they coerce into.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("integer regex should be valid"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(?:\d*\.\d+|\d+\.?)(?:[eE][-+]?\d+)?$").expect("float regex should be valid")
});
static BOOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(true|false)$").expect("bool regex should be valid"));

/// A value exactly as the form produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }

    /// JSON form used by the config cache; falsy values become `null`.
    #[must_use]
    pub fn to_record_value(&self) -> Value {
        if !self.is_truthy() {
            return Value::Null;
        }
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::from(items.clone()),
        }
    }

    /// Rebuild a form value from a cached record entry.
    #[must_use]
    pub fn from_record_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::List(
                items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .collect(),
            )),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

/// A form value after type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl ArgValue {
    /// Infer the type of a raw form value.
    ///
    /// Strings are tried against the integer, float and boolean patterns in
    /// that order. Anything else stays a string.
    #[must_use]
    pub fn coerce(raw: &FieldValue) -> Self {
        match raw {
            FieldValue::Bool(b) => Self::Bool(*b),
            FieldValue::List(items) => Self::List(items.clone()),
            FieldValue::Text(s) => coerce_str(s),
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Bool(b) => *b,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Bool(b) => Value::Bool(*b),
            Self::Str(s) => Value::String(s.clone()),
            Self::List(items) => Value::from(items.clone()),
        }
    }

    /// Compare against a default taken from the argument schema.
    ///
    /// Numbers compare by value so `1` equals a default of `1.0`.
    #[must_use]
    pub fn matches_default(&self, default: &Value) -> bool {
        json_equal(&self.to_json(), default)
    }
}

fn coerce_str(s: &str) -> ArgValue {
    if INT_RE.is_match(s) {
        if let Ok(i) = s.parse::<i64>() {
            return ArgValue::Int(i);
        }
    }
    if FLOAT_RE.is_match(s) {
        if let Ok(f) = s.parse::<f64>() {
            return ArgValue::Float(f);
        }
    }
    if BOOL_RE.is_match(s) {
        return ArgValue::Bool(s.eq_ignore_ascii_case("true"));
    }
    ArgValue::Str(s.to_string())
}

pub(crate) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        _ => a == b,
    }
}

/// Render a JSON value the way it appears between quotes on the command line.
pub(crate) fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_int_float_bool_and_string() {
        assert_eq!(ArgValue::coerce(&FieldValue::text("42")), ArgValue::Int(42));
        assert_eq!(ArgValue::coerce(&FieldValue::text("3.5")), ArgValue::Float(3.5));
        assert_eq!(ArgValue::coerce(&FieldValue::text("1e-4")), ArgValue::Float(1e-4));
        assert_eq!(ArgValue::coerce(&FieldValue::text("abc")), ArgValue::Str("abc".to_string()));
    }

    #[test]
    fn test_coerce_bool_any_case() {
        for raw in ["true", "True", "TRUE", "tRuE"] {
            assert_eq!(ArgValue::coerce(&FieldValue::text(raw)), ArgValue::Bool(true));
        }
        assert_eq!(ArgValue::coerce(&FieldValue::text("FALSE")), ArgValue::Bool(false));
    }

    #[test]
    fn test_non_text_values_pass_through() {
        assert_eq!(ArgValue::coerce(&FieldValue::Bool(true)), ArgValue::Bool(true));
        let list = FieldValue::List(vec!["0".to_string(), "1".to_string()]);
        assert_eq!(
            ArgValue::coerce(&list),
            ArgValue::List(vec!["0".to_string(), "1".to_string()])
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!ArgValue::Int(0).is_truthy());
        assert!(!ArgValue::Float(0.0).is_truthy());
        assert!(!ArgValue::Str(String::new()).is_truthy());
        assert!(!ArgValue::List(vec![]).is_truthy());
        assert!(ArgValue::Str("x".to_string()).is_truthy());
    }

    #[test]
    fn test_matches_default_compares_numbers_by_value() {
        assert!(ArgValue::Int(3).matches_default(&serde_json::json!(3.0)));
        assert!(!ArgValue::Int(4).matches_default(&serde_json::json!(3.0)));
        assert!(ArgValue::List(vec!["all-linear".to_string()])
            .matches_default(&serde_json::json!(["all-linear"])));
    }

    #[test]
    fn test_record_value_nulls_falsy() {
        assert_eq!(FieldValue::text("").to_record_value(), Value::Null);
        assert_eq!(FieldValue::Bool(false).to_record_value(), Value::Null);
        assert_eq!(FieldValue::text("x").to_record_value(), Value::String("x".to_string()));
    }
}
