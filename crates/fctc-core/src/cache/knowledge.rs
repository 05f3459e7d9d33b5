//! Typed knowledge-base values derived from list query answers

use serde::{Deserialize, Serialize};

/// A single knowledge-base value.
///
/// Values stored under one key share a type, unified with precedence
/// bool > int > float > string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KbValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl KbValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            KbValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            KbValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KbValue::Float(f) => Some(*f),
            KbValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KbValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for KbValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KbValue::Bool(true) => write!(f, "True"),
            KbValue::Bool(false) => write!(f, "False"),
            KbValue::Int(i) => write!(f, "{}", i),
            KbValue::Float(x) => write!(f, "{}", x),
            KbValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Convert one answer token: int, then float, then `True`/`False`, else text
pub fn convert_value(raw: &str) -> KbValue {
    if let Ok(i) = raw.parse::<i64>() {
        return KbValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return KbValue::Float(f);
        }
    }
    match raw {
        "True" => KbValue::Bool(true),
        "False" => KbValue::Bool(false),
        _ => KbValue::Str(raw.to_string()),
    }
}

/// The value text that follows `item` on a recorded answer line.
///
/// Falls back to everything after the first token when the line does not
/// start with the item name.
pub fn value_after_item<'a>(item: &str, line: &'a str) -> &'a str {
    let line = line.trim();
    match line.strip_prefix(item) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => line.split_once(' ').map(|(_, rest)| rest.trim()).unwrap_or(""),
    }
}

/// Convert a batch of raw values to one shared type
pub fn unify(raw: &[(String, String)]) -> Vec<(String, KbValue)> {
    let converted: Vec<KbValue> = raw.iter().map(|(_, v)| convert_value(v)).collect();

    let all_bool = converted.iter().all(|v| matches!(v, KbValue::Bool(_)));
    let all_int = converted
        .iter()
        .all(|v| matches!(v, KbValue::Bool(_) | KbValue::Int(_)));
    let all_numeric = converted
        .iter()
        .all(|v| matches!(v, KbValue::Bool(_) | KbValue::Int(_) | KbValue::Float(_)));

    raw.iter()
        .zip(converted)
        .map(|((item, text), value)| {
            let unified = if all_bool {
                value
            } else if all_int {
                KbValue::Int(match value {
                    KbValue::Bool(b) => i64::from(b),
                    KbValue::Int(i) => i,
                    _ => 0,
                })
            } else if all_numeric {
                KbValue::Float(match value {
                    KbValue::Bool(b) => f64::from(u8::from(b)),
                    KbValue::Int(i) => i as f64,
                    KbValue::Float(f) => f,
                    KbValue::Str(_) => 0.0,
                })
            } else {
                KbValue::Str(text.clone())
            };
            (item.clone(), unified)
        })
        .collect()
}
