//! Query-string conversion rules.

use serde_json::{Number, Value};

use crate::params::ParamKind;

/// Converts the raw values of one query key into a JSON candidate for the
/// given kind. `None` means absent or unconvertible.
pub(crate) fn convert(kind: ParamKind, values: &[&str]) -> Option<Value> {
    match kind {
        ParamKind::Text => values.first().map(|v| Value::from(*v)),
        ParamKind::Boolean => values.first().and_then(|v| parse_bool(v)).map(Value::Bool),
        ParamKind::TextList => {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| Value::from(*v)).collect())
            }
        }
        ParamKind::Integer => values.first().and_then(|v| parse_integer(v)),
        ParamKind::Number => values.first().and_then(|v| parse_number(v)),
        ParamKind::List => {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| scalar(v)).collect())
            }
        }
        ParamKind::Structured | ParamKind::Context | ParamKind::Service => None,
    }
}

/// Boolean literal parse: `true` / `false`, any case, surrounding space ignored.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_integer(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(Value::from(v));
    }
    raw.parse::<u64>().ok().map(Value::from)
}

fn parse_number(raw: &str) -> Option<Value> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// A list element: number or boolean when it parses as one, else a string.
fn scalar(raw: &str) -> Value {
    parse_integer(raw)
        .or_else(|| parse_number(raw))
        .or_else(|| parse_bool(raw).map(Value::Bool))
        .unwrap_or_else(|| Value::from(raw))
}
