//! Structured and compact renderers
//!
//! Both formats are produced from the same `ClientProxy`, so the field set and
//! order always agree.

use serde_yaml::{Mapping, Value};

use crate::descriptor::{ClientProxy, FieldValue};
use crate::error::{DeployError, DeployResult};
use crate::params::ProtocolKind;

/// Characters that cannot appear unquoted inside a flow mapping
const FLOW_INDICATORS: &[char] = &[
    ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Plain scalars a YAML 1.1 reader would turn into bool or null
const RESERVED_WORDS: &[&str] = &[
    "true", "false", "yes", "no", "y", "n", "on", "off", "null", "~",
];

fn to_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::Int(n) => Value::Number((*n).into()),
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::List(items) => {
            Value::Sequence(items.iter().map(|s| Value::String(s.clone())).collect())
        }
        FieldValue::Map(entries) => Value::Mapping(to_mapping(entries)),
    }
}

fn to_mapping(entries: &[(String, FieldValue)]) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, value) in entries {
        mapping.insert(Value::String(key.clone()), to_value(value));
    }
    mapping
}

/// Block YAML sequence entry, one field per line
pub fn render_structured(kind: ProtocolKind, proxy: &ClientProxy) -> DeployResult<String> {
    let document = Value::Sequence(vec![Value::Mapping(to_mapping(proxy.fields()))]);
    let yaml = serde_yaml::to_string(&document)
        .map_err(|e| DeployError::encoding(kind, "structured", e.to_string()))?;
    Ok(yaml.trim_end().to_string())
}

/// Single-line `- {k: v, ...}` flow record
pub fn render_compact(proxy: &ClientProxy) -> String {
    format!("- {}", flow_mapping(proxy.fields()))
}

fn flow_mapping(entries: &[(String, FieldValue)]) -> String {
    let body = entries
        .iter()
        .map(|(key, value)| format!("{}: {}", flow_scalar(key), flow_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

fn flow_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => flow_scalar(s),
        FieldValue::Int(n) => n.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|s| flow_scalar(s))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        FieldValue::Map(entries) => flow_mapping(entries),
    }
}

/// Plain scalar when it reads back unchanged, double-quoted otherwise
pub fn flow_scalar(s: &str) -> String {
    if needs_quotes(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn needs_quotes(s: &str) -> bool {
    if s.is_empty() || s.trim() != s {
        return true;
    }
    if s.contains(FLOW_INDICATORS) || s.chars().any(char::is_control) {
        return true;
    }
    if s.starts_with(['-', '?', '=']) {
        return true;
    }
    let lower = s.to_ascii_lowercase();
    if RESERVED_WORDS.contains(&lower.as_str()) {
        return true;
    }
    looks_numeric(&lower)
}

fn looks_numeric(s: &str) -> bool {
    if s.parse::<i64>().is_ok() || s.parse::<f64>().is_ok() {
        return true;
    }
    let unsigned = s.trim_start_matches(['+', '-']);
    unsigned.starts_with("0x")
        || unsigned.starts_with("0o")
        || matches!(unsigned, ".inf" | ".nan")
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
