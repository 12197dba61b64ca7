use serde_json::Value;

/// Accepts the attribute spellings browsers hand us: `1/0`, `true/false`,
/// `yes/no`, `on/off`. Anything else is not a boolean.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

pub fn is_truthy(raw: impl AsRef<str>) -> bool {
    parse_bool(raw.as_ref()).unwrap_or(false)
}

/// Lists arrive as `a|b|c` or `a,b,c`; the pipe wins when present so that
/// a comma can itself be a list element. A string with nothing between its
/// commas (`","`) is a single element.
pub fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    let separator = if raw.contains('|') { '|' } else { ',' };
    let parts: Vec<String> = raw
        .split(separator)
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect();
    if parts.is_empty() {
        return vec![raw.to_string()];
    }
    parts
}

/// Scalar JSON values rendered the way a DOM attribute would hold them.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => is_truthy(text),
        _ => false,
    }
}

/// `data-allow-new` and `allow_new` both map onto `allowNew`.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.trim().chars() {
        if ch == '-' || ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
