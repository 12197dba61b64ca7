use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Splits `a.b[0].c` style paths. Empty segments are dropped.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    for ch in path.trim().chars() {
        match ch {
            '.' if !in_brackets => {
                push_segment(&mut segments, &current);
                current.clear();
            }
            '[' => {
                push_segment(&mut segments, &current);
                current.clear();
                in_brackets = true;
            }
            ']' => {
                push_segment(&mut segments, &current);
                current.clear();
                in_brackets = false;
            }
            _ => current.push(ch),
        }
    }
    push_segment(&mut segments, &current);
    segments
}

fn push_segment(segments: &mut Vec<PathSegment>, raw: &str) {
    let trimmed = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if trimmed.is_empty() {
        return;
    }
    match trimmed.parse::<usize>() {
        Ok(index) => segments.push(PathSegment::Index(index)),
        Err(_) => segments.push(PathSegment::Key(trimmed.to_string())),
    }
}

pub fn lookup_path<'a>(target: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = target;
    for segment in parse_path(path) {
        current = match segment {
            PathSegment::Key(key) => current.get(key.as_str())?,
            PathSegment::Index(index) => current.as_array()?.get(index)?,
        };
    }
    Some(current)
}

/// Server payloads are either the suggestion list itself or wrap it under
/// `key`; a missing or null key falls back to the whole payload.
pub fn unwrap_data_key(payload: Value, key: &str) -> Value {
    if key.trim().is_empty() {
        return payload;
    }
    match lookup_path(&payload, key) {
        Some(inner) if !inner.is_null() => inner.clone(),
        _ => payload,
    }
}
