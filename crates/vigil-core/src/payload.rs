//! Best-effort field extraction from loosely shaped JSON payloads.
//!
//! Upstream webhook bodies drift between revisions, so every field is looked
//! up through an ordered list of dotted candidate paths (`message.text`,
//! `messages.0.text`) and the first non-empty value wins.

use serde_json::Value;

/// Keys under which an event list may be wrapped.
const LIST_WRAPPERS: &[&str] = &["events", "result", "data", "items"];

/// Resolve a dotted path. Numeric segments index into arrays.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A non-empty string or a number rendered as a string.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate path that resolves to a usable scalar.
pub fn first_string<S: AsRef<str>>(value: &Value, paths: &[S]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| lookup(value, p.as_ref()))
        .find_map(scalar_string)
}

/// Interpret a fetched resource as an event list: either a bare array or an
/// object wrapping one (at most two levels deep, e.g. `{"result":{"events":[]}}`).
pub fn event_list(value: &Value) -> Option<&Vec<Value>> {
    event_list_at(value, 0)
}

fn event_list_at(value: &Value, depth: usize) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) if depth < 2 => LIST_WRAPPERS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|inner| event_list_at(inner, depth + 1)),
        _ => None,
    }
}

/// The path segment following `marker`, e.g. the visitor id in
/// `/api/v1/visitors/{id}/chats/...`. Query strings and fragments are ignored.
pub fn segment_after(path: &str, marker: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == marker)?;
    segments
        .next()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// True for a path with no scheme or host, e.g. `/api/v1/visitors/v1`.
pub fn is_relative_path(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path).trim();
    !path.contains("://") && !path.starts_with("//") && !path.contains('\\')
}
