//! Data helpers
//!
//! Extraction of values from response bodies by `dataPath`, natural
//! ordering of items, and the client-side text filter.

use serde_json::Value;
use std::cmp::Ordering;

/// Locate the value at a dot path (`data.items`, `results.0.rows`).
/// An empty path addresses the whole body.
pub fn extract_data_by_path<'a>(value: &'a Value, path: Option<&str>) -> Option<&'a Value> {
    let path = path.map(str::trim).unwrap_or("");
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Scalar value as a path/query parameter. Objects, arrays and null are absent.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract a value from JSON using a dot-notation path, formatted for display
pub fn extract_json_value(item: &Value, path: &str) -> String {
    match extract_data_by_path(item, Some(path)) {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(arr)) => format!("[{} items]", arr.len()),
        Some(Value::Object(_)) => "[object]".to_string(),
    }
}

/// Stable sort by the given keys, each compared in natural order
pub fn sort_items(items: &mut [Value], keys: &[&str]) {
    if keys.is_empty() {
        return;
    }

    items.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                compare_values(
                    extract_data_by_path(a, Some(key)),
                    extract_data_by_path(b, Some(key)),
                )
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Missing and null values sort last; numbers compare numerically;
/// everything else compares as text in natural order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        },
        (Some(x), Some(y)) => natural_cmp(&sort_text(x), &sort_text(y)),
    }
}

fn sort_text(value: &Value) -> String {
    scalar_to_string(value).unwrap_or_else(|| value.to_string())
}

/// Natural ordering: digit runs compare by numeric value, text compares
/// case-insensitively, so `item2 < item10` and `apple < Banana`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a).into_iter();
    let mut right = chunks(b).into_iter();

    loop {
        match (left.next(), right.next()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_chunk(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }

    // Only case differs: keep a deterministic order
    a.cmp(b)
}

fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;

    for (idx, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != is_digit) {
            out.push(&s[start..idx]);
            start = idx;
        }
        prev_digit = Some(is_digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

fn compare_chunk(x: &str, y: &str) -> Ordering {
    let x_digits = x.starts_with(|c: char| c.is_ascii_digit());
    let y_digits = y.starts_with(|c: char| c.is_ascii_digit());

    match (x_digits, y_digits) {
        (true, true) => {
            let xt = x.trim_start_matches('0');
            let yt = y.trim_start_matches('0');
            xt.len().cmp(&yt.len()).then_with(|| xt.cmp(yt))
        },
        // Numbers sort before words
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.to_lowercase().cmp(&y.to_lowercase()),
    }
}

/// Case-insensitive substring match on the named string fields
pub fn matches_filter(item: &Value, field_names: &[&str], filter: &str) -> bool {
    let needle = filter.to_lowercase();
    field_names.iter().any(|name| {
        item.get(*name)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&needle))
    })
}
