//! Detail-Path Resolver
//!
//! Builds the navigation path of a single item from the `getSingle.id`
//! template (`/users/:userId/:postId`) and the item's field values.

use super::fetcher::scalar_to_string;
use crate::error::ResourceError;
use serde_json::{Map, Value};

/// Deepest nesting a detail template may describe
pub const MAX_DETAIL_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    template
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) if !name.is_empty() => Segment::Param(name),
            _ => Segment::Literal(s),
        })
        .collect()
}

/// Placeholder names of a template, in order
pub fn placeholder_names(template: &str) -> Vec<&str> {
    segments(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Param(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Resolve the concrete detail path of `item`.
///
/// For a sub-resource with two placeholders, the first one comes from the
/// parent's active item when that item carries a field of the same name.
/// All other placeholders come from the item itself.
pub fn resolve_detail_path(
    template: &str,
    item: &Value,
    parent_item: Option<&Value>,
    is_sub_resource: bool,
) -> Result<String, ResourceError> {
    let names = placeholder_names(template);

    if names.len() > MAX_DETAIL_DEPTH {
        return Err(ResourceError::Navigation(
            "Depth of more than 2 resources is not supported".to_string(),
        ));
    }

    if names.is_empty() {
        return Err(ResourceError::Navigation(format!(
            "No url parameters found in {}",
            template
        )));
    }

    let mut values: Vec<Option<String>> = vec![None; names.len()];

    if is_sub_resource && names.len() > 1 {
        values[0] = parent_item
            .and_then(|parent| parent.get(names[0]))
            .and_then(scalar_to_string);
    }

    for (slot, name) in values.iter_mut().zip(&names) {
        if slot.is_none() {
            *slot = item.get(*name).and_then(scalar_to_string);
        }
    }

    let mut resolved = values.into_iter();
    let mut parts = Vec::new();

    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => parts.push(text.to_string()),
            Segment::Param(name) => match resolved.next().flatten() {
                Some(value) => parts.push(urlencoding::encode(&value).into_owned()),
                None => {
                    return Err(ResourceError::Navigation(format!(
                        "Missing value for :{} in {}",
                        name, template
                    )));
                },
            },
        }
    }

    Ok(format!("/{}", parts.join("/")))
}

/// Recover the placeholder values of a concrete path built from `template`
pub fn match_template(template: &str, path: &str) -> Option<Map<String, Value>> {
    let pattern = segments(template);
    let concrete: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern.len() != concrete.len() {
        return None;
    }

    let mut vars = Map::new();
    for (segment, part) in pattern.iter().zip(concrete) {
        match segment {
            Segment::Literal(text) if *text == part => {},
            Segment::Literal(_) => return None,
            Segment::Param(name) => {
                let value = urlencoding::decode(part)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| part.to_string());
                vars.insert(name.to_string(), Value::String(value));
            },
        }
    }

    Some(vars)
}
