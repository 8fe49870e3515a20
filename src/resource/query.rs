//! Query-Parameter Codec
//!
//! Maps the ordered list of query fields of a page to and from the query
//! string shown in the location bar.

use super::pagination::PaginationState;
use super::registry::{
    FieldType, FieldValue, InputField, PaginationConfig, PaginationSlot, SELECT_PLACEHOLDER,
};

/// Add the pagination slots that are not already present and compute the
/// initial pagination state.
///
/// Slots are identified by their configured parameter name; a field that
/// already carries that name is left untouched.
pub fn build_initial(
    mut fields: Vec<InputField>,
    pagination: Option<&PaginationConfig>,
) -> (Vec<InputField>, Option<PaginationState>) {
    let Some(config) = pagination else {
        return (fields, None);
    };

    let state = PaginationState::from_config(config);

    for slot in PaginationSlot::ALL {
        let Some(name) = config.param_name(slot) else {
            continue;
        };

        if fields.iter().any(|f| f.name == name) {
            continue;
        }

        let label = config
            .spec(slot)
            .and_then(|s| s.label.as_deref())
            .unwrap_or(slot.default_label());

        let (field_type, value) = match slot {
            PaginationSlot::Page => (FieldType::Number, FieldValue::text(state.page.to_string())),
            PaginationSlot::Limit => (FieldType::Number, FieldValue::text(state.limit.to_string())),
            PaginationSlot::Descending => (FieldType::Boolean, FieldValue::Bool(state.descending)),
            PaginationSlot::SortBy => (
                FieldType::Text,
                FieldValue::text(state.sort_by.clone().unwrap_or_default()),
            ),
        };

        fields.push(InputField::new(name, label, field_type, value));
    }

    (fields, Some(state))
}

/// Overwrite field values with the ones present in the query string.
///
/// Fields missing from the query keep their default. Never fails: an empty
/// or malformed query simply yields the defaults.
pub fn parse_from_location(fields: Vec<InputField>, query: &str) -> Vec<InputField> {
    let pairs = parse_query_string(query);

    fields
        .into_iter()
        .map(|mut field| {
            if let Some((_, raw)) = pairs.iter().find(|(key, _)| *key == field.name) {
                field.value = if field.field_type == FieldType::Boolean {
                    FieldValue::Bool(raw == "true")
                } else {
                    FieldValue::text(raw.clone())
                };
            }
            field
        })
        .collect()
}

/// Build `?name=value&...` in list order.
///
/// With infinite-scroll pagination the page and limit slots are internal and
/// left out. An unselected dropdown serializes as an empty value.
pub fn serialize(fields: &[InputField], pagination: Option<&PaginationConfig>) -> String {
    let hide_paging = pagination.filter(|p| p.is_infinite_scroll());

    let parts: Vec<String> = fields
        .iter()
        .filter(|f| !hide_paging.is_some_and(|p| p.is_page_or_limit(&f.name)))
        .map(|f| {
            let mut value = f.value.as_query_value();
            if value == SELECT_PLACEHOLDER {
                value.clear();
            }
            format!("{}={}", f.name, urlencoding::encode(&value))
        })
        .collect();

    if parts.is_empty() {
        String::new()
    } else {
        format!("?{}", parts.join("&"))
    }
}

/// Decode a query string into ordered key/value pairs.
/// Keys appearing more than once keep their first value.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    let query = query.trim();
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut pairs: Vec<(String, String)> = Vec::new();

    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        let key = decode_component(key);
        if key.is_empty() || pairs.iter().any(|(k, _)| *k == key) {
            continue;
        }
        pairs.push((key, decode_component(value)));
    }

    pairs
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Replace the value of a named field, returning the updated list
pub fn with_value(fields: &[InputField], name: &str, value: FieldValue) -> Vec<InputField> {
    fields
        .iter()
        .cloned()
        .map(|mut f| {
            if f.name == name {
                f.value = value.clone();
            }
            f
        })
        .collect()
}

/// Drop the page and limit slots so they can be rebuilt from defaults
pub fn without_page_and_limit(fields: Vec<InputField>, pagination: &PaginationConfig) -> Vec<InputField> {
    fields
        .into_iter()
        .filter(|f| !pagination.is_page_or_limit(&f.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::{PaginationKind, PaginationParams, ParamSpec};

    fn spec(name: &str, value: Option<&str>) -> Option<ParamSpec> {
        Some(ParamSpec {
            name: Some(name.to_string()),
            label: None,
            value: value.map(FieldValue::text),
        })
    }

    fn paging(kind: PaginationKind) -> PaginationConfig {
        PaginationConfig {
            kind,
            params: PaginationParams {
                page: spec("page", None),
                limit: spec("limit", Some("25")),
                descending: spec("descending", None),
                sort_by: spec("sortBy", Some("name")),
            },
            fields: Default::default(),
        }
    }

    fn text_field(name: &str, value: &str) -> InputField {
        InputField::new(name, name, FieldType::Text, FieldValue::text(value))
    }

    #[test]
    fn test_build_initial_adds_pagination_slots() {
        let config = paging(PaginationKind::Paged);
        let (fields, state) = build_initial(vec![text_field("q", "")], Some(&config));

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["q", "page", "limit", "descending", "sortBy"]);
        assert_eq!(fields[1].value, FieldValue::text("1"));
        assert_eq!(fields[2].value, FieldValue::text("25"));
        assert_eq!(fields[3].value, FieldValue::Bool(false));

        let state = state.unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.limit, 25);
        assert_eq!(state.sort_by.as_deref(), Some("name"));
    }

    #[test]
    fn test_build_initial_keeps_existing_slot_field() {
        let config = paging(PaginationKind::Paged);
        let (fields, _) = build_initial(vec![text_field("limit", "99")], Some(&config));

        let limits: Vec<&InputField> = fields.iter().filter(|f| f.name == "limit").collect();
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].value, FieldValue::text("99"));
    }

    #[test]
    fn test_build_initial_without_pagination() {
        let (fields, state) = build_initial(vec![text_field("q", "x")], None);
        assert_eq!(fields.len(), 1);
        assert!(state.is_none());
    }

    #[test]
    fn test_parse_from_location_overrides_present_fields() {
        let flag = InputField::new("active", "Active", FieldType::Boolean, FieldValue::Bool(false));
        let fields = vec![text_field("q", "default"), text_field("other", "keep"), flag];

        let parsed = parse_from_location(fields, "?q=hello%20world&active=true");
        assert_eq!(parsed[0].value, FieldValue::text("hello world"));
        assert_eq!(parsed[1].value, FieldValue::text("keep"));
        assert_eq!(parsed[2].value, FieldValue::Bool(true));
    }

    #[test]
    fn test_parse_from_location_tolerates_garbage() {
        let fields = vec![text_field("q", "d")];
        assert_eq!(parse_from_location(fields.clone(), "")[0].value, FieldValue::text("d"));
        assert_eq!(parse_from_location(fields.clone(), "&&=&%zz")[0].value, FieldValue::text("d"));
        assert_eq!(parse_from_location(fields, "?q=%E0%A4%A")[0].value, FieldValue::text("%E0%A4%A"));
    }

    #[test]
    fn test_serialize_in_list_order() {
        let fields = vec![text_field("b", "2"), text_field("a", "x y")];
        assert_eq!(serialize(&fields, None), "?b=2&a=x%20y");
    }

    #[test]
    fn test_serialize_hides_page_and_limit_for_infinite_scroll() {
        let config = paging(PaginationKind::InfiniteScroll);
        let (fields, _) = build_initial(vec![text_field("q", "z")], Some(&config));

        assert_eq!(serialize(&fields, Some(&config)), "?q=z&descending=false&sortBy=name");

        let paged = paging(PaginationKind::Paged);
        assert_eq!(
            serialize(&fields, Some(&paged)),
            "?q=z&page=1&limit=25&descending=false&sortBy=name"
        );
    }

    #[test]
    fn test_serialize_empties_select_placeholder() {
        let mut select = text_field("status", SELECT_PLACEHOLDER);
        select.field_type = FieldType::Select;
        assert_eq!(serialize(&[select], None), "?status=");
    }

    #[test]
    fn test_serialize_empty_list() {
        assert_eq!(serialize(&[], None), "");
    }

    #[test]
    fn test_without_page_and_limit() {
        let config = paging(PaginationKind::InfiniteScroll);
        let (fields, _) = build_initial(vec![text_field("q", "z")], Some(&config));
        let names: Vec<String> = without_page_and_limit(fields, &config)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["q", "descending", "sortBy"]);
    }

    #[test]
    fn test_parse_query_string_first_value_wins() {
        let pairs = parse_query_string("?a=1&a=2&b");
        assert_eq!(pairs, vec![("a".to_string(), "1".to_string()), ("b".to_string(), String::new())]);
    }
}
