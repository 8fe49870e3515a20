//! Pagination State Machine
//!
//! Tracks page, limit, ordering and the server-reported total for a list
//! view. The state is recomputed from the query fields on every change; the
//! two strategies only differ in how the controller merges fetched pages.

use super::registry::{
    FieldValue, InputField, PaginationConfig, PaginationKind, PaginationLabels, PaginationSlot,
};
use serde_json::Value;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

/// Derived pagination state of a list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pub kind: PaginationKind,
    pub page: u64,
    pub limit: u64,
    pub descending: bool,
    pub sort_by: Option<String>,
    pub total: Option<u64>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PaginationState {
    /// Initial state from the configured defaults
    pub fn from_config(config: &PaginationConfig) -> Self {
        let page = config
            .default_value(PaginationSlot::Page)
            .and_then(parse_count)
            .unwrap_or(DEFAULT_PAGE);
        let limit = config
            .default_value(PaginationSlot::Limit)
            .and_then(parse_count)
            .unwrap_or(DEFAULT_LIMIT);
        let descending = config
            .default_value(PaginationSlot::Descending)
            .map(FieldValue::is_true)
            .unwrap_or(false);
        let sort_by = config
            .default_value(PaginationSlot::SortBy)
            .map(FieldValue::as_query_value)
            .filter(|s| !s.is_empty());

        let mut state = Self {
            kind: config.kind,
            page,
            limit,
            descending,
            sort_by,
            total: None,
            has_previous_page: false,
            has_next_page: false,
        };
        state.recompute();
        state
    }

    /// Next state after the query fields changed.
    ///
    /// Starts from `current` (or the config defaults), takes `total` only when
    /// a new one is supplied, and overwrites each slot from the field carrying
    /// its configured name. Slots without a usable field keep their value.
    pub fn derive(
        current: Option<&PaginationState>,
        config: &PaginationConfig,
        fields: &[InputField],
        total: Option<u64>,
    ) -> Self {
        let mut state = current
            .cloned()
            .unwrap_or_else(|| Self::from_config(config));
        state.kind = config.kind;

        if total.is_some() {
            state.total = total;
        }

        if let Some(page) = slot_value(config, fields, PaginationSlot::Page).and_then(parse_count) {
            state.page = page;
        }

        if let Some(limit) = slot_value(config, fields, PaginationSlot::Limit).and_then(parse_count) {
            state.limit = limit;
        }

        if let Some(value) = slot_value(config, fields, PaginationSlot::Descending) {
            state.descending = value.is_true();
        }

        if let Some(value) = slot_value(config, fields, PaginationSlot::SortBy) {
            let sort_by = value.as_query_value();
            if !sort_by.is_empty() {
                state.sort_by = Some(sort_by);
            }
        }

        state.recompute();
        state
    }

    fn recompute(&mut self) {
        self.has_previous_page = self.page > 1;
        self.has_next_page = match self.total {
            None => true,
            Some(total) => self.page.saturating_mul(self.limit) < total,
        };
    }

    pub fn is_infinite_scroll(&self) -> bool {
        self.kind == PaginationKind::InfiniteScroll
    }

    pub fn next_page(&self) -> u64 {
        self.page.saturating_add(1)
    }

    /// `None` at the first page: going back from page 1 is a no-op
    pub fn previous_page(&self) -> Option<u64> {
        (self.page > 1).then(|| self.page - 1)
    }
}

fn slot_value<'a>(
    config: &PaginationConfig,
    fields: &'a [InputField],
    slot: PaginationSlot,
) -> Option<&'a FieldValue> {
    let name = config.param_name(slot)?;
    fields.iter().find(|f| f.name == name).map(|f| &f.value)
}

/// Parse a page or limit value; zero and garbage are rejected
fn parse_count(value: &FieldValue) -> Option<u64> {
    match value {
        FieldValue::Text(s) => s.trim().parse::<u64>().ok().filter(|n| *n >= 1),
        FieldValue::Bool(_) => None,
    }
}

/// Read a total count reported by the server (number or numeric string)
pub fn parse_total(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Summary line shown above the list, e.g. `Showing results 11-20 out of 93 items`.
///
/// Only produced when the total is known and the list is not empty. A custom
/// `itemsCount` label may use `:currentCountFrom`, `:currentCountTo` and
/// `:totalCount`.
pub fn items_count_label(
    state: Option<&PaginationState>,
    item_count: usize,
    labels: &PaginationLabels,
) -> Option<String> {
    let state = state?;
    let total = state.total?;
    if item_count == 0 {
        return None;
    }

    // Page and limit come from the location and may be arbitrarily large
    let from = (state.page - 1).saturating_mul(state.limit).saturating_add(1);
    let to = from.saturating_add(item_count as u64 - 1);

    let label = match &labels.items_count {
        Some(template) => template
            .replace(":currentCountFrom", &from.to_string())
            .replace(":currentCountTo", &to.to_string())
            .replace(":totalCount", &total.to_string()),
        None if state.is_infinite_scroll() => format!("Showing {} items", total),
        None => format!("Showing results {}-{} out of {} items", from, to, total),
    };

    Some(label)
}
