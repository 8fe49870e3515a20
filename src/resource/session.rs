//! Resource session
//!
//! Per-view state of one resource: its query fields, pagination state and
//! loaded items. All mutation goes through the named operations below; the
//! async parts live in [`super::controller`].
//!
//! The generation guard and the `loading` latch only matter for callers that
//! split [`ResourceSession::begin_fetch`] and [`ResourceSession::finish_fetch`]
//! around their own await. The controller holds `&mut ResourceSession` across
//! the whole fetch, so the event loop never hits them today.

use super::fetcher::matches_filter;
use super::pagination::PaginationState;
use super::query::{self, build_initial, parse_from_location, with_value, without_page_and_limit};
use super::registry::{
    CustomLabels, FieldValue, InputField, PaginationConfig, PaginationSlot, ResourceConfig,
};
use crate::error::ResourceError;
use serde_json::Value;
use std::sync::Arc;

/// Result of submitting query fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A fetch is in flight; nothing changed
    Ignored,
    /// Fields accepted; the location should show `query_string`
    Submitted { query_string: String },
}

/// Snapshot taken when a fetch starts. A result is only applied while the
/// session is still on the same generation.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query_params: Vec<InputField>,
    pub path_vars: Option<Value>,
}

/// Query state saved before a submit, restored when its fetch fails
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    query_params: Vec<InputField>,
    pagination: Option<PaginationState>,
    /// Only kept for resets, which empty the list up front
    items: Option<Vec<Value>>,
}

/// Items and total read from one `getAll` response
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub items: Vec<Value>,
    pub total: Option<u64>,
}

/// State of one resource view
#[derive(Debug, Clone)]
pub struct ResourceSession {
    resource: Arc<ResourceConfig>,
    pub labels: CustomLabels,
    pub query_params: Vec<InputField>,
    pub pagination: Option<PaginationState>,
    pub items: Vec<Value>,
    pub loading: bool,
    /// View-level error message (failed fetch, bad response shape)
    pub error: Option<String>,
    /// Client-side text filter over filterable fields
    pub filter: String,
    pub is_sub_resource: bool,
    /// Values for the `:param` tokens of the list url
    pub path_vars: Option<Value>,
    /// Active item of the parent resource
    pub parent_item: Option<Value>,
    generation: u64,
}

impl ResourceSession {
    /// Session for a top-level resource, seeded from the location query
    pub fn new(resource: Arc<ResourceConfig>, labels: CustomLabels, location_query: &str) -> Self {
        let pagination_config = resource.pagination().cloned();
        let declared = resource
            .methods
            .get_all
            .as_ref()
            .map(|g| g.query_params.clone())
            .unwrap_or_default();

        let (fields, initial) = build_initial(declared, pagination_config.as_ref());
        let fields = parse_from_location(fields, location_query);
        let pagination = pagination_config
            .as_ref()
            .map(|cfg| PaginationState::derive(initial.as_ref(), cfg, &fields, None));

        Self {
            resource,
            labels,
            query_params: fields,
            pagination,
            items: Vec::new(),
            loading: false,
            error: None,
            filter: String::new(),
            is_sub_resource: false,
            path_vars: None,
            parent_item: None,
            generation: 0,
        }
    }

    /// Session for a resource listed under a parent item
    pub fn sub_resource(
        resource: Arc<ResourceConfig>,
        labels: CustomLabels,
        path_vars: Value,
        parent_item: Value,
    ) -> Self {
        let mut session = Self::new(resource, labels, "");
        session.is_sub_resource = true;
        session.path_vars = Some(path_vars);
        session.parent_item = Some(parent_item);
        session
    }

    pub fn resource(&self) -> &ResourceConfig {
        &self.resource
    }

    pub fn resource_arc(&self) -> Arc<ResourceConfig> {
        Arc::clone(&self.resource)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pagination_config(&self) -> Option<&PaginationConfig> {
        self.resource.pagination()
    }

    pub fn is_infinite_scroll(&self) -> bool {
        self.resource.is_infinite_scroll()
    }

    /// Query string for the location bar
    pub fn query_string(&self) -> String {
        query::serialize(&self.query_params, self.pagination_config())
    }

    /// Accept new query fields.
    ///
    /// Ignored while loading. With `reset` the item list is emptied and the
    /// page and limit slots go back to their defaults.
    pub fn submit_query_params(&mut self, updated: Vec<InputField>, reset: bool) -> SubmitOutcome {
        if self.loading {
            tracing::debug!("Ignoring query submit while loading");
            return SubmitOutcome::Ignored;
        }

        let mut updated = updated;
        if reset {
            self.clear_items();
            if let Some(config) = self.resource.pagination() {
                let stripped = without_page_and_limit(updated, config);
                updated = build_initial(stripped, Some(config)).0;
            }
        }

        self.query_params = updated;
        self.pagination = self.resource.pagination().map(|config| {
            PaginationState::derive(self.pagination.as_ref(), config, &self.query_params, None)
        });

        SubmitOutcome::Submitted {
            query_string: self.query_string(),
        }
    }

    /// Save the query state before a submit. `with_items` also keeps the
    /// loaded items, for submits that clear the list.
    pub fn snapshot_query(&self, with_items: bool) -> QuerySnapshot {
        QuerySnapshot {
            query_params: self.query_params.clone(),
            pagination: self.pagination.clone(),
            items: with_items.then(|| self.items.clone()),
        }
    }

    /// Put back the query state of a submit whose fetch failed
    pub fn restore_query(&mut self, snapshot: QuerySnapshot) {
        self.query_params = snapshot.query_params;
        self.pagination = snapshot.pagination;
        if let Some(items) = snapshot.items {
            self.items = items;
        }
    }

    /// Query fields with the page slot set to `page`
    pub fn fields_for_page(&self, page: u64) -> Option<Vec<InputField>> {
        let name = self.pagination_config()?.param_name(PaginationSlot::Page)?;
        Some(with_value(
            &self.query_params,
            name,
            FieldValue::text(page.to_string()),
        ))
    }

    /// Empty the list; any fetch still in flight becomes stale
    pub fn clear_items(&mut self) {
        self.items.clear();
        self.invalidate();
    }

    /// Restart infinite scrolling from the first page
    pub fn restart_infinite_scroll(&mut self) {
        self.clear_items();
        if let Some(config) = self.resource.pagination() {
            let stripped = without_page_and_limit(std::mem::take(&mut self.query_params), config);
            self.query_params = build_initial(stripped, Some(config)).0;
            self.pagination = Some(PaginationState::derive(
                self.pagination.as_ref(),
                config,
                &self.query_params,
                None,
            ));
        }
    }

    /// Drop any in-flight fetch result
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.loading = false;
    }

    /// Mark the start of a fetch
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.loading = true;
        self.error = None;
        FetchTicket {
            generation: self.generation,
            query_params: self.query_params.clone(),
            path_vars: self.path_vars.clone(),
        }
    }

    /// Apply a fetch result. Returns false when the ticket is stale and the
    /// result was discarded. A failed fetch leaves items and pagination as
    /// they were.
    pub fn finish_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<FetchedPage, ResourceError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                "Discarding stale response (generation {} != {})",
                ticket.generation,
                self.generation
            );
            return false;
        }

        self.loading = false;

        match result {
            Ok(page) => {
                if let Some(config) = self.resource.pagination() {
                    self.pagination = Some(PaginationState::derive(
                        self.pagination.as_ref(),
                        config,
                        &ticket.query_params,
                        page.total,
                    ));
                }

                if self.is_infinite_scroll() {
                    self.items.extend(page.items);
                } else {
                    self.items = page.items;
                }
            },
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", self.resource.id, e);
                self.error = Some(e.user_message());
            },
        }

        true
    }

    /// Names of the display fields that take part in the text filter
    pub fn filterable_fields(&self) -> Vec<&str> {
        self.resource
            .display_fields()
            .iter()
            .filter(|f| f.filterable)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Items after the client-side filter
    pub fn visible_items(&self) -> Vec<&Value> {
        let fields = self.filterable_fields();
        if self.filter.is_empty() || fields.is_empty() {
            return self.items.iter().collect();
        }

        self.items
            .iter()
            .filter(|item| matches_filter(item, &fields, &self.filter))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::AppConfig;
    use serde_json::json;

    fn resource(value: Value) -> Arc<ResourceConfig> {
        Arc::new(serde_json::from_value(value).unwrap())
    }

    fn infinite() -> Arc<ResourceConfig> {
        resource(json!({
            "id": "photos",
            "name": "Photos",
            "methods": { "getAll": {
                "url": "/photos",
                "queryParams": [{ "name": "q" }],
                "display": { "fields": [{ "name": "title", "filterable": true }] },
                "pagination": { "type": "infinite-scroll", "params": { "limit": { "value": "2" } } }
            }}
        }))
    }

    fn page(items: Vec<Value>) -> FetchedPage {
        FetchedPage { items, total: None }
    }

    #[test]
    fn test_new_session_reads_location() {
        let config = AppConfig::demo().unwrap();
        let posts = Arc::new(config.page("posts").unwrap().clone());
        let session = ResourceSession::new(posts, CustomLabels::default(), "?userId=2&_page=3");

        assert_eq!(session.pagination.as_ref().unwrap().page, 3);
        assert_eq!(session.query_string(), "?userId=2&_page=3&_limit=10&_sort=id");
    }

    #[test]
    fn test_submit_is_ignored_while_loading() {
        let mut session = ResourceSession::new(infinite(), CustomLabels::default(), "");
        let _ticket = session.begin_fetch();

        let outcome = session.submit_query_params(Vec::new(), true);
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert!(!session.query_params.is_empty());
    }

    #[test]
    fn test_infinite_scroll_appends_and_reset_clears() {
        let mut session = ResourceSession::new(infinite(), CustomLabels::default(), "");

        let ticket = session.begin_fetch();
        session.finish_fetch(&ticket, Ok(page(vec![json!("x")])));
        let next = session.fields_for_page(2).unwrap();
        session.submit_query_params(next, false);
        let ticket = session.begin_fetch();
        session.finish_fetch(&ticket, Ok(page(vec![json!("y")])));
        assert_eq!(session.items, vec![json!("x"), json!("y")]);
        assert_eq!(session.pagination.as_ref().unwrap().page, 2);

        let filtered = with_value(&session.query_params, "q", FieldValue::text("cats"));
        session.submit_query_params(filtered, true);
        assert!(session.items.is_empty());
        assert_eq!(session.pagination.as_ref().unwrap().page, 1);
        assert_eq!(session.query_string(), "?q=cats");
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut session = ResourceSession::new(infinite(), CustomLabels::default(), "");
        let ticket = session.begin_fetch();
        session.invalidate();

        let applied = session.finish_fetch(&ticket, Ok(page(vec![json!("late")])));
        assert!(!applied);
        assert!(session.items.is_empty());
    }

    #[test]
    fn test_failed_fetch_keeps_state() {
        let mut session = ResourceSession::new(infinite(), CustomLabels::default(), "");
        let ticket = session.begin_fetch();
        session.finish_fetch(&ticket, Ok(page(vec![json!("a")])));
        let before = session.pagination.clone();

        let ticket = session.begin_fetch();
        session.finish_fetch(&ticket, Err(ResourceError::Extraction("bad".into())));
        assert_eq!(session.items, vec![json!("a")]);
        assert_eq!(session.pagination, before);
        assert_eq!(session.error.as_deref(), Some("bad"));
        assert!(!session.loading);
    }

    #[test]
    fn test_restart_infinite_scroll_goes_back_to_page_one() {
        let mut session = ResourceSession::new(infinite(), CustomLabels::default(), "");
        let next = session.fields_for_page(4).unwrap();
        session.submit_query_params(next, false);
        session.items.push(json!("old"));

        session.restart_infinite_scroll();
        assert!(session.items.is_empty());
        assert_eq!(session.pagination.as_ref().unwrap().page, 1);
    }

    #[test]
    fn test_visible_items_filters_case_insensitively() {
        let mut session = ResourceSession::new(infinite(), CustomLabels::default(), "");
        session.items = vec![json!({"title": "Red Cat"}), json!({"title": "Blue Dog"})];
        session.filter = "cat".to_string();

        let visible = session.visible_items();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0]["title"], "Red Cat");
    }
}
