//! Resource controller
//!
//! Async operations of a resource view: list loading, single-item fetch and
//! the write operations (create, update, delete, custom actions). The
//! controller borrows a [`Transport`] and the transform registry; all view
//! state stays in the [`ResourceSession`] passed in.

use super::fetcher::{extract_data_by_path, sort_items};
use super::form::FormPayload;
use super::pagination::parse_total;
use super::registry::{CustomAction, GetAllMethod, Headers, HttpVerb, ResourceConfig};
use super::session::{FetchTicket, FetchedPage, ResourceSession, SubmitOutcome};
use super::transform::TransformRegistry;
use super::InputField;
use crate::error::ResourceError;
use crate::http::{
    format_transport_error, FetchRequest, RequestBody, ResponseType, Transport, TransportError,
};
use serde_json::Value;

/// Prompt shown before an item is deleted
pub const DELETE_CONFIRM_MESSAGE: &str = "Are you sure you want to delete this item?";

/// Answer to the delete prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Approved,
    Declined,
}

/// Result of [`ResourceController::delete_item`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Merge header maps; later maps win
pub fn merge_headers(layers: &[&Headers]) -> Headers {
    layers.iter().fold(Headers::new(), |mut merged, layer| {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    })
}

fn transport_failure(error: TransportError) -> ResourceError {
    ResourceError::Transport(format_transport_error(&error))
}

fn remote_failure(error: TransportError) -> ResourceError {
    ResourceError::RemoteOperation(format_transport_error(&error))
}

/// Write request with a JSON or multipart body
fn write_request(
    method: HttpVerb,
    url: &str,
    raw_data: Option<Value>,
    payload: FormPayload,
    mut headers: Headers,
) -> FetchRequest {
    let body = match payload {
        FormPayload::Json(value) => {
            headers.insert("content-type".to_string(), "application/json".to_string());
            RequestBody::Json(value.to_string())
        },
        FormPayload::Multipart(multipart) => {
            headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
            RequestBody::Multipart(multipart)
        },
    };

    FetchRequest {
        method,
        orig_url: url.to_string(),
        raw_data,
        body: Some(body),
        query_params: Vec::new(),
        headers,
        response_type: ResponseType::Boolean,
    }
}

/// Runs resource operations against a transport
pub struct ResourceController<'a, T: Transport + ?Sized> {
    transport: &'a T,
    transforms: &'a TransformRegistry,
}

impl<'a, T: Transport + ?Sized> ResourceController<'a, T> {
    pub fn new(transport: &'a T, transforms: &'a TransformRegistry) -> Self {
        Self {
            transport,
            transforms,
        }
    }

    /// Load the item list for the session's current query fields.
    ///
    /// A failed load is recorded in the session error and also returned.
    pub async fn fetch_all(&self, session: &mut ResourceSession) -> Result<(), ResourceError> {
        let resource = session.resource_arc();
        let Some(get_all) = resource.methods.get_all.as_ref() else {
            let error = ResourceError::missing_method("Get all");
            session.error = Some(error.user_message());
            return Err(error);
        };

        let ticket = session.begin_fetch();
        let result = self.load_page(&resource, get_all, &ticket).await;
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        session.finish_fetch(&ticket, result);
        outcome
    }

    async fn load_page(
        &self,
        resource: &ResourceConfig,
        get_all: &GetAllMethod,
        ticket: &FetchTicket,
    ) -> Result<FetchedPage, ResourceError> {
        let request = FetchRequest {
            method: get_all.verb(),
            orig_url: get_all.url.clone(),
            raw_data: ticket.path_vars.clone(),
            body: None,
            query_params: ticket.query_params.clone(),
            headers: merge_headers(&[&resource.request_headers, &get_all.request_headers]),
            response_type: ResponseType::Json,
        };

        let body = self
            .transport
            .fetch(request)
            .await
            .map_err(transport_failure)?
            .into_json();

        let extracted = match extract_data_by_path(&body, get_all.data_path.as_deref()) {
            None | Some(Value::Null) => {
                return Err(ResourceError::Extraction(
                    "Could not extract data from response.".to_string(),
                ))
            },
            Some(value) => value,
        };

        let Value::Array(items) = extracted.clone() else {
            return Err(ResourceError::Extraction("Extracted data is invalid.".to_string()));
        };

        let mut items = match &get_all.data_transform {
            Some(name) => self.transforms.apply(name, items).await?,
            None => items,
        };

        if let Some(sort_by) = &get_all.sort_by {
            sort_items(&mut items, &sort_by.keys());
        }

        let total = get_all
            .pagination
            .as_ref()
            .and_then(|p| p.fields.total.as_ref())
            .and_then(|t| extract_data_by_path(&body, Some(&t.data_path)))
            .and_then(parse_total);

        tracing::debug!(
            "Loaded {} items for {} (total: {:?})",
            items.len(),
            resource.id,
            total
        );

        Ok(FetchedPage { items, total })
    }

    /// Fetch one item through `getSingle`
    pub async fn fetch_single(
        &self,
        session: &ResourceSession,
        raw_data: &Value,
    ) -> Result<Value, ResourceError> {
        let resource = session.resource();
        let get_single = resource
            .methods
            .get_single
            .as_ref()
            .ok_or_else(|| ResourceError::missing_method("Get single"))?;

        let request = FetchRequest {
            method: get_single.actual_method.unwrap_or(HttpVerb::Get),
            orig_url: get_single.url.clone(),
            raw_data: Some(raw_data.clone()),
            body: None,
            query_params: Vec::new(),
            headers: merge_headers(&[&resource.request_headers, &get_single.request_headers]),
            response_type: ResponseType::Json,
        };

        let body = self
            .transport
            .fetch(request)
            .await
            .map_err(transport_failure)?
            .into_json();

        extract_data_by_path(&body, get_single.data_path.as_deref())
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                ResourceError::Extraction("Could not extract data from response.".to_string())
            })
    }

    /// Create an item through `post`
    pub async fn create_item(
        &self,
        session: &ResourceSession,
        payload: FormPayload,
    ) -> Result<bool, ResourceError> {
        let resource = session.resource();
        let post = resource
            .methods
            .post
            .as_ref()
            .ok_or_else(|| ResourceError::missing_method("Post"))?;

        let request = write_request(
            post.actual_method.unwrap_or(HttpVerb::Post),
            &post.url,
            session.path_vars.clone(),
            payload,
            merge_headers(&[&resource.request_headers, &post.request_headers]),
        );

        let response = self.transport.fetch(request).await.map_err(remote_failure)?;
        Ok(response.is_success())
    }

    /// Update an item through `put`. Url tokens resolve from `original_item`.
    pub async fn update_item(
        &self,
        session: &ResourceSession,
        payload: FormPayload,
        original_item: &Value,
    ) -> Result<bool, ResourceError> {
        let resource = session.resource();
        let put = resource
            .methods
            .put
            .as_ref()
            .ok_or_else(|| ResourceError::missing_method("Put"))?;

        let request = write_request(
            put.actual_method.unwrap_or(HttpVerb::Put),
            &put.url,
            Some(original_item.clone()),
            payload,
            merge_headers(&[&resource.request_headers, &put.request_headers]),
        );

        let response = self.transport.fetch(request).await.map_err(remote_failure)?;
        Ok(response.is_success())
    }

    /// Delete an item after confirmation, then refresh the list
    pub async fn delete_item(
        &self,
        session: &mut ResourceSession,
        item: &Value,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, ResourceError> {
        if confirmation == Confirmation::Declined {
            return Ok(DeleteOutcome::Cancelled);
        }

        let resource = session.resource_arc();
        let delete = resource
            .methods
            .delete
            .as_ref()
            .ok_or_else(|| ResourceError::missing_method("Delete"))?;

        let request = FetchRequest {
            method: delete.actual_method.unwrap_or(HttpVerb::Delete),
            orig_url: delete.url.clone(),
            raw_data: Some(item.clone()),
            body: None,
            query_params: Vec::new(),
            headers: merge_headers(&[&resource.request_headers, &delete.request_headers]),
            response_type: ResponseType::Boolean,
        };

        let response = self.transport.fetch(request).await.map_err(remote_failure)?;
        if !response.is_success() {
            return Err(ResourceError::RemoteOperation(
                "The item was not deleted.".to_string(),
            ));
        }

        tracing::info!("Deleted item from {}", resource.id);
        if let Err(e) = self.refresh(session).await {
            tracing::warn!("Refresh after delete failed: {}", e);
        }

        Ok(DeleteOutcome::Deleted)
    }

    /// Run a custom action on an item. No refresh follows.
    pub async fn perform_custom_action(
        &self,
        session: &ResourceSession,
        payload: FormPayload,
        item: &Value,
        action: &CustomAction,
    ) -> Result<bool, ResourceError> {
        let resource = session.resource();
        tracing::debug!("Running custom action '{}' on {}", action.name, resource.id);

        let request = write_request(
            action.actual_method.unwrap_or(HttpVerb::Put),
            &action.url,
            Some(item.clone()),
            payload,
            merge_headers(&[&resource.request_headers, &action.request_headers]),
        );

        let response = self.transport.fetch(request).await.map_err(remote_failure)?;
        Ok(response.is_success())
    }

    /// Reload the list. Infinite scroll starts over from the first page.
    pub async fn refresh(&self, session: &mut ResourceSession) -> Result<(), ResourceError> {
        if session.is_infinite_scroll() {
            session.restart_infinite_scroll();
        }
        self.fetch_all(session).await
    }

    /// Submit query fields and load the matching list.
    ///
    /// When the fetch fails the previous fields, pagination and items are
    /// put back, so the location keeps matching what is shown.
    pub async fn submit_query_params(
        &self,
        session: &mut ResourceSession,
        updated: Vec<InputField>,
        reset: bool,
    ) -> Result<SubmitOutcome, ResourceError> {
        let snapshot = session.snapshot_query(reset);
        let outcome = session.submit_query_params(updated, reset);
        if matches!(outcome, SubmitOutcome::Submitted { .. }) {
            if let Err(e) = self.fetch_all(session).await {
                session.restore_query(snapshot);
                return Err(e);
            }
        }
        Ok(outcome)
    }

    /// Go to the next page; ignored when the last page is showing
    pub async fn next_page(&self, session: &mut ResourceSession) -> Result<SubmitOutcome, ResourceError> {
        let Some(state) = session.pagination.as_ref() else {
            return Ok(SubmitOutcome::Ignored);
        };
        if !state.has_next_page {
            return Ok(SubmitOutcome::Ignored);
        }

        let next = state.next_page();
        match session.fields_for_page(next) {
            Some(fields) => self.submit_query_params(session, fields, false).await,
            None => Ok(SubmitOutcome::Ignored),
        }
    }

    /// Go to the previous page; a no-op on the first page
    pub async fn previous_page(
        &self,
        session: &mut ResourceSession,
    ) -> Result<SubmitOutcome, ResourceError> {
        let Some(previous) = session.pagination.as_ref().and_then(|s| s.previous_page()) else {
            return Ok(SubmitOutcome::Ignored);
        };

        match session.fields_for_page(previous) {
            Some(fields) => self.submit_query_params(session, fields, false).await,
            None => Ok(SubmitOutcome::Ignored),
        }
    }

    /// Append the next page of an infinite-scroll list
    pub async fn load_more(&self, session: &mut ResourceSession) -> Result<SubmitOutcome, ResourceError> {
        if !session.is_infinite_scroll() {
            return Ok(SubmitOutcome::Ignored);
        }
        self.next_page(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MultipartPayload, TransportResponse};
    use crate::resource::registry::CustomLabels;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Transport that records requests and replays canned responses
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<FetchRequest>>,
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    }

    impl RecordingTransport {
        fn with(responses: Vec<Result<TransportResponse, TransportError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn fetch(&self, request: FetchRequest) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(TransportResponse::Json(json!([]))))
        }
    }

    fn session(value: Value) -> ResourceSession {
        let resource: ResourceConfig = serde_json::from_value(value).unwrap();
        ResourceSession::new(Arc::new(resource), CustomLabels::default(), "")
    }

    fn users() -> ResourceSession {
        session(json!({
            "id": "users",
            "name": "Users",
            "requestHeaders": { "x-page": "users", "x-shared": "page" },
            "methods": {
                "getAll": {
                    "url": "/users",
                    "dataPath": "data.items",
                    "sortBy": "name",
                    "requestHeaders": { "x-list": "1" },
                    "pagination": {
                        "type": "paged",
                        "params": { "page": { "name": "p" } },
                        "fields": { "total": { "dataPath": "data.total" } }
                    }
                },
                "put": { "url": "/users/:id", "requestHeaders": { "x-shared": "put" } },
                "delete": { "url": "/users/:id" }
            },
            "customActions": [
                { "name": "Disable", "url": "/users/:id/disable", "actualMethod": "post",
                  "requestHeaders": { "x-shared": "action" } }
            ]
        }))
    }

    fn list(items: Value, total: u64) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse::Json(json!({ "data": { "items": items, "total": total } })))
    }

    #[tokio::test]
    async fn test_fetch_all_extracts_sorts_and_counts() {
        let transport = RecordingTransport::with(vec![list(json!([{"name": "b"}, {"name": "a"}]), 25)]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();

        controller.fetch_all(&mut session).await.unwrap();

        assert_eq!(session.items, vec![json!({"name": "a"}), json!({"name": "b"})]);
        let state = session.pagination.as_ref().unwrap();
        assert_eq!(state.total, Some(25));
        assert!(state.has_next_page);
        assert!(!session.loading);

        let request = &transport.requests()[0];
        assert_eq!(request.headers.get("x-page").map(String::as_str), Some("users"));
        assert_eq!(request.headers.get("x-list").map(String::as_str), Some("1"));
        assert!(request.query_params.iter().any(|p| p.name == "p"));
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_non_array_data() {
        let transport = RecordingTransport::with(vec![Ok(TransportResponse::Json(
            json!({"data": {"items": {"not": "a list"}}}),
        ))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();

        let result = controller.fetch_all(&mut session).await;
        assert_eq!(
            result,
            Err(ResourceError::Extraction("Extracted data is invalid.".to_string()))
        );
        assert_eq!(session.error.as_deref(), Some("Extracted data is invalid."));
    }

    #[tokio::test]
    async fn test_fetch_all_missing_path_is_extraction_error() {
        let transport = RecordingTransport::with(vec![Ok(TransportResponse::Json(json!({"other": 1})))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();

        let result = controller.fetch_all(&mut session).await;
        assert_eq!(
            result,
            Err(ResourceError::Extraction("Could not extract data from response.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_all_without_get_all_is_configuration_error() {
        let transport = RecordingTransport::default();
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = session(json!({"id": "x", "name": "X"}));

        let result = controller.fetch_all(&mut session).await;
        assert!(matches!(result, Err(ResourceError::Configuration(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_put_never_calls_transport() {
        let transport = RecordingTransport::default();
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let session = session(json!({"id": "x", "name": "X", "methods": {"getAll": {"url": "/x"}}}));

        let result = controller
            .update_item(&session, FormPayload::Json(json!({})), &json!({"id": 1}))
            .await;
        assert_eq!(result, Err(ResourceError::missing_method("Put")));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_headers_and_body() {
        let transport = RecordingTransport::with(vec![Ok(TransportResponse::Success(true))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let session = users();

        let ok = controller
            .update_item(&session, FormPayload::Json(json!({"name": "z"})), &json!({"id": 7}))
            .await
            .unwrap();
        assert!(ok);

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpVerb::Put);
        assert_eq!(request.raw_data, Some(json!({"id": 7})));
        assert_eq!(request.headers.get("x-shared").map(String::as_str), Some("put"));
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body, Some(RequestBody::Json(r#"{"name":"z"}"#.to_string())));
    }

    #[tokio::test]
    async fn test_create_posts_to_configured_url() {
        let transport = RecordingTransport::with(vec![Ok(TransportResponse::Success(true))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let session = session(json!({
            "id": "posts",
            "name": "Posts",
            "requestHeaders": { "x-page": "posts" },
            "methods": { "post": { "url": "/posts" } }
        }));

        let ok = controller
            .create_item(&session, FormPayload::Json(json!({"title": "hello"})))
            .await
            .unwrap();
        assert!(ok);

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpVerb::Post);
        assert_eq!(request.orig_url, "/posts");
        assert_eq!(request.headers.get("x-page").map(String::as_str), Some("posts"));
        assert_eq!(request.body, Some(RequestBody::Json(r#"{"title":"hello"}"#.to_string())));
    }

    #[tokio::test]
    async fn test_create_without_post_is_configuration_error() {
        let transport = RecordingTransport::default();
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);

        let result = controller
            .create_item(&users(), FormPayload::Json(json!({})))
            .await;
        assert_eq!(result, Err(ResourceError::missing_method("Post")));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_update_leaves_content_type_to_transport() {
        let transport = RecordingTransport::with(vec![Ok(TransportResponse::Success(true))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let session = users();

        controller
            .update_item(
                &session,
                FormPayload::Multipart(MultipartPayload::default()),
                &json!({"id": 7}),
            )
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert!(!request.headers.contains_key("content-type"));
        assert!(matches!(request.body, Some(RequestBody::Multipart(_))));
    }

    #[tokio::test]
    async fn test_declined_delete_does_nothing() {
        let transport = RecordingTransport::default();
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();
        session.items = vec![json!({"id": 1})];

        let outcome = controller
            .delete_item(&mut session, &json!({"id": 1}), Confirmation::Declined)
            .await
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert!(transport.requests().is_empty());
        assert_eq!(session.items, vec![json!({"id": 1})]);
    }

    #[tokio::test]
    async fn test_approved_delete_refreshes_list() {
        let transport = RecordingTransport::with(vec![
            Ok(TransportResponse::Success(true)),
            list(json!([{"name": "left"}]), 1),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();

        let outcome = controller
            .delete_item(&mut session, &json!({"id": 1}), Confirmation::Approved)
            .await
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, HttpVerb::Delete);
        assert_eq!(requests[0].response_type, ResponseType::Boolean);
        assert_eq!(session.items, vec![json!({"name": "left"})]);
    }

    #[tokio::test]
    async fn test_failed_delete_is_remote_error() {
        let transport = RecordingTransport::with(vec![Err(TransportError::Status(500))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();

        let result = controller
            .delete_item(&mut session, &json!({"id": 1}), Confirmation::Approved)
            .await;
        assert!(matches!(result, Err(ResourceError::RemoteOperation(_))));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_action_headers_override_page_headers() {
        let transport = RecordingTransport::with(vec![Ok(TransportResponse::Success(true))]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let session = users();
        let action = session.resource().custom_actions[0].clone();

        controller
            .perform_custom_action(&session, FormPayload::Json(json!({})), &json!({"id": 3}), &action)
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpVerb::Post);
        assert_eq!(request.orig_url, "/users/:id/disable");
        assert_eq!(request.headers.get("x-shared").map(String::as_str), Some("action"));
        assert_eq!(request.headers.get("x-page").map(String::as_str), Some("users"));
    }

    #[tokio::test]
    async fn test_previous_page_on_first_page_is_ignored() {
        let transport = RecordingTransport::default();
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();

        let outcome = controller.previous_page(&mut session).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(session.pagination.as_ref().unwrap().page, 1);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_next_page_updates_location_and_fetches() {
        let transport = RecordingTransport::with(vec![
            list(json!([{"name": "a"}]), 30),
            list(json!([{"name": "k"}]), 30),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();
        controller.fetch_all(&mut session).await.unwrap();

        let outcome = controller.next_page(&mut session).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Submitted {
                query_string: "?p=2".to_string()
            }
        );
        assert_eq!(session.pagination.as_ref().unwrap().page, 2);
        assert_eq!(session.items, vec![json!({"name": "k"})]);
    }

    #[tokio::test]
    async fn test_load_more_appends_for_infinite_scroll() {
        let transport = RecordingTransport::with(vec![
            Ok(TransportResponse::Json(json!([1, 2]))),
            Ok(TransportResponse::Json(json!([3]))),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = session(json!({
            "id": "photos",
            "name": "Photos",
            "methods": { "getAll": {
                "url": "/photos",
                "pagination": { "type": "infinite-scroll", "params": { "limit": { "value": "2" } } }
            }}
        }));

        controller.fetch_all(&mut session).await.unwrap();
        let outcome = controller.load_more(&mut session).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Submitted { query_string: String::new() });
        assert_eq!(session.items, vec![json!(1), json!(2), json!(3)]);
        let second = &transport.requests()[1];
        let page = second.query_params.iter().find(|p| p.name == "page").unwrap();
        assert_eq!(page.value.as_query_value(), "2");
    }

    #[tokio::test]
    async fn test_failed_next_page_keeps_page_and_query() {
        let transport = RecordingTransport::with(vec![
            list(json!([{"name": "a"}]), 30),
            Err(TransportError::Status(500)),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();
        controller.fetch_all(&mut session).await.unwrap();

        let result = controller.next_page(&mut session).await;
        assert!(matches!(result, Err(ResourceError::Transport(_))));
        assert_eq!(session.pagination.as_ref().unwrap().page, 1);
        assert_eq!(session.query_string(), "?p=1");
        assert_eq!(session.items, vec![json!({"name": "a"})]);
        assert!(session.error.is_some());
        assert!(!session.loading);
    }

    #[tokio::test]
    async fn test_failed_load_more_retries_same_page() {
        let transport = RecordingTransport::with(vec![
            Ok(TransportResponse::Json(json!([1, 2]))),
            Err(TransportError::Request("connection reset".to_string())),
            Ok(TransportResponse::Json(json!([3]))),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = session(json!({
            "id": "photos",
            "name": "Photos",
            "methods": { "getAll": {
                "url": "/photos",
                "pagination": { "type": "infinite-scroll", "params": { "limit": { "value": "2" } } }
            }}
        }));
        controller.fetch_all(&mut session).await.unwrap();

        assert!(controller.load_more(&mut session).await.is_err());
        assert_eq!(session.pagination.as_ref().unwrap().page, 1);
        assert_eq!(session.items, vec![json!(1), json!(2)]);

        controller.load_more(&mut session).await.unwrap();
        assert_eq!(session.items, vec![json!(1), json!(2), json!(3)]);

        let page_of = |request: &FetchRequest| {
            let page = request.query_params.iter().find(|p| p.name == "page").unwrap();
            page.value.as_query_value()
        };
        let requests = transport.requests();
        assert_eq!(page_of(&requests[1]), "2");
        assert_eq!(page_of(&requests[2]), "2");
    }

    #[tokio::test]
    async fn test_failed_reset_submit_restores_items() {
        let transport = RecordingTransport::with(vec![
            list(json!([{"name": "a"}]), 1),
            Err(TransportError::Status(503)),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();
        controller.fetch_all(&mut session).await.unwrap();
        let before = session.query_params.clone();

        let updated = session.fields_for_page(3).unwrap();
        assert!(controller.submit_query_params(&mut session, updated, true).await.is_err());
        assert_eq!(session.query_params, before);
        assert_eq!(session.items, vec![json!({"name": "a"})]);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_items() {
        let transport = RecordingTransport::with(vec![
            list(json!([{"name": "a"}]), 1),
            Err(TransportError::Request("connection reset".to_string())),
        ]);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&transport, &transforms);
        let mut session = users();
        controller.fetch_all(&mut session).await.unwrap();

        let result = controller.refresh(&mut session).await;
        assert!(matches!(result, Err(ResourceError::Transport(_))));
        assert_eq!(session.items, vec![json!({"name": "a"})]);
        assert!(session.error.is_some());
    }
}
