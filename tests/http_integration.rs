//! Integration tests for the HTTP transport and the remote config store
//! using wiremock
//!
//! These tests run the real reqwest client against mocked endpoints, from
//! raw transport calls up to a paged resource driven by the controller.

use restui::config_store::{ConfigStore, StorageArgs, JS_CONTENT_TYPE};
use restui::error::ConfigError;
use restui::http::{
    format_transport_error, FetchRequest, HttpTransport, RequestBody, ResponseType, Transport,
    TransportError, TransportResponse,
};
use restui::resource::{
    AppConfig, FieldType, FieldValue, Headers, HttpVerb, InputField, ResourceController,
    ResourceSession, SubmitOutcome, TransformRegistry,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> HttpTransport {
    let mut headers = Headers::new();
    headers.insert("accept".to_string(), "application/json".to_string());
    HttpTransport::new(Some(&server.uri()), headers, Duration::from_secs(5))
        .expect("client should build")
}

fn get(url: &str) -> FetchRequest {
    FetchRequest {
        method: HttpVerb::Get,
        orig_url: url.to_string(),
        raw_data: None,
        body: None,
        query_params: Vec::new(),
        headers: Headers::new(),
        response_type: ResponseType::Json,
    }
}

/// Test module for raw transport calls
mod transport_tests {
    use super::*;

    /// Url tokens come from raw data, leftover query params go to the query string
    #[tokio::test]
    async fn test_get_resolves_url_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/7/posts"))
            .and(query_param("q", "rust"))
            .and(header("accept", "application/json"))
            .and(header("x-tenant", "acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = get("/users/:id/posts");
        request.raw_data = Some(json!({"id": 7}));
        request.query_params = vec![
            InputField::new("q", "Search", FieldType::Text, FieldValue::text("rust")),
            InputField::new("empty", "Empty", FieldType::Text, FieldValue::default()),
        ];
        request.headers.insert("x-tenant".to_string(), "acme".to_string());

        let response = transport(&server).fetch(request).await.expect("request should succeed");
        assert_eq!(response, TransportResponse::Json(json!([{"id": 1}])));
    }

    /// Empty query values are not sent
    #[tokio::test]
    async fn test_empty_query_values_are_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut request = get("/posts");
        request.query_params = vec![InputField::new(
            "userId",
            "User",
            FieldType::Select,
            FieldValue::text("-- Select --"),
        )];
        transport(&server).fetch(request).await.expect("request should succeed");

        let received = server.received_requests().await.expect("recording is on");
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].url.query(), None);
    }

    /// Test 404 maps to a status error with a friendly message
    #[tokio::test]
    async fn test_404_returns_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/99"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let error = transport(&server)
            .fetch(get("/users/99"))
            .await
            .expect_err("404 should fail");
        assert_eq!(error, TransportError::Status(404));
        assert_eq!(format_transport_error(&error), "Resource not found.");
    }

    /// Boolean responses only report success, whatever the body
    #[tokio::test]
    async fn test_boolean_response_ignores_body() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/users/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let mut request = get("/users/:id");
        request.method = HttpVerb::Delete;
        request.raw_data = Some(json!({"id": 3}));
        request.response_type = ResponseType::Boolean;

        let response = transport(&server).fetch(request).await.expect("delete should succeed");
        assert_eq!(response, TransportResponse::Success(true));
    }

    /// JSON bodies are sent as given
    #[tokio::test]
    async fn test_json_body_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/users/1"))
            .and(body_json(json!({"name": "Leanne"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Leanne"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = get("/users/1");
        request.method = HttpVerb::Patch;
        request.body = Some(RequestBody::Json(json!({"name": "Leanne"}).to_string()));
        request.headers.insert("content-type".to_string(), "application/json".to_string());

        let response = transport(&server).fetch(request).await.expect("patch should succeed");
        assert_eq!(response.into_json()["name"], "Leanne");
    }

    /// Malformed JSON is a parse error
    #[tokio::test]
    async fn test_malformed_json_returns_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let error = transport(&server)
            .fetch(get("/broken"))
            .await
            .expect_err("parse should fail");
        assert!(matches!(error, TransportError::Parse(_)));
    }

    /// Relative urls need a base url
    #[tokio::test]
    async fn test_relative_url_without_base_fails() {
        let transport = HttpTransport::new(None, Headers::new(), Duration::from_secs(5))
            .expect("client should build");
        let error = transport.fetch(get("/users")).await.expect_err("no base url");
        assert!(matches!(error, TransportError::Url(_)));
    }
}

/// A paged resource driven end to end through the controller
mod controller_tests {
    use super::*;

    fn paged_config(base_url: &str) -> AppConfig {
        let raw = json!({
            "name": "Shop",
            "baseUrl": base_url,
            "pages": [{
                "id": "orders",
                "name": "Orders",
                "methods": {
                    "getAll": {
                        "url": "/orders",
                        "dataPath": "data",
                        "pagination": {
                            "type": "paged",
                            "params": {
                                "page": { "name": "page" },
                                "limit": { "name": "limit", "value": "2" }
                            },
                            "fields": { "total": { "dataPath": "meta.total" } }
                        }
                    }
                }
            }]
        });
        AppConfig::from_json_str(&raw.to_string()).expect("config should validate")
    }

    async fn mount_page(server: &MockServer, page: &str, ids: [u64; 2]) {
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("page", page))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": ids[0]}, {"id": ids[1]}],
                "meta": {"total": 4}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_paged_list_and_next_page() {
        let server = MockServer::start().await;
        mount_page(&server, "1", [1, 2]).await;
        mount_page(&server, "2", [3, 4]).await;

        let config = paged_config(&server.uri());
        let resource = config.page("orders").expect("page exists");
        let mut session = ResourceSession::new(
            Arc::new(resource.clone()),
            config.labels_for(resource),
            "",
        );

        let http = transport(&server);
        let transforms = TransformRegistry::with_builtins();
        let controller = ResourceController::new(&http, &transforms);

        controller.fetch_all(&mut session).await.expect("first page loads");
        assert_eq!(session.items.len(), 2);
        let state = session.pagination.clone().expect("paged");
        assert_eq!(state.total, Some(4));
        assert!(state.has_next_page);
        assert!(!state.has_previous_page);

        let outcome = controller.next_page(&mut session).await.expect("second page loads");
        assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
        assert_eq!(session.items[0]["id"], 3);
        assert_eq!(session.query_string(), "?page=2&limit=2");

        let state = session.pagination.clone().expect("paged");
        assert!(!state.has_next_page);

        // Last page: next is ignored without a request
        let before = server.received_requests().await.expect("recording is on").len();
        let outcome = controller.next_page(&mut session).await.expect("no error");
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(server.received_requests().await.expect("recording is on").len(), before);
    }

    #[tokio::test]
    async fn test_server_error_is_recorded_on_session() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = paged_config(&server.uri());
        let resource = config.page("orders").expect("page exists");
        let mut session = ResourceSession::new(Arc::new(resource.clone()), config.labels_for(resource), "");

        let http = transport(&server);
        let transforms = TransformRegistry::with_builtins();
        let result = ResourceController::new(&http, &transforms).fetch_all(&mut session).await;

        assert!(result.is_err());
        assert!(session.error.is_some());
        assert!(!session.loading);
    }
}

/// Remote configuration store
mod config_store_tests {
    use super::*;

    fn remote_store(server: &MockServer, file: &str) -> ConfigStore {
        let args = StorageArgs {
            provider: Some("http".to_string()),
            path: Some(file.to_string()),
            container: Some("admin".to_string()),
            connection: Some(
                json!({"endpoint": server.uri(), "headers": {"x-api-key": "secret"}}).to_string(),
            ),
        };
        ConfigStore::from_args(&args, PathBuf::new()).expect("remote store")
    }

    #[tokio::test]
    async fn test_load_json_from_remote_store() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/config.json"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Remote admin",
                "pages": [{"id": "users", "name": "Users", "methods": {"getAll": {"url": "/users"}}}]
            })))
            .mount(&server)
            .await;

        let config = remote_store(&server, "config.json")
            .load_json()
            .await
            .expect("config should load");
        assert_eq!(config.name, "Remote admin");
        assert_eq!(config.page_ids(), vec!["users"]);
    }

    #[tokio::test]
    async fn test_load_js_from_remote_store() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/config.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("window.config = {};"))
            .mount(&server)
            .await;

        let script = remote_store(&server, "config.js")
            .load_js()
            .await
            .expect("script should load");
        assert_eq!(script.content_type, JS_CONTENT_TYPE);
        assert_eq!(script.body, "window.config = {};");
    }

    #[tokio::test]
    async fn test_remote_store_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/config.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = remote_store(&server, "config.json").load_json().await;
        assert!(matches!(result, Err(ConfigError::Storage(_))));
    }
}
