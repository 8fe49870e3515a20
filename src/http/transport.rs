//! Transport contract
//!
//! The controller never talks to reqwest directly: it builds a
//! [`FetchRequest`] and hands it to a [`Transport`]. Url templates keep their
//! `:param` tokens until the transport resolves them from the request's raw
//! data.

use crate::resource::fetcher::scalar_to_string;
use crate::resource::{Headers, HttpVerb, InputField, SELECT_PLACEHOLDER};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// How the caller wants the response interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Parse the body as JSON
    Json,
    /// Only report whether the call succeeded
    Boolean,
}

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file_name: String, bytes: Vec<u8> },
}

/// Body that contains file data; sent as multipart/form-data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartPayload {
    pub parts: Vec<FormPart>,
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized JSON text
    Json(String),
    Multipart(MultipartPayload),
}

/// A request as issued by the resource controller
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: HttpVerb,
    /// Url template, possibly with `:param` tokens
    pub orig_url: String,
    /// Record the `:param` tokens are resolved from
    pub raw_data: Option<Value>,
    pub body: Option<RequestBody>,
    pub query_params: Vec<InputField>,
    pub headers: Headers,
    pub response_type: ResponseType,
}

/// Response of a transport call
#[derive(Debug, Clone, PartialEq)]
pub enum TransportResponse {
    Json(Value),
    Success(bool),
}

impl TransportResponse {
    pub fn into_json(self) -> Value {
        match self {
            TransportResponse::Json(value) => value,
            TransportResponse::Success(ok) => Value::Bool(ok),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            TransportResponse::Json(_) => true,
            TransportResponse::Success(ok) => *ok,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Failed to send request: {0}")]
    Request(String),

    #[error("API request failed: {0}")]
    Status(u16),

    #[error("Failed to parse response JSON: {0}")]
    Parse(String),

    #[error("Invalid url: {0}")]
    Url(String),
}

/// Sends requests to the remote API
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<TransportResponse, TransportError>;
}

/// Replace `:param` tokens of `orig_url`.
///
/// Values come from `raw_data` first, then from query params of the same
/// name; query params used this way are not returned. Tokens without a value
/// stay as they are. A token starts with a letter or `_`, so ports such as
/// `:8080` are left alone.
pub fn resolve_url<'a>(
    orig_url: &str,
    raw_data: Option<&Value>,
    query_params: &'a [InputField],
) -> (String, Vec<&'a InputField>) {
    let mut url = String::with_capacity(orig_url.len());
    let mut used: Vec<&str> = Vec::new();
    let mut rest = orig_url;

    while let Some(pos) = rest.find(':') {
        url.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let token_len = token_length(after);

        if token_len == 0 {
            url.push(':');
            rest = after;
            continue;
        }

        let name = &after[..token_len];
        let from_raw = raw_data
            .and_then(|data| data.get(name))
            .and_then(scalar_to_string);
        let value = from_raw.or_else(|| {
            query_params
                .iter()
                .find(|p| p.name == name)
                .map(|p| {
                    used.push(name);
                    p.value.as_query_value()
                })
        });

        match value {
            Some(value) => url.push_str(&urlencoding::encode(&value)),
            None => {
                url.push(':');
                url.push_str(name);
            },
        }
        rest = &after[token_len..];
    }
    url.push_str(rest);

    let remaining = query_params
        .iter()
        .filter(|p| !used.contains(&p.name.as_str()))
        .collect();

    (url, remaining)
}

fn token_length(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// Query pairs worth sending: empty values and unselected dropdowns are skipped
pub fn query_pairs(params: &[&InputField]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|p| (p.name.clone(), p.value.as_query_value()))
        .filter(|(_, value)| !value.is_empty() && value != SELECT_PLACEHOLDER)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FieldType, FieldValue};
    use serde_json::json;

    fn param(name: &str, value: &str) -> InputField {
        InputField::new(name, name, FieldType::Text, FieldValue::text(value))
    }

    #[test]
    fn test_resolve_url_from_raw_data() {
        let (url, rest) = resolve_url("/users/:id/posts/:postId", Some(&json!({"id": 3, "postId": "a b"})), &[]);
        assert_eq!(url, "/users/3/posts/a%20b");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_resolve_url_consumes_query_params() {
        let params = vec![param("org", "acme"), param("q", "x")];
        let (url, rest) = resolve_url("/orgs/:org/items", None, &params);
        assert_eq!(url, "/orgs/acme/items");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "q");
    }

    #[test]
    fn test_resolve_url_keeps_ports_and_unknown_tokens() {
        let (url, _) = resolve_url("http://localhost:8080/users/:id", None, &[]);
        assert_eq!(url, "http://localhost:8080/users/:id");
    }

    #[test]
    fn test_query_pairs_skip_empty_and_placeholder() {
        let a = param("a", "1");
        let b = param("b", "");
        let c = param("c", SELECT_PLACEHOLDER);
        assert_eq!(query_pairs(&[&a, &b, &c]), vec![("a".to_string(), "1".to_string())]);
    }
}
