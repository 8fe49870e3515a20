//! HTTP transport
//!
//! reqwest implementation of [`Transport`].

use super::transport::{
    query_pairs, resolve_url, FetchRequest, FormPart, RequestBody, ResponseType, Transport,
    TransportError, TransportResponse,
};
use crate::resource::{Headers, HttpVerb};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Method};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

fn to_method(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
    }
}

/// HTTP client for the configured REST API
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<String>,
    default_headers: Headers,
}

impl HttpTransport {
    /// Create a new transport. Relative method urls are joined onto `base_url`;
    /// `default_headers` sit under every request's own headers.
    pub fn new(base_url: Option<&str>, default_headers: Headers, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("restui/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.map(|b| b.trim_end_matches('/').to_string()),
            default_headers,
        })
    }

    fn absolute_url(&self, path: &str) -> Result<Url, TransportError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let Some(base) = &self.base_url else {
            return Err(TransportError::Url(format!("{} (no base url configured)", path)));
        };

        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };

        Url::parse(&joined).map_err(|e| TransportError::Url(format!("{}: {}", joined, e)))
    }

    fn build_form(parts: Vec<FormPart>) -> multipart::Form {
        parts.into_iter().fold(multipart::Form::new(), |form, part| match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                file_name,
                bytes,
            } => form.part(name, multipart::Part::bytes(bytes).file_name(file_name)),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<TransportResponse, TransportError> {
        let (path, remaining) = resolve_url(
            &request.orig_url,
            request.raw_data.as_ref(),
            &request.query_params,
        );

        let mut url = self.absolute_url(&path)?;
        let pairs = query_pairs(&remaining);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        tracing::debug!("{} {}", request.method, url);

        let mut builder = self.client.request(to_method(request.method), url);

        let mut headers = self.default_headers.clone();
        headers.extend(request.headers);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Some(RequestBody::Json(text)) => builder.body(text),
            Some(RequestBody::Multipart(payload)) => builder.multipart(Self::build_form(payload.parts)),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(TransportError::Status(status.as_u16()));
        }

        match request.response_type {
            ResponseType::Boolean => Ok(TransportResponse::Success(true)),
            ResponseType::Json if body.trim().is_empty() => Ok(TransportResponse::Json(Value::Null)),
            ResponseType::Json => serde_json::from_str(&body)
                .map(TransportResponse::Json)
                .map_err(|e| TransportError::Parse(e.to_string())),
        }
    }
}

/// Format a transport error for display
pub fn format_transport_error(error: &TransportError) -> String {
    match error {
        TransportError::Status(401) => "Authentication failed. Check the configured request headers.".to_string(),
        TransportError::Status(403) => "Permission denied.".to_string(),
        TransportError::Status(404) => "Resource not found.".to_string(),
        TransportError::Status(409) => "Resource conflict. The resource may already exist or be in use.".to_string(),
        TransportError::Status(429) => "Rate limit exceeded. Please try again later.".to_string(),
        TransportError::Status(400 | 422) => "Invalid request. Check your parameters.".to_string(),
        TransportError::Status(code) if *code >= 500 => {
            "Service temporarily unavailable. Please try again.".to_string()
        },
        TransportError::Status(code) => format!("Request failed with status {}.", code),
        TransportError::Request(_) => "Request failed. Check your network connection and try again.".to_string(),
        TransportError::Parse(_) => "The server returned invalid JSON.".to_string(),
        TransportError::Url(detail) => {
            let sanitized: String = detail.chars().filter(|c| !c.is_control()).take(80).collect();
            format!("Invalid url: {}", sanitized)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: Option<&str>) -> HttpTransport {
        HttpTransport::new(base, Headers::new(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_absolute_url_joins_base() {
        let t = transport(Some("https://api.example.com/v1/"));
        assert_eq!(
            t.absolute_url("/users").unwrap().as_str(),
            "https://api.example.com/v1/users"
        );
        assert_eq!(
            t.absolute_url("users").unwrap().as_str(),
            "https://api.example.com/v1/users"
        );
    }

    #[test]
    fn test_absolute_url_keeps_absolute() {
        let t = transport(Some("https://api.example.com"));
        assert_eq!(
            t.absolute_url("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_relative_url_without_base_fails() {
        let t = transport(None);
        assert!(matches!(t.absolute_url("/users"), Err(TransportError::Url(_))));
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let long = "x".repeat(500);
        let out = sanitize_for_log(&long);
        assert!(out.contains("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }

    #[test]
    fn test_format_transport_error() {
        assert_eq!(format_transport_error(&TransportError::Status(404)), "Resource not found.");
        assert!(format_transport_error(&TransportError::Status(503)).contains("unavailable"));
    }
}
