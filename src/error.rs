//! Error types
//!
//! Domain errors raised by the resource controller and the configuration
//! loader. Application plumbing uses `anyhow` on top of these.

use thiserror::Error;

/// Errors raised by resource operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResourceError {
    /// A method or template required by the operation is not configured.
    #[error("{0}")]
    Configuration(String),

    /// The response body does not match the configured `dataPath`.
    #[error("{0}")]
    Extraction(String),

    /// A detail path could not be built for an item.
    #[error("{0}")]
    Navigation(String),

    /// A write operation (update, delete, custom action) failed remotely.
    #[error("{0}")]
    RemoteOperation(String),

    /// A form value could not be turned into a request body.
    #[error("{0}")]
    Input(String),

    /// The transport failed while reading data.
    #[error("Request failed: {0}")]
    Transport(String),
}

impl ResourceError {
    pub fn missing_method(method: &str) -> Self {
        ResourceError::Configuration(format!("{} method is not defined.", method))
    }

    /// Message shown to the user in the error line or a toast
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Valid args not found for storage provider")]
    MissingStorageArgs,

    #[error("Unknown storage provider: {0}")]
    UnknownProvider(String),

    #[error("config.js is only available from a remote store")]
    JsUnavailableLocally,

    #[error("Storage request failed: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_method_names_the_method() {
        let err = ResourceError::missing_method("Put");
        assert_eq!(err.user_message(), "Put method is not defined.");
    }
}
