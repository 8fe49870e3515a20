//! Configuration source
//!
//! The admin configuration comes either from a local file or from a remote
//! object store. Remote stores are selected with the `STORAGE_*` settings
//! and must be fully specified.

use crate::error::ConfigError;
use crate::resource::{AppConfig, Headers};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Provider name of the local file store
pub const LOCAL_PROVIDER: &str = "local";
/// Provider name of the generic HTTP object store
pub const HTTP_PROVIDER: &str = "http";

/// Content type of the `config.js` variant
pub const JS_CONTENT_TYPE: &str = "text/javascript";

/// Storage settings as given on the command line or in the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageArgs {
    pub provider: Option<String>,
    pub path: Option<String>,
    pub container: Option<String>,
    /// JSON object, e.g. `{"endpoint": "https://store.example.com"}`
    pub connection: Option<String>,
}

/// Connection settings of the HTTP object store
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageConnection {
    pub endpoint: String,
    #[serde(default)]
    pub headers: Headers,
}

/// A configured remote store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStore {
    pub provider: String,
    pub container: String,
    pub path: String,
    pub connection: StorageConnection,
}

impl RemoteStore {
    /// `{endpoint}/{container}/{path}`
    pub fn object_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.connection.endpoint.trim_end_matches('/'),
            self.container.trim_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// Script payload served as `config.js`
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptPayload {
    pub content_type: &'static str,
    pub body: String,
}

/// Where the configuration is read from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigStore {
    Local(PathBuf),
    Remote(RemoteStore),
}

impl ConfigStore {
    /// Select the store. `local_path` is used by the local provider.
    pub fn from_args(args: &StorageArgs, local_path: PathBuf) -> Result<Self, ConfigError> {
        let provider = args
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(LOCAL_PROVIDER);

        if provider == LOCAL_PROVIDER {
            return Ok(ConfigStore::Local(local_path));
        }

        let (Some(path), Some(container), Some(connection)) =
            (&args.path, &args.container, &args.connection)
        else {
            return Err(ConfigError::MissingStorageArgs);
        };

        if provider != HTTP_PROVIDER {
            return Err(ConfigError::UnknownProvider(provider.to_string()));
        }

        let connection: StorageConnection = serde_json::from_str(connection)?;

        Ok(ConfigStore::Remote(RemoteStore {
            provider: provider.to_string(),
            container: container.clone(),
            path: path.clone(),
            connection,
        }))
    }

    pub fn describe(&self) -> String {
        match self {
            ConfigStore::Local(path) => path.display().to_string(),
            ConfigStore::Remote(remote) => remote.object_url(),
        }
    }

    fn source_path(&self) -> &str {
        match self {
            ConfigStore::Local(path) => path.to_str().unwrap_or_default(),
            ConfigStore::Remote(remote) => &remote.path,
        }
    }

    /// Raw configuration text
    pub async fn load_raw(&self) -> Result<String, ConfigError> {
        match self {
            ConfigStore::Local(path) => Ok(tokio::fs::read_to_string(path).await?),
            ConfigStore::Remote(remote) => fetch_object(remote).await,
        }
    }

    /// Configuration as a JSON value, whatever the file format
    pub async fn load_value(&self) -> Result<Value, ConfigError> {
        let raw = self.load_raw().await?;
        if is_yaml(self.source_path()) {
            Ok(serde_yaml::from_str(&raw)?)
        } else {
            Ok(serde_json::from_str(&raw)?)
        }
    }

    /// Parsed and validated configuration
    pub async fn load_json(&self) -> Result<AppConfig, ConfigError> {
        let raw = self.load_raw().await?;
        tracing::info!("Loaded configuration from {}", self.describe());
        if is_yaml(self.source_path()) {
            AppConfig::from_yaml_str(&raw)
        } else {
            AppConfig::from_json_str(&raw)
        }
    }

    /// The stored object as a script; remote stores only
    pub async fn load_js(&self) -> Result<ScriptPayload, ConfigError> {
        match self {
            ConfigStore::Local(_) => Err(ConfigError::JsUnavailableLocally),
            ConfigStore::Remote(remote) => Ok(ScriptPayload {
                content_type: JS_CONTENT_TYPE,
                body: fetch_object(remote).await?,
            }),
        }
    }
}

fn is_yaml(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

async fn fetch_object(remote: &RemoteStore) -> Result<String, ConfigError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let url = remote.object_url();
    tracing::debug!("Fetching configuration object {}", url);

    let mut request = client.get(&url);
    for (name, value) in &remote.connection.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::error!("Storage request failed: {} {}", status, url);
        return Err(ConfigError::Storage(format!("{} returned {}", url, status.as_u16())));
    }

    Ok(response.text().await?)
}
