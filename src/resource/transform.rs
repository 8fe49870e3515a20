//! Data transforms
//!
//! A `getAll` method may name a transform that rewrites the extracted item
//! list before it is sorted. Transforms are async so they can consult other
//! services; the built-in ones are plain list rewrites.

use super::fetcher::extract_data_by_path;
use crate::error::ResourceError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix of the parameterized `pick:<path>` transform
const PICK_PREFIX: &str = "pick:";

#[async_trait]
pub trait DataTransform: Send + Sync {
    async fn transform(&self, items: Vec<Value>) -> Result<Vec<Value>, ResourceError>;
}

/// Reverse the list
struct Reverse;

#[async_trait]
impl DataTransform for Reverse {
    async fn transform(&self, mut items: Vec<Value>) -> Result<Vec<Value>, ResourceError> {
        items.reverse();
        Ok(items)
    }
}

/// Drop null entries
struct Compact;

#[async_trait]
impl DataTransform for Compact {
    async fn transform(&self, items: Vec<Value>) -> Result<Vec<Value>, ResourceError> {
        Ok(items.into_iter().filter(|v| !v.is_null()).collect())
    }
}

/// Replace each item by the value at a path (`pick:attributes`)
struct Pick {
    path: String,
}

#[async_trait]
impl DataTransform for Pick {
    async fn transform(&self, items: Vec<Value>) -> Result<Vec<Value>, ResourceError> {
        items
            .iter()
            .map(|item| {
                extract_data_by_path(item, Some(&self.path))
                    .cloned()
                    .ok_or_else(|| {
                        ResourceError::Extraction(format!(
                            "Transform could not find '{}' in an item.",
                            self.path
                        ))
                    })
            })
            .collect()
    }
}

/// Named transforms available to the configuration
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn DataTransform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `reverse`, `compact` and `pick:<path>`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("reverse", Reverse);
        registry.register("compact", Compact);
        registry
    }

    pub fn register(&mut self, name: &str, transform: impl DataTransform + 'static) {
        self.transforms.insert(name.to_string(), Arc::new(transform));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataTransform>> {
        if let Some(transform) = self.transforms.get(name) {
            return Some(transform.clone());
        }

        name.strip_prefix(PICK_PREFIX)
            .filter(|path| !path.is_empty())
            .map(|path| Arc::new(Pick { path: path.to_string() }) as Arc<dyn DataTransform>)
    }

    /// Apply the named transform
    pub async fn apply(&self, name: &str, items: Vec<Value>) -> Result<Vec<Value>, ResourceError> {
        let transform = self.get(name).ok_or_else(|| {
            ResourceError::Configuration(format!("Data transform '{}' is not registered.", name))
        })?;
        tracing::debug!("Applying data transform '{}' to {} items", name, items.len());
        transform.transform(items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reverse_transform() {
        let registry = TransformRegistry::with_builtins();
        let out = tokio_test::block_on(registry.apply("reverse", vec![json!(1), json!(2)])).unwrap();
        assert_eq!(out, vec![json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn test_pick_transform() {
        let registry = TransformRegistry::with_builtins();
        let items = vec![json!({"attributes": {"id": 1}}), json!({"attributes": {"id": 2}})];
        let out = registry.apply("pick:attributes", items).await.unwrap();
        assert_eq!(out, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn test_compact_transform() {
        let registry = TransformRegistry::with_builtins();
        let out = registry.apply("compact", vec![json!(1), json!(null)]).await.unwrap();
        assert_eq!(out, vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_unknown_transform_is_a_configuration_error() {
        let registry = TransformRegistry::with_builtins();
        let result = registry.apply("nope", vec![]).await;
        assert!(matches!(result, Err(ResourceError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_custom_async_transform() {
        struct Tag;

        #[async_trait]
        impl DataTransform for Tag {
            async fn transform(&self, items: Vec<Value>) -> Result<Vec<Value>, ResourceError> {
                tokio::task::yield_now().await;
                Ok(items.into_iter().map(|v| json!({ "wrapped": v })).collect())
            }
        }

        let mut registry = TransformRegistry::new();
        registry.register("tag", Tag);
        let out = registry.apply("tag", vec![json!(1)]).await.unwrap();
        assert_eq!(out, vec![json!({"wrapped": 1})]);
    }
}
