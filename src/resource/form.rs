//! Form payloads
//!
//! Edit, create and custom-action forms are lists of [`InputField`]s. This
//! module fills them from an item and turns them back into a request body.
//! A `file` field holds a local path; any non-empty file field makes the
//! whole body multipart.

use super::fetcher::extract_data_by_path;
use super::registry::{FieldType, FieldValue, InputField, SELECT_PLACEHOLDER};
use crate::error::ResourceError;
use crate::http::{FormPart, MultipartPayload};
use serde_json::{Map, Value};
use std::path::Path;

/// Body of a write request
#[derive(Debug, Clone, PartialEq)]
pub enum FormPayload {
    Json(Value),
    Multipart(MultipartPayload),
}

impl FormPayload {
    pub fn contains_files(&self) -> bool {
        matches!(self, FormPayload::Multipart(_))
    }
}

/// Copy of `fields` with values taken from `item` where present
pub fn prefill(fields: &[InputField], item: &Value) -> Vec<InputField> {
    fields
        .iter()
        .map(|field| {
            let mut field = field.clone();
            if field.field_type == FieldType::File {
                return field;
            }
            match extract_data_by_path(item, Some(field.item_path())) {
                Some(Value::Null) | None => {},
                Some(value) => field.value = FieldValue::from(value.clone()),
            }
            field
        })
        .collect()
}

fn form_value(field: &InputField) -> FieldValue {
    match &field.value {
        FieldValue::Text(s) if s == SELECT_PLACEHOLDER => FieldValue::default(),
        other => other.clone(),
    }
}

fn has_files(fields: &[InputField]) -> bool {
    fields
        .iter()
        .any(|f| f.field_type == FieldType::File && !f.value.is_empty())
}

/// Build the request body for a submitted form
pub async fn build_payload(fields: &[InputField]) -> Result<FormPayload, ResourceError> {
    if !has_files(fields) {
        let body: Map<String, Value> = fields
            .iter()
            .filter(|f| f.field_type != FieldType::File)
            .map(|f| (f.name.clone(), form_value(f).to_json(f.field_type)))
            .collect();
        return Ok(FormPayload::Json(Value::Object(body)));
    }

    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        if field.field_type != FieldType::File {
            parts.push(FormPart::Text {
                name: field.name.clone(),
                value: form_value(field).as_query_value(),
            });
            continue;
        }

        let path = field.value.as_query_value();
        if path.is_empty() {
            continue;
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            ResourceError::Input(format!("Could not read file {}: {}", path, e))
        })?;
        let file_name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.name.clone());

        tracing::debug!("Attaching {} ({} bytes) as {}", file_name, bytes.len(), field.name);
        parts.push(FormPart::File {
            name: field.name.clone(),
            file_name,
            bytes,
        });
    }

    Ok(FormPayload::Multipart(MultipartPayload { parts }))
}
