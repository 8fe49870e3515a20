//! Resource Registry - Load resource definitions from JSON
//!
//! This module holds the typed configuration model (pages, methods, fields,
//! pagination) and validates it once after loading, so the rest of the
//! application only ever sees well-formed definitions.

use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Embedded demo configuration (compiled into the binary)
pub const DEMO_CONFIG: &str = include_str!("../resources/demo.json");

/// Request headers, merged from app, resource and method level
pub type Headers = BTreeMap<String, String>;

/// Placeholder value of an unselected dropdown
pub const SELECT_PLACEHOLDER: &str = "-- Select --";

/// HTTP verb used for a configured method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    Text,
    LongText,
    Number,
    Boolean,
    Select,
    File,
    Object,
    Array,
    #[serde(other)]
    Other,
}

/// Value of an input field or query parameter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Value as it appears in a query string (before encoding)
    pub fn as_query_value(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => s == "true",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }

    /// JSON value used when the field is part of a request body
    pub fn to_json(&self, field_type: FieldType) -> Value {
        match (self, field_type) {
            (FieldValue::Bool(b), _) => Value::Bool(*b),
            (FieldValue::Text(s), FieldType::Boolean) => Value::Bool(s == "true"),
            (FieldValue::Text(s), FieldType::Number) => s
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<f64>().map(Value::from))
                .unwrap_or_else(|_| Value::String(s.clone())),
            (FieldValue::Text(s), FieldType::Object | FieldType::Array) => {
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
            },
            (FieldValue::Text(s), _) => Value::String(s.clone()),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => FieldValue::Bool(b),
            Value::String(s) => FieldValue::Text(s),
            Value::Null => FieldValue::Text(String::new()),
            Value::Number(n) => FieldValue::Text(n.to_string()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_query_value())
    }
}

/// Option of a select field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SelectOption {
    Plain(String),
    Labeled { display: String, value: Value },
}

impl SelectOption {
    pub fn value(&self) -> FieldValue {
        match self {
            SelectOption::Plain(s) => FieldValue::text(s.clone()),
            SelectOption::Labeled { value, .. } => FieldValue::from(value.clone()),
        }
    }
}

/// Query parameter, form field or display column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// Display fields only: included in the client-side filter
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub readonly: bool,
    /// Display fields only: dot path into the item (defaults to `name`)
    #[serde(default)]
    pub data_path: Option<String>,
}

impl InputField {
    pub fn new(name: &str, label: &str, field_type: FieldType, value: FieldValue) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            field_type,
            value,
            options: Vec::new(),
            filterable: false,
            readonly: false,
            data_path: None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn item_path(&self) -> &str {
        self.data_path.as_deref().unwrap_or(&self.name)
    }
}

/// Pagination strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationKind {
    Paged,
    InfiniteScroll,
}

/// Query parameter slots that carry pagination semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationSlot {
    Page,
    Limit,
    Descending,
    SortBy,
}

impl PaginationSlot {
    pub const ALL: [PaginationSlot; 4] = [
        PaginationSlot::Page,
        PaginationSlot::Limit,
        PaginationSlot::Descending,
        PaginationSlot::SortBy,
    ];

    pub fn default_name(&self) -> &'static str {
        match self {
            PaginationSlot::Page => "page",
            PaginationSlot::Limit => "limit",
            PaginationSlot::Descending => "descending",
            PaginationSlot::SortBy => "sortBy",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            PaginationSlot::Page => "Page",
            PaginationSlot::Limit => "Limit",
            PaginationSlot::Descending => "Descending",
            PaginationSlot::SortBy => "Sort by",
        }
    }
}

/// Declaration of one pagination query parameter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParamSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<FieldValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default)]
    pub page: Option<ParamSpec>,
    #[serde(default)]
    pub limit: Option<ParamSpec>,
    #[serde(default)]
    pub descending: Option<ParamSpec>,
    #[serde(default)]
    pub sort_by: Option<ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPathField {
    pub data_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PaginationFields {
    #[serde(default)]
    pub total: Option<DataPathField>,
}

/// Pagination declaration of a `getAll` method
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaginationConfig {
    #[serde(rename = "type")]
    pub kind: PaginationKind,
    #[serde(default)]
    pub params: PaginationParams,
    #[serde(default)]
    pub fields: PaginationFields,
}

impl PaginationConfig {
    pub fn spec(&self, slot: PaginationSlot) -> Option<&ParamSpec> {
        match slot {
            PaginationSlot::Page => self.params.page.as_ref(),
            PaginationSlot::Limit => self.params.limit.as_ref(),
            PaginationSlot::Descending => self.params.descending.as_ref(),
            PaginationSlot::SortBy => self.params.sort_by.as_ref(),
        }
    }

    /// Query parameter name carrying the slot. The page slot always exists;
    /// the others only when declared.
    pub fn param_name(&self, slot: PaginationSlot) -> Option<&str> {
        match (self.spec(slot), slot) {
            (Some(spec), _) => Some(spec.name.as_deref().unwrap_or(slot.default_name())),
            (None, PaginationSlot::Page) => Some(slot.default_name()),
            (None, _) => None,
        }
    }

    pub fn default_value(&self, slot: PaginationSlot) -> Option<&FieldValue> {
        self.spec(slot).and_then(|s| s.value.as_ref())
    }

    pub fn is_infinite_scroll(&self) -> bool {
        self.kind == PaginationKind::InfiniteScroll
    }

    /// True when the field is the page or limit slot
    pub fn is_page_or_limit(&self, name: &str) -> bool {
        self.param_name(PaginationSlot::Page) == Some(name)
            || self.param_name(PaginationSlot::Limit) == Some(name)
    }
}

/// One or many sort keys
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SortKeys {
    One(String),
    Many(Vec<String>),
}

impl SortKeys {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            SortKeys::One(key) => vec![key.as_str()],
            SortKeys::Many(keys) => keys.iter().map(String::as_str).collect(),
        }
    }
}

/// How the list is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    #[default]
    Table,
    Cards,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DisplayConfig {
    #[serde(default, rename = "type")]
    pub kind: DisplayType,
    #[serde(default)]
    pub fields: Vec<InputField>,
}

/// `getAll` method definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAllMethod {
    pub url: String,
    #[serde(default)]
    pub actual_method: Option<HttpVerb>,
    #[serde(default)]
    pub request_headers: Headers,
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub query_params: Vec<InputField>,
    #[serde(default)]
    pub fields: Vec<InputField>,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub sort_by: Option<SortKeys>,
    /// Name of a registered data transform
    #[serde(default)]
    pub data_transform: Option<String>,
}

impl GetAllMethod {
    pub fn display_fields(&self) -> &[InputField] {
        if self.fields.is_empty() {
            &self.display.fields
        } else {
            &self.fields
        }
    }

    pub fn verb(&self) -> HttpVerb {
        self.actual_method.unwrap_or(HttpVerb::Get)
    }
}

/// `getSingle` method definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSingleMethod {
    pub url: String,
    /// Detail path template, e.g. `/users/:id`
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub actual_method: Option<HttpVerb>,
    #[serde(default)]
    pub request_headers: Headers,
    #[serde(default)]
    pub data_path: Option<String>,
}

/// `post` / `put` method definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteMethod {
    pub url: String,
    #[serde(default)]
    pub actual_method: Option<HttpVerb>,
    #[serde(default)]
    pub request_headers: Headers,
    #[serde(default)]
    pub fields: Vec<InputField>,
}

/// `delete` method definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMethod {
    pub url: String,
    #[serde(default)]
    pub actual_method: Option<HttpVerb>,
    #[serde(default)]
    pub request_headers: Headers,
}

/// Custom (non-CRUD) action available on every item
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAction {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub actual_method: Option<HttpVerb>,
    #[serde(default)]
    pub request_headers: Headers,
    #[serde(default)]
    pub fields: Vec<InputField>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Methods {
    #[serde(default)]
    pub get_all: Option<GetAllMethod>,
    #[serde(default)]
    pub get_single: Option<GetSingleMethod>,
    #[serde(default)]
    pub post: Option<WriteMethod>,
    #[serde(default)]
    pub put: Option<WriteMethod>,
    #[serde(default)]
    pub delete: Option<DeleteMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationLabels {
    #[serde(default)]
    pub items_count: Option<String>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub previous_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTitles {
    #[serde(default)]
    pub edit_item: Option<String>,
    #[serde(default)]
    pub add_item: Option<String>,
}

/// Label overrides, set at app level and per resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLabels {
    #[serde(default)]
    pub pagination: PaginationLabels,
    #[serde(default)]
    pub form_titles: FormTitles,
}

impl CustomLabels {
    /// Resource labels take precedence over app labels
    pub fn merged(base: &CustomLabels, overrides: &CustomLabels) -> CustomLabels {
        fn pick(over: &Option<String>, base: &Option<String>) -> Option<String> {
            over.clone().or_else(|| base.clone())
        }

        CustomLabels {
            pagination: PaginationLabels {
                items_count: pick(&overrides.pagination.items_count, &base.pagination.items_count),
                next_page: pick(&overrides.pagination.next_page, &base.pagination.next_page),
                previous_page: pick(
                    &overrides.pagination.previous_page,
                    &base.pagination.previous_page,
                ),
            },
            form_titles: FormTitles {
                edit_item: pick(&overrides.form_titles.edit_item, &base.form_titles.edit_item),
                add_item: pick(&overrides.form_titles.add_item, &base.form_titles.add_item),
            },
        }
    }

    pub fn edit_item_title(&self) -> &str {
        self.form_titles.edit_item.as_deref().unwrap_or("Update Item")
    }

    pub fn add_item_title(&self) -> &str {
        self.form_titles.add_item.as_deref().unwrap_or("Add Item")
    }
}

/// Resource (page) definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub methods: Methods,
    #[serde(default)]
    pub custom_actions: Vec<CustomAction>,
    #[serde(default)]
    pub custom_labels: CustomLabels,
    #[serde(default)]
    pub request_headers: Headers,
    /// Resources listed under an item of this resource
    #[serde(default)]
    pub sub_resources: Vec<ResourceConfig>,
}

impl ResourceConfig {
    pub fn pagination(&self) -> Option<&PaginationConfig> {
        self.methods.get_all.as_ref()?.pagination.as_ref()
    }

    pub fn is_infinite_scroll(&self) -> bool {
        self.pagination().map(|p| p.is_infinite_scroll()).unwrap_or(false)
    }

    pub fn display_type(&self) -> DisplayType {
        self.methods
            .get_all
            .as_ref()
            .map(|g| g.display.kind)
            .unwrap_or_default()
    }

    pub fn display_fields(&self) -> &[InputField] {
        self.methods
            .get_all
            .as_ref()
            .map(|g| g.display_fields())
            .unwrap_or(&[])
    }

    pub fn sub_resource(&self, id: &str) -> Option<&ResourceConfig> {
        self.sub_resources.iter().find(|r| r.id == id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ctx = |what: &str| format!("{}: {}", self.id, what);

        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "resource '{}' has an empty id",
                self.name
            )));
        }

        if let Some(get_all) = &self.methods.get_all {
            require_url(&ctx("getAll"), &get_all.url)?;
            ensure_unique_names(&ctx("getAll.queryParams"), &get_all.query_params)?;
            ensure_unique_names(&ctx("getAll.fields"), &get_all.fields)?;
            ensure_unique_names(&ctx("getAll.display.fields"), &get_all.display.fields)?;
            if let Some(total) = get_all
                .pagination
                .as_ref()
                .and_then(|p| p.fields.total.as_ref())
            {
                if total.data_path.trim().is_empty() {
                    return Err(ConfigError::Invalid(ctx(
                        "pagination.fields.total.dataPath is empty",
                    )));
                }
            }
        }

        if let Some(get_single) = &self.methods.get_single {
            require_url(&ctx("getSingle"), &get_single.url)?;
            if matches!(&get_single.id, Some(id) if id.trim().is_empty()) {
                return Err(ConfigError::Invalid(ctx("getSingle.id is empty")));
            }
        }

        for (label, method) in [("post", &self.methods.post), ("put", &self.methods.put)] {
            if let Some(method) = method {
                require_url(&ctx(label), &method.url)?;
                ensure_unique_names(&ctx(&format!("{}.fields", label)), &method.fields)?;
            }
        }

        if let Some(delete) = &self.methods.delete {
            require_url(&ctx("delete"), &delete.url)?;
        }

        for action in &self.custom_actions {
            require_url(&ctx(&action.name), &action.url)?;
            ensure_unique_names(&ctx(&format!("{}.fields", action.name)), &action.fields)?;
        }

        let mut seen = HashSet::new();
        for sub in &self.sub_resources {
            if !seen.insert(sub.id.as_str()) {
                return Err(ConfigError::Invalid(ctx(&format!(
                    "duplicate sub-resource '{}'",
                    sub.id
                ))));
            }
            sub.validate()?;
        }

        Ok(())
    }
}

fn require_url(context: &str, url: &str) -> Result<(), ConfigError> {
    if url.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: url is empty", context)));
    }
    Ok(())
}

fn ensure_unique_names(context: &str, fields: &[InputField]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{}: duplicate field '{}'",
                context, field.name
            )));
        }
    }
    Ok(())
}

/// Root structure of the configuration file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Prefix for relative method urls
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub request_headers: Headers,
    #[serde(default)]
    pub custom_labels: CustomLabels,
    pub pages: Vec<ResourceConfig>,
}

fn default_app_name() -> String {
    "restui".to_string()
}

impl AppConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Demo configuration against a public placeholder API
    pub fn demo() -> Result<Self, ConfigError> {
        Self::from_json_str(DEMO_CONFIG)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pages.is_empty() {
            return Err(ConfigError::Invalid("no pages configured".to_string()));
        }

        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(page.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate page '{}'", page.id)));
            }
            page.validate()?;
        }

        tracing::debug!("Validated configuration with {} pages", self.pages.len());
        Ok(())
    }

    /// Get a page definition by id
    pub fn page(&self, id: &str) -> Option<&ResourceConfig> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Get all page ids (for autocomplete)
    pub fn page_ids(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.id.as_str()).collect()
    }

    /// Labels of a page with the app-level labels underneath
    pub fn labels_for(&self, resource: &ResourceConfig) -> CustomLabels {
        CustomLabels::merged(&self.custom_labels, &resource.custom_labels)
    }
}
