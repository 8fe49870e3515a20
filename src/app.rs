//! Application State
//!
//! Central application state management for restui.

use crate::config::Config;
use crate::editor::{FieldEditor, FormKind, FormState};
use crate::error::ResourceError;
use crate::http::Transport;
use crate::notification::{DetailLevel, NotificationManager, OperationType};
use crate::resource::detail::match_template;
use crate::resource::form::{build_payload, prefill};
use crate::resource::{
    extract_json_value, resolve_detail_path, AppConfig, Confirmation, DeleteOutcome,
    ResourceConfig, ResourceController, ResourceSession, SubmitOutcome,
    TransformRegistry, DELETE_CONFIRM_MESSAGE,
};
use anyhow::Result;
use crossterm::event::KeyCode;
use serde_json::{Map, Value};
use std::ops::Range;
use std::sync::Arc;

// =========================================================================
// Configuration Constants
// =========================================================================

/// Default viewport height (will be updated during render based on terminal size)
const DEFAULT_VIEWPORT_HEIGHT: usize = 20;

/// Application modes
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,        // Viewing list
    Command,       // : command input
    Help,          // ? help popup
    Confirm,       // Delete confirmation
    Describe,      // Viewing one item
    Form,          // Create/edit/action form popup
    QueryParams,   // Query parameter panel
    Menu,          // Custom action or sub-resource chooser
    Notifications, // Notifications history panel
}

/// Delete waiting for confirmation
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub item: Value,
    pub item_label: String,
    pub message: String,
    pub selected_yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Actions,
    SubResources,
}

/// Small chooser popup
#[derive(Debug, Clone)]
pub struct MenuState {
    pub kind: MenuKind,
    pub title: String,
    pub entries: Vec<String>,
    pub selected: usize,
}

/// Parent context for hierarchical navigation
#[derive(Debug, Clone)]
pub struct ParentContext {
    pub session: ResourceSession,
    pub item: Value,
    pub display_name: String,
    pub selected: usize,
    pub location: String,
}

/// What a location points at
#[derive(Debug, Clone, PartialEq)]
pub enum LocationTarget {
    /// `/{page}?{query}`
    Page { page_id: String, query: String },
    /// Detail path of a top-level page item
    Detail { page_id: String, vars: Value },
    /// Detail path of a sub-resource item
    SubDetail {
        page_id: String,
        sub_id: String,
        parent: Value,
        vars: Value,
    },
}

/// Match a location against the configured pages and detail templates
pub fn resolve_location(config: &AppConfig, location: &str) -> Option<LocationTarget> {
    let (path, query) = match location.split_once('?') {
        Some((path, query)) => (path, query),
        None => (location, ""),
    };
    let trimmed = path.trim_matches('/');

    if config.page(trimmed).is_some() {
        return Some(LocationTarget::Page {
            page_id: trimmed.to_string(),
            query: query.to_string(),
        });
    }

    for page in &config.pages {
        if let Some(vars) = detail_template(page).and_then(|t| match_template(t, path)) {
            return Some(LocationTarget::Detail {
                page_id: page.id.clone(),
                vars: Value::Object(vars),
            });
        }
    }

    for page in &config.pages {
        for sub in &page.sub_resources {
            let Some(template) = detail_template(sub) else {
                continue;
            };
            let Some(vars) = match_template(template, path) else {
                continue;
            };

            let parent = parent_from_vars(page, template, &vars);
            return Some(LocationTarget::SubDetail {
                page_id: page.id.clone(),
                sub_id: sub.id.clone(),
                parent,
                vars: Value::Object(vars),
            });
        }
    }

    None
}

fn detail_template(resource: &ResourceConfig) -> Option<&str> {
    resource.methods.get_single.as_ref()?.id.as_deref()
}

/// Rebuild enough of the parent item to list the sub-resource: the first
/// placeholder of the sub-resource template carries the parent's key.
fn parent_from_vars(page: &ResourceConfig, sub_template: &str, vars: &Map<String, Value>) -> Value {
    let mut parent = Map::new();
    let names = crate::resource::detail::placeholder_names(sub_template);
    let Some(first) = names.first() else {
        return Value::Object(parent);
    };
    let Some(value) = vars.get(*first).cloned() else {
        return Value::Object(parent);
    };

    parent.insert(first.to_string(), value.clone());
    let parent_key = detail_template(page)
        .map(crate::resource::detail::placeholder_names)
        .and_then(|names| names.last().map(|n| n.to_string()));
    if let Some(key) = parent_key {
        parent.insert(key, value);
    }
    Value::Object(parent)
}

/// Short label of an item for notifications and breadcrumbs
pub fn item_label(resource: &ResourceConfig, item: &Value) -> String {
    if let Some(id) = item.get("id").filter(|v| !v.is_null()) {
        return format!("#{}", extract_json_value(id, ""));
    }
    resource
        .display_fields()
        .first()
        .map(|f| extract_json_value(item, f.item_path()))
        .unwrap_or_else(|| "item".to_string())
}

/// Main application state
pub struct App {
    // Admin configuration and remote access
    pub app_config: AppConfig,
    pub transport: Arc<dyn Transport>,
    pub transforms: TransformRegistry,

    // Current resource being viewed
    pub current_page: String,
    pub session: Option<ResourceSession>,
    pub location: String,

    // Navigation state
    pub selected: usize,
    pub mode: Mode,
    pub filter_active: bool,

    // Hierarchical navigation
    pub navigation_stack: Vec<ParentContext>,

    // Command input
    pub command_text: String,
    pub command_suggestions: Vec<String>,
    pub command_suggestion_selected: usize,
    pub command_preview: Option<String>,

    // Popups
    pub pending_action: Option<PendingAction>,
    pub form: Option<FormState>,
    pub query_editor: Option<FieldEditor>,
    pub menu: Option<MenuState>,

    // UI state
    pub error_message: Option<String>,
    pub describe_scroll: usize,
    pub describe_data: Option<Value>,
    pub describe_title: String,
    pub config: Config,
    pub last_key_press: Option<(KeyCode, std::time::Instant)>,

    // Notifications
    pub notification_manager: NotificationManager,
    pub notifications_selected: usize,

    // Virtual scrolling
    pub viewport_height: usize,
    pub scroll_offset: usize,
}

impl App {
    pub fn new(app_config: AppConfig, transport: Arc<dyn Transport>, config: Config) -> Self {
        let mut notification_manager = NotificationManager::new();
        notification_manager.toast_duration = config.toast_duration();
        notification_manager.detail_level = config
            .notification_detail
            .as_deref()
            .map(DetailLevel::from_str)
            .unwrap_or_default();

        let current_page = app_config
            .page_ids()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default();

        Self {
            app_config,
            transport,
            transforms: TransformRegistry::with_builtins(),
            location: format!("/{}", current_page),
            current_page,
            session: None,
            selected: 0,
            mode: Mode::Normal,
            filter_active: false,
            navigation_stack: Vec::new(),
            command_text: String::new(),
            command_suggestions: Vec::new(),
            command_suggestion_selected: 0,
            command_preview: None,
            pending_action: None,
            form: None,
            query_editor: None,
            menu: None,
            error_message: None,
            describe_scroll: 0,
            describe_data: None,
            describe_title: String::new(),
            config,
            last_key_press: None,
            notification_manager,
            notifications_selected: 0,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            scroll_offset: 0,
        }
    }

    // =========================================================================
    // Resource Access
    // =========================================================================

    pub fn current_resource(&self) -> Option<&ResourceConfig> {
        self.session.as_ref().map(|s| s.resource())
    }

    pub fn is_loading(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.loading)
    }

    pub fn item_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.visible_items().len())
            .unwrap_or(0)
    }

    pub fn selected_item(&self) -> Option<&Value> {
        self.session
            .as_ref()?
            .visible_items()
            .get(self.selected)
            .copied()
    }

    pub fn get_available_commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = self
            .app_config
            .page_ids()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(resource) = self.current_resource() {
            for sub in &resource.sub_resources {
                if !commands.contains(&sub.id) {
                    commands.push(sub.id.clone());
                }
            }
        }

        for builtin in ["back", "new", "query", "refresh", "notifications", "notifications clear", "quit"] {
            commands.push(builtin.to_string());
        }

        commands.sort();
        commands
    }

    // =========================================================================
    // Data Fetching
    // =========================================================================

    pub async fn refresh_current(&mut self) -> Result<()> {
        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if let Err(e) = controller.refresh(session).await {
            tracing::warn!("Refresh of {} failed: {}", session.resource().id, e);
        }
        self.clamp_selection();
        Ok(())
    }

    pub async fn next_page(&mut self) -> Result<()> {
        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let outcome = controller.next_page(session).await;
        self.after_submit(outcome, true);
        Ok(())
    }

    pub async fn prev_page(&mut self) -> Result<()> {
        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let outcome = controller.previous_page(session).await;
        self.after_submit(outcome, true);
        Ok(())
    }

    /// Append the next page of an infinite-scroll list
    pub async fn load_more(&mut self) -> Result<()> {
        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let outcome = controller.load_more(session).await;
        self.after_submit(outcome, false);
        Ok(())
    }

    fn after_submit(&mut self, outcome: Result<SubmitOutcome, ResourceError>, reset_cursor: bool) {
        match outcome {
            Ok(SubmitOutcome::Submitted { .. }) => {
                if reset_cursor {
                    self.selected = 0;
                    self.scroll_offset = 0;
                }
                self.sync_location();
            },
            Ok(SubmitOutcome::Ignored) => {
                tracing::debug!("Query submit ignored");
            },
            Err(e) => {
                // Already recorded on the session
                tracing::warn!("Query submit failed: {}", e);
                self.sync_location();
            },
        }
        self.clamp_selection();
    }

    /// Location of the current list view
    fn list_location(&self) -> String {
        match (&self.session, self.navigation_stack.last()) {
            (Some(session), None) => format!("/{}{}", self.current_page, session.query_string()),
            (_, Some(parent)) => parent.location.clone(),
            (None, None) => format!("/{}", self.current_page),
        }
    }

    /// Show the current list state in the location bar
    pub fn sync_location(&mut self) {
        self.location = self.list_location();
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    pub fn push_filter_char(&mut self, c: char) {
        if let Some(session) = self.session.as_mut() {
            session.filter.push(c);
        }
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn pop_filter_char(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.filter.pop();
        }
        self.clamp_selection();
    }

    pub fn clear_filter(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.filter.clear();
        }
        self.filter_active = false;
        self.clamp_selection();
    }

    // =========================================================================
    // Navigation Helpers
    // =========================================================================

    fn clamp_selection(&mut self) {
        let count = self.item_count();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
        self.ensure_visible();
    }

    pub fn describe_line_count(&self) -> usize {
        self.describe_data
            .as_ref()
            .and_then(|d| serde_json::to_string_pretty(d).ok())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    pub fn describe_scroll_to_bottom(&mut self, visible_lines: usize) {
        self.describe_scroll = self.describe_line_count().saturating_sub(visible_lines);
    }

    pub fn next(&mut self) {
        match self.mode {
            Mode::Notifications => {
                let count = self.notification_manager.notifications.len();
                if count > 0 {
                    self.notifications_selected = (self.notifications_selected + 1).min(count - 1);
                }
            },
            Mode::Menu => {
                if let Some(menu) = self.menu.as_mut() {
                    if !menu.entries.is_empty() {
                        menu.selected = (menu.selected + 1).min(menu.entries.len() - 1);
                    }
                }
            },
            _ => {
                let count = self.item_count();
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
                self.ensure_visible();
            },
        }
    }

    pub fn previous(&mut self) {
        match self.mode {
            Mode::Notifications => {
                self.notifications_selected = self.notifications_selected.saturating_sub(1);
            },
            Mode::Menu => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.selected = menu.selected.saturating_sub(1);
                }
            },
            _ => {
                self.selected = self.selected.saturating_sub(1);
                self.ensure_visible();
            },
        }
    }

    pub fn go_to_top(&mut self) {
        match self.mode {
            Mode::Notifications => self.notifications_selected = 0,
            _ => {
                self.selected = 0;
                self.ensure_visible();
            },
        }
    }

    pub fn go_to_bottom(&mut self) {
        match self.mode {
            Mode::Notifications => {
                self.notifications_selected = self.notification_manager.notifications.len().saturating_sub(1);
            },
            _ => {
                self.selected = self.item_count().saturating_sub(1);
                self.ensure_visible();
            },
        }
    }

    pub fn page_down(&mut self, page_size: usize) {
        let count = self.item_count();
        if count > 0 {
            self.selected = (self.selected + page_size).min(count - 1);
        }
        self.ensure_visible();
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
        self.ensure_visible();
    }

    // =========================================================================
    // Mode Transitions
    // =========================================================================

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_text.clear();
        self.command_suggestions = self.get_available_commands();
        self.command_suggestion_selected = 0;
        self.command_preview = None;
    }

    pub fn update_command_suggestions(&mut self) {
        let input = self.command_text.to_lowercase();
        let all_commands = self.get_available_commands();

        if input.is_empty() {
            self.command_suggestions = all_commands;
        } else {
            self.command_suggestions = all_commands
                .into_iter()
                .filter(|cmd| cmd.contains(&input))
                .collect();
        }

        if self.command_suggestion_selected >= self.command_suggestions.len() {
            self.command_suggestion_selected = 0;
        }

        self.update_preview();
    }

    fn update_preview(&mut self) {
        self.command_preview = self
            .command_suggestions
            .get(self.command_suggestion_selected)
            .cloned();
    }

    pub fn next_suggestion(&mut self) {
        if !self.command_suggestions.is_empty() {
            self.command_suggestion_selected =
                (self.command_suggestion_selected + 1) % self.command_suggestions.len();
            self.update_preview();
        }
    }

    pub fn prev_suggestion(&mut self) {
        if !self.command_suggestions.is_empty() {
            if self.command_suggestion_selected == 0 {
                self.command_suggestion_selected = self.command_suggestions.len() - 1;
            } else {
                self.command_suggestion_selected -= 1;
            }
            self.update_preview();
        }
    }

    pub fn apply_suggestion(&mut self) {
        if let Some(preview) = &self.command_preview {
            self.command_text = preview.clone();
            self.update_command_suggestions();
        }
    }

    pub fn enter_help_mode(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn enter_notifications_mode(&mut self) {
        self.notifications_selected = 0;
        self.mode = Mode::Notifications;
    }

    /// Open the query parameter panel
    pub fn enter_query_mode(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let hidden = match session.pagination_config() {
            Some(config) if config.is_infinite_scroll() => session
                .query_params
                .iter()
                .filter(|f| config.is_page_or_limit(&f.name))
                .map(|f| f.name.clone())
                .collect(),
            _ => Vec::new(),
        };

        let editor = FieldEditor::with_hidden(session.query_params.clone(), hidden);
        if editor.visible_fields().is_empty() {
            self.error_message = Some("No query parameters for this resource".to_string());
            return;
        }

        self.query_editor = Some(editor);
        self.mode = Mode::QueryParams;
    }

    pub fn exit_mode(&mut self) {
        if self.mode == Mode::Describe {
            self.sync_location();
        }
        self.mode = Mode::Normal;
        self.pending_action = None;
        self.describe_data = None;
        self.form = None;
        self.query_editor = None;
        self.menu = None;
    }

    // =========================================================================
    // Query Parameters
    // =========================================================================

    /// Submit the query panel. Infinite scroll starts over from the first page.
    pub async fn submit_query_panel(&mut self) -> Result<()> {
        let Some(editor) = self.query_editor.take() else {
            return Ok(());
        };
        self.mode = Mode::Normal;

        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let reset = session.is_infinite_scroll();
        let outcome = controller
            .submit_query_params(session, editor.into_fields(), reset)
            .await;
        self.after_submit(outcome, true);
        Ok(())
    }

    // =========================================================================
    // Item Operations
    // =========================================================================

    /// Ask for confirmation before deleting the selected item
    pub fn request_delete(&mut self) {
        let Some(resource) = self.current_resource() else {
            return;
        };
        if resource.methods.delete.is_none() {
            self.error_message = Some(ResourceError::missing_method("Delete").user_message());
            return;
        }
        let Some(item) = self.selected_item().cloned() else {
            return;
        };

        let label = item_label(resource, &item);
        self.pending_action = Some(PendingAction {
            item,
            item_label: label,
            message: DELETE_CONFIRM_MESSAGE.to_string(),
            selected_yes: false,
        });
        self.mode = Mode::Confirm;
    }

    /// Answer the pending delete
    pub async fn confirm_pending(&mut self, approved: bool) -> Result<()> {
        let Some(pending) = self.pending_action.take() else {
            return Ok(());
        };
        self.mode = Mode::Normal;

        let confirmation = if approved {
            Confirmation::Approved
        } else {
            Confirmation::Declined
        };

        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let resource_name = session.resource().name.clone();

        match controller.delete_item(session, &pending.item, confirmation).await {
            Ok(DeleteOutcome::Deleted) => {
                self.notification_manager.record(
                    OperationType::Delete,
                    &resource_name,
                    &pending.item_label,
                    Ok(()),
                );
            },
            Ok(DeleteOutcome::Cancelled) => {
                tracing::debug!("Delete of {} cancelled", pending.item_label);
            },
            Err(e) => {
                tracing::error!("Delete of {} failed: {}", pending.item_label, e);
                self.notification_manager.record(
                    OperationType::Delete,
                    &resource_name,
                    &pending.item_label,
                    Err(e.user_message()),
                );
            },
        }

        self.clamp_selection();
        Ok(())
    }

    pub fn open_create_form(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(post) = session.resource().methods.post.as_ref() else {
            self.error_message = Some(ResourceError::missing_method("Post").user_message());
            return;
        };

        let title = session.labels.add_item_title().to_string();
        self.form = Some(FormState::new(FormKind::Create, title, post.fields.clone()));
        self.mode = Mode::Form;
    }

    /// Open the edit form, prefilled from `getSingle` when configured
    pub async fn open_edit_form(&mut self) -> Result<()> {
        let Some(item) = self.selected_item().cloned() else {
            return Ok(());
        };
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let Some(put) = session.resource().methods.put.as_ref() else {
            self.error_message = Some(ResourceError::missing_method("Put").user_message());
            return Ok(());
        };

        let source = if session.resource().methods.get_single.is_some() {
            let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
            match controller.fetch_single(session, &item).await {
                Ok(single) => single,
                Err(e) => {
                    self.error_message = Some(e.user_message());
                    return Ok(());
                },
            }
        } else {
            item.clone()
        };

        let title = session.labels.edit_item_title().to_string();
        let fields = prefill(&put.fields, &source);
        self.form = Some(FormState::new(FormKind::Update { original: item }, title, fields));
        self.mode = Mode::Form;
        Ok(())
    }

    pub fn open_actions_menu(&mut self) {
        let Some(resource) = self.current_resource() else {
            return;
        };
        if resource.custom_actions.is_empty() || self.selected_item().is_none() {
            return;
        }

        let entries = resource.custom_actions.iter().map(|a| a.name.clone()).collect();
        self.open_menu(MenuKind::Actions, "Actions", entries);
    }

    pub fn open_sub_resources_menu(&mut self) {
        let Some(resource) = self.current_resource() else {
            return;
        };
        if resource.sub_resources.is_empty() || self.selected_item().is_none() {
            return;
        }

        let entries = resource.sub_resources.iter().map(|s| s.id.clone()).collect();
        self.open_menu(MenuKind::SubResources, "Sub-resources", entries);
    }

    fn open_menu(&mut self, kind: MenuKind, title: &str, entries: Vec<String>) {
        self.menu = Some(MenuState {
            kind,
            title: title.to_string(),
            entries,
            selected: 0,
        });
        self.mode = Mode::Menu;
    }

    /// Run the highlighted menu entry
    pub async fn select_menu_entry(&mut self) -> Result<()> {
        let Some(menu) = self.menu.take() else {
            return Ok(());
        };
        self.mode = Mode::Normal;

        let Some(entry) = menu.entries.get(menu.selected) else {
            return Ok(());
        };

        match menu.kind {
            MenuKind::Actions => self.open_action_form(menu.selected),
            MenuKind::SubResources => self.navigate_to_sub_resource(entry).await?,
        }
        Ok(())
    }

    /// Open the form of the custom action at `index` for the selected item
    pub fn open_action_form(&mut self, index: usize) {
        let Some(item) = self.selected_item().cloned() else {
            return;
        };
        let Some(action) = self
            .current_resource()
            .and_then(|r| r.custom_actions.get(index))
            .cloned()
        else {
            return;
        };

        let fields = prefill(&action.fields, &item);
        let title = action.name.clone();
        self.form = Some(FormState::new(FormKind::Action { action, item }, title, fields));
        self.mode = Mode::Form;
    }

    /// Send the open form. The form stays open on failure.
    pub async fn submit_form(&mut self) -> Result<()> {
        let Some(mut form) = self.form.take() else {
            return Ok(());
        };

        let payload = match build_payload(&form.editor.fields).await {
            Ok(payload) => payload,
            Err(e) => {
                form.error = Some(e.user_message());
                self.form = Some(form);
                return Ok(());
            },
        };

        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let resource_name = session.resource().name.clone();

        let (operation, label, result, refresh) = match &form.kind {
            FormKind::Create => {
                let result = controller.create_item(session, payload).await;
                (OperationType::Create, "new item".to_string(), result, true)
            },
            FormKind::Update { original } => {
                let label = item_label(session.resource(), original);
                let result = controller.update_item(session, payload, original).await;
                (OperationType::Update, label, result, true)
            },
            FormKind::Action { action, item } => {
                let label = item_label(session.resource(), item);
                let result = controller
                    .perform_custom_action(session, payload, item, action)
                    .await;
                (OperationType::Action(action.name.clone()), label, result, false)
            },
        };

        let outcome = match result {
            Ok(true) => Ok(()),
            Ok(false) => Err("The server rejected the request.".to_string()),
            Err(e) => Err(e.user_message()),
        };

        match outcome {
            Ok(()) => {
                tracing::info!("{} {} in {}", operation.past_tense(), label, resource_name);
                self.notification_manager
                    .record(operation, &resource_name, &label, Ok(()));
                self.mode = Mode::Normal;
                if refresh {
                    if let Err(e) = controller.refresh(session).await {
                        tracing::warn!("Refresh after save failed: {}", e);
                    }
                }
                self.clamp_selection();
            },
            Err(message) => {
                tracing::error!("{} {} failed: {}", operation.display_name(), label, message);
                self.notification_manager
                    .record(operation, &resource_name, &label, Err(message.clone()));
                form.error = Some(message);
                self.form = Some(form);
            },
        }

        Ok(())
    }

    // =========================================================================
    // Resource Navigation
    // =========================================================================

    /// Open whatever `location` points at
    pub async fn open_location(&mut self, location: &str) -> Result<()> {
        let Some(target) = resolve_location(&self.app_config, location) else {
            self.error_message = Some(format!("Unknown location: {}", location));
            return Ok(());
        };

        tracing::info!("Opening {}", location);
        match target {
            LocationTarget::Page { page_id, query } => {
                self.open_page(&page_id, &query).await?;
            },
            LocationTarget::Detail { page_id, vars } => {
                self.open_page(&page_id, "").await?;
                self.show_detail(vars, location).await;
            },
            LocationTarget::SubDetail {
                page_id,
                sub_id,
                parent,
                vars,
            } => {
                self.open_page(&page_id, "").await?;
                self.enter_sub_resource(&sub_id, parent).await?;
                self.show_detail(vars, location).await;
            },
        }
        Ok(())
    }

    pub async fn navigate_to_resource(&mut self, page_id: &str) -> Result<()> {
        self.open_location(&format!("/{}", page_id)).await
    }

    async fn open_page(&mut self, page_id: &str, query: &str) -> Result<()> {
        let Some(resource) = self.app_config.page(page_id) else {
            self.error_message = Some(format!("Unknown resource: {}", page_id));
            return Ok(());
        };

        let labels = self.app_config.labels_for(resource);
        let session = ResourceSession::new(Arc::new(resource.clone()), labels, query);

        self.navigation_stack.clear();
        self.current_page = page_id.to_string();
        self.session = Some(session);
        self.reset_view();

        self.refresh_current().await?;
        self.sync_location();
        Ok(())
    }

    fn reset_view(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
        self.filter_active = false;
        self.mode = Mode::Normal;
        self.error_message = None;
        self.describe_data = None;
    }

    pub async fn navigate_to_sub_resource(&mut self, sub_id: &str) -> Result<()> {
        let Some(selected_item) = self.selected_item().cloned() else {
            return Ok(());
        };
        self.enter_sub_resource(sub_id, selected_item).await
    }

    async fn enter_sub_resource(&mut self, sub_id: &str, parent_item: Value) -> Result<()> {
        let Some(current) = self.current_resource() else {
            return Ok(());
        };
        let Some(sub) = current.sub_resource(sub_id) else {
            self.error_message = Some(format!(
                "{} is not a sub-resource of {}",
                sub_id, current.id
            ));
            return Ok(());
        };

        let labels = self.app_config.labels_for(sub);
        let sub_session = ResourceSession::sub_resource(
            Arc::new(sub.clone()),
            labels,
            parent_item.clone(),
            parent_item.clone(),
        );
        let display_name = item_label(current, &parent_item);

        let location = self.list_location();
        let Some(parent_session) = self.session.replace(sub_session) else {
            return Ok(());
        };

        self.navigation_stack.push(ParentContext {
            session: parent_session,
            item: parent_item,
            display_name,
            selected: self.selected,
            location,
        });
        self.reset_view();
        self.refresh_current().await
    }

    pub async fn navigate_back(&mut self) -> Result<()> {
        if let Some(parent) = self.navigation_stack.pop() {
            self.session = Some(parent.session);
            self.selected = parent.selected;
            self.filter_active = false;
            self.mode = Mode::Normal;
            self.describe_data = None;
            self.location = parent.location;
            self.ensure_visible();
        }
        Ok(())
    }

    pub fn get_breadcrumb(&self) -> Vec<String> {
        let mut path: Vec<String> = self
            .navigation_stack
            .iter()
            .map(|ctx| format!("{}:{}", ctx.session.resource().id, ctx.display_name))
            .collect();

        if let Some(resource) = self.current_resource() {
            path.push(resource.id.clone());
        }
        path
    }

    /// Navigate to the detail path of the selected item
    pub async fn open_details(&mut self) -> Result<()> {
        let Some(item) = self.selected_item().cloned() else {
            return Ok(());
        };
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let Some(get_single) = session.resource().methods.get_single.as_ref() else {
            self.error_message = Some(ResourceError::missing_method("Get single").user_message());
            return Ok(());
        };

        let Some(template) = get_single.id.as_deref() else {
            // No detail route; show the row as loaded
            self.describe_title = item_label(session.resource(), &item);
            self.describe_data = Some(item);
            self.describe_scroll = 0;
            self.mode = Mode::Describe;
            return Ok(());
        };

        match resolve_detail_path(
            template,
            &item,
            session.parent_item.as_ref(),
            session.is_sub_resource,
        ) {
            Ok(path) => self.show_detail(item, &path).await,
            Err(e) => self.error_message = Some(e.user_message()),
        }
        Ok(())
    }

    /// Fetch an item of the current resource and show it
    async fn show_detail(&mut self, raw_data: Value, path: &str) {
        let controller = ResourceController::new(self.transport.as_ref(), &self.transforms);
        let Some(session) = self.session.as_ref() else {
            return;
        };

        match controller.fetch_single(session, &raw_data).await {
            Ok(item) => {
                self.describe_title = format!("{} {}", session.resource().name, item_label(session.resource(), &item));
                self.describe_data = Some(item);
                self.describe_scroll = 0;
                self.location = path.to_string();
                self.mode = Mode::Describe;
            },
            Err(e) => {
                tracing::warn!("Could not open {}: {}", path, e);
                self.error_message = Some(e.user_message());
            },
        }
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    pub async fn execute_command(&mut self) -> Result<bool> {
        let command_text = if self.command_text.is_empty() {
            self.command_preview.clone().unwrap_or_default()
        } else if let Some(preview) = &self.command_preview {
            if preview.contains(&self.command_text) {
                preview.clone()
            } else {
                self.command_text.clone()
            }
        } else {
            self.command_text.clone()
        };
        self.mode = Mode::Normal;

        let parts: Vec<&str> = command_text.split_whitespace().collect();

        if parts.is_empty() {
            return Ok(false);
        }

        let cmd = parts[0];

        match cmd {
            "q" | "quit" => return Ok(true),
            "back" => {
                self.navigate_back().await?;
            },
            "refresh" => {
                self.refresh_current().await?;
            },
            "new" => {
                self.open_create_form();
            },
            "query" => {
                self.enter_query_mode();
            },
            "notifications" => {
                if parts.len() > 1 && parts[1] == "clear" {
                    self.notification_manager.clear();
                } else {
                    self.enter_notifications_mode();
                }
            },
            _ if cmd.starts_with('/') => {
                self.open_location(cmd).await?;
            },
            _ => {
                let is_sub = self
                    .current_resource()
                    .is_some_and(|r| r.sub_resource(cmd).is_some());

                if is_sub && self.selected_item().is_some() {
                    self.navigate_to_sub_resource(cmd).await?;
                } else if self.app_config.page(cmd).is_some() {
                    self.navigate_to_resource(cmd).await?;
                } else {
                    self.error_message = Some(format!("Unknown command: {}", cmd));
                }
            },
        }

        Ok(false)
    }

    // =========================================================================
    // Virtual Scrolling
    // =========================================================================

    /// Update the viewport height (called from UI during render)
    pub fn update_viewport(&mut self, height: usize) {
        self.viewport_height = height.max(1);
    }

    /// Ensure the selected item is visible in the viewport
    pub fn ensure_visible(&mut self) {
        let count = self.item_count();
        if count == 0 {
            self.scroll_offset = 0;
            return;
        }

        let visible_height = self.viewport_height;
        let margin = 2; // Keep cursor at least this far from edge

        if self.selected < self.scroll_offset + margin {
            self.scroll_offset = self.selected.saturating_sub(margin);
        } else if self.selected >= self.scroll_offset + visible_height.saturating_sub(margin) {
            self.scroll_offset = self
                .selected
                .saturating_sub(visible_height.saturating_sub(margin + 1));
        }

        let max_offset = count.saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    /// Get the range of visible items based on scroll offset and viewport
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.scroll_offset;
        let end = (self.scroll_offset + self.viewport_height).min(self.item_count());
        start.min(end)..end
    }
}
