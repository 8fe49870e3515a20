//! Item views
//!
//! Renders the items of the current resource as a table or as cards,
//! depending on `display.type`, with the pagination footer underneath.
//! [`ItemCallbacks`] tells the view and the key handler which item
//! operations exist for the resource.

use crate::app::App;
use crate::resource::{
    extract_json_value, items_count_label, DisplayType, FieldType, InputField, ResourceSession,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Table, TableState,
    },
    Frame,
};
use serde_json::Value;

/// Most columns derived from item keys when no display fields are configured
const MAX_DERIVED_COLUMNS: usize = 6;
const MAX_CELL_WIDTH: usize = 38;

/// A control offered by the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCommand {
    pub key: &'static str,
    pub label: String,
}

impl ItemCommand {
    fn new(key: &'static str, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
        }
    }

    pub fn hint(&self) -> String {
        format!("{}:{}", self.key, self.label)
    }
}

/// Item operations available for a resource; `None` hides the control
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCallbacks {
    pub delete: Option<ItemCommand>,
    pub put: Option<ItemCommand>,
    pub details: Option<ItemCommand>,
    pub action: Option<ItemCommand>,
    pub get_next_page: Option<ItemCommand>,
    pub get_previous_page: Option<ItemCommand>,
}

impl ItemCallbacks {
    pub fn for_session(session: &ResourceSession) -> Self {
        let resource = session.resource();
        let methods = &resource.methods;
        let labels = &session.labels.pagination;

        let (get_next_page, get_previous_page) = match session.pagination_config() {
            None => (None, None),
            Some(config) if config.is_infinite_scroll() => {
                (Some(ItemCommand::new("]", "Load more")), None)
            },
            Some(_) => (
                Some(ItemCommand::new(
                    "]",
                    labels.next_page.as_deref().unwrap_or("Next"),
                )),
                Some(ItemCommand::new(
                    "[",
                    labels.previous_page.as_deref().unwrap_or("Previous"),
                )),
            ),
        };

        Self {
            delete: methods.delete.as_ref().map(|_| ItemCommand::new("x", "Delete")),
            put: methods.put.as_ref().map(|_| ItemCommand::new("e", "Edit")),
            details: methods
                .get_single
                .as_ref()
                .map(|_| ItemCommand::new("Enter", "Details")),
            action: (!resource.custom_actions.is_empty()).then(|| ItemCommand::new("a", "Actions")),
            get_next_page,
            get_previous_page,
        }
    }

    /// Key hints for the item controls, in display order
    pub fn item_hints(&self) -> Vec<String> {
        [&self.details, &self.put, &self.delete, &self.action]
            .into_iter()
            .flatten()
            .map(ItemCommand::hint)
            .collect()
    }
}

/// Render the item list of the current resource
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(session) = app.session.as_ref() else {
        let msg = Paragraph::new("No resource selected").style(Style::default().fg(Color::DarkGray));
        f.render_widget(msg, area);
        return;
    };

    let resource = session.resource();
    let count = session.visible_items().len();
    let title = if session.filter.is_empty() {
        format!(" {}[{}] ", resource.name, count)
    } else {
        format!(" {}[{}/{}] ", resource.name, count, session.items.len())
    };
    let display_type = resource.display_type();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner_area);

    if let Some(error) = &session.error {
        let msg = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        f.render_widget(msg, chunks[0]);
    } else if count == 0 && !session.loading {
        let msg = Paragraph::new("No items")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(msg, chunks[0]);
    } else {
        match display_type {
            DisplayType::Table => render_table(f, app, chunks[0]),
            DisplayType::Cards => render_cards(f, app, chunks[0]),
        }
    }

    render_pagination_footer(f, app, chunks[1]);
}

/// Columns of the view: configured display fields, or the keys of the
/// first item
fn columns(session: &ResourceSession) -> Vec<InputField> {
    let configured = session.resource().display_fields();
    if !configured.is_empty() {
        return configured.to_vec();
    }

    match session.items.first() {
        Some(Value::Object(map)) => map
            .keys()
            .take(MAX_DERIVED_COLUMNS)
            .map(|k| InputField::new(k, k, FieldType::Text, Default::default()))
            .collect(),
        _ => Vec::new(),
    }
}

fn cell_text(item: &Value, field: &InputField) -> String {
    let value = extract_json_value(item, field.item_path());
    match (field.field_type, value.as_str()) {
        (FieldType::Boolean, "true") => "✓".to_string(),
        (FieldType::Boolean, "false") => "✗".to_string(),
        _ => value,
    }
}

/// Table view with virtual scrolling
fn render_table(f: &mut Frame, app: &mut App, area: Rect) {
    // Account for header row
    let visible_height = (area.height as usize).saturating_sub(1);
    app.update_viewport(visible_height);
    app.ensure_visible();

    let Some(session) = app.session.as_ref() else {
        return;
    };
    let items = session.visible_items();
    let fields = columns(session);
    if fields.is_empty() {
        return;
    }

    let total_items = items.len();
    let needs_scrollbar = total_items > visible_height;
    let table_area = if needs_scrollbar {
        Rect {
            width: area.width.saturating_sub(1),
            ..area
        }
    } else {
        area
    };

    let range = app.visible_range();

    let header = Row::new(fields.iter().map(|field| {
        Cell::from(format!(" {}", field.display_label())).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .height(1);

    let rows: Vec<Row> = items[range.clone()]
        .iter()
        .map(|item| {
            Row::new(fields.iter().map(|field| {
                Cell::from(format!(" {}", truncate_string(&cell_text(item, field), MAX_CELL_WIDTH)))
            }))
        })
        .collect();

    let width = (100 / fields.len()).max(1) as u16;
    let widths: Vec<Constraint> = fields.iter().map(|_| Constraint::Percentage(width)).collect();

    let table = Table::new(rows, widths).header(header).row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    // Adjust selected index for virtual scrolling
    let mut state = TableState::default();
    if app.selected >= range.start && app.selected < range.end {
        state.select(Some(app.selected - range.start));
    }

    f.render_stateful_widget(table, table_area, &mut state);

    if needs_scrollbar {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .symbols(symbols::scrollbar::VERTICAL)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(total_items.saturating_sub(visible_height))
            .position(app.scroll_offset);

        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

/// Card view: one bordered block per item, title from the first field
fn render_cards(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let fields = columns(session);
    let Some((title_field, body_fields)) = fields.split_first() else {
        return;
    };

    let card_height = body_fields.len() + 2;
    let items: Vec<ListItem> = session
        .visible_items()
        .into_iter()
        .map(|item| {
            let mut lines = vec![Line::from(Span::styled(
                format!("▌ {}", cell_text(item, title_field)),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))];
            lines.extend(body_fields.iter().map(|field| {
                let width = area.width.saturating_sub(6) as usize;
                Line::from(vec![
                    Span::styled(
                        format!("  {}: ", field.display_label()),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(truncate_string(&cell_text(item, field), width.max(8))),
                ])
            }));
            lines.push(Line::from(""));
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items).highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)));
    let mut state = ListState::default().with_selected(Some(app.selected));

    f.render_stateful_widget(list, area, &mut state);
    app.update_viewport((area.height as usize / card_height).max(1));
}

/// Items count label and page controls
fn render_pagination_footer(f: &mut Frame, app: &App, area: Rect) {
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let callbacks = ItemCallbacks::for_session(session);
    let state = session.pagination.as_ref();

    let mut spans = Vec::new();
    if let Some(label) = items_count_label(state, session.items.len(), &session.labels.pagination) {
        spans.push(Span::styled(label, Style::default().fg(Color::Gray)));
        spans.push(Span::raw("  "));
    }

    let enabled = Style::default().fg(Color::Cyan);
    let disabled = Style::default().fg(Color::DarkGray);

    if let (Some(previous), Some(state)) = (&callbacks.get_previous_page, state) {
        let style = if state.has_previous_page { enabled } else { disabled };
        spans.push(Span::styled(format!("{} {}", previous.key, previous.label), style));
        spans.push(Span::styled(format!("  page {}  ", state.page), Style::default().fg(Color::White)));
    }

    if let (Some(next), Some(state)) = (&callbacks.get_next_page, state) {
        let style = if state.has_next_page { enabled } else { disabled };
        spans.push(Span::styled(format!("{} {}", next.label, next.key), style));
    }

    if session.loading {
        spans.push(Span::styled("  Loading...", Style::default().fg(Color::Yellow)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Right), area);
}

/// Truncate string for display (Unicode-safe)
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_len {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::{FetchRequest, Transport, TransportError, TransportResponse};
    use crate::resource::AppConfig;
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use std::sync::Arc;

    struct NoopTransport;

    #[async_trait]
    impl Transport for NoopTransport {
        async fn fetch(&self, _request: FetchRequest) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse::Json(json!([])))
        }
    }

    fn session_for(page: &str) -> ResourceSession {
        let config = AppConfig::demo().unwrap();
        let resource = config.page(page).unwrap();
        ResourceSession::new(Arc::new(resource.clone()), config.labels_for(resource), "")
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render(f, app, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_callbacks_follow_configured_methods() {
        let users = ItemCallbacks::for_session(&session_for("users"));
        assert!(users.delete.is_some());
        assert!(users.put.is_some());
        assert_eq!(users.action.as_ref().unwrap().key, "a");
        assert!(users.get_next_page.is_none());
        assert!(users.get_previous_page.is_none());

        let photos = ItemCallbacks::for_session(&session_for("photos"));
        assert!(photos.delete.is_none());
        assert!(photos.put.is_none());
        assert!(photos.details.is_none());
        assert_eq!(photos.get_next_page.unwrap().label, "Load more");
        assert!(photos.get_previous_page.is_none());
    }

    #[test]
    fn test_paged_callbacks_use_custom_labels() {
        let posts = ItemCallbacks::for_session(&session_for("posts"));
        assert_eq!(posts.get_next_page.unwrap().label, "Next");
        assert_eq!(posts.get_previous_page.unwrap().label, "Previous");
    }

    #[test]
    fn test_item_hints_order() {
        let users = ItemCallbacks::for_session(&session_for("users"));
        assert_eq!(
            users.item_hints(),
            vec!["Enter:Details", "e:Edit", "x:Delete", "a:Actions"]
        );
    }

    #[test]
    fn test_table_and_cards_rendering() {
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport);
        let mut app = App::new(AppConfig::demo().unwrap(), transport, Config::default());

        let mut users = session_for("users");
        users.items = vec![json!({ "id": 1, "name": "Leanne", "email": "l@example.com", "company": { "name": "Acme" } })];
        app.session = Some(users);
        let text = screen(&mut app);
        assert!(text.contains("Email"));
        assert!(text.contains("Acme"));

        let mut photos = session_for("photos");
        photos.items = vec![json!({ "id": 9, "title": "Sunset", "url": "https://img/9" })];
        app.session = Some(photos);
        let text = screen(&mut app);
        assert!(text.contains("▌ 9"));
        assert!(text.contains("Title: Sunset"));
    }

    #[test]
    fn test_columns_derived_from_first_item() {
        let config = AppConfig::from_json_str(
            r#"{"pages": [{"id": "tags", "name": "Tags", "methods": {"getAll": {"url": "/tags"}}}]}"#,
        )
        .unwrap();
        let resource = config.page("tags").unwrap();
        let mut session =
            ResourceSession::new(Arc::new(resource.clone()), config.labels_for(resource), "");
        session.items = vec![json!({ "slug": "rust", "count": 3 })];

        let names: Vec<String> = columns(&session).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["slug", "count"]);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a long value here", 10), "a long ...");
    }
}
