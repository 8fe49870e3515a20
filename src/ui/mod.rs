//! Terminal User Interface rendering module
//!
//! This module handles all UI rendering for restui using the ratatui
//! framework. Lists of the current resource are shown as a table or as
//! cards; forms, the query panel and confirmations are popups on top.
//!
//! # Architecture
//!
//! - [`view`] - Item list (table or cards), pagination footer, item callbacks
//! - `header` - Header bar with location and page info
//! - `help` - Help overlay showing keybindings
//! - `dialog` - Delete confirmation and chooser popups
//! - `form` - Item form and query parameter panel
//! - `prompt` - Command mode input (`:` key) and filter bar
//! - `notifications` - Notification history panel
//!
//! # JSON Highlighting
//!
//! The describe view provides syntax highlighting for JSON output:
//! - Keys in cyan
//! - Strings in green
//! - Numbers in light blue
//! - Booleans in magenta
//! - Null values in dark gray

mod dialog;
mod form;
mod header;
mod help;
mod notifications;
mod prompt;
pub mod splash;
pub mod view;

use crate::app::{App, Mode};
use crate::notification::NotificationStatus;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};
use view::ItemCallbacks;

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header (multi-line)
            Constraint::Min(1),    // Main content (items or describe)
            Constraint::Length(1), // Footer/crumb
        ])
        .split(f.area());

    header::render(f, app, chunks[0]);

    match app.mode {
        Mode::Describe => {
            render_describe_view(f, app, chunks[1]);
        },
        _ => {
            render_main_content(f, app, chunks[1]);
        },
    }

    render_crumb(f, app, chunks[2]);

    // Overlays
    match app.mode {
        Mode::Help => {
            help::render(f, app);
        },
        Mode::Confirm | Mode::Menu => {
            dialog::render(f, app);
        },
        Mode::Command => {
            prompt::render_command_box(f, app);
        },
        Mode::Notifications => {
            notifications::render(f, app);
        },
        Mode::Form => {
            form::render_form(f, app);
        },
        Mode::QueryParams => {
            form::render_query_params(f, app);
        },
        _ => {},
    }
}

fn render_main_content(f: &mut Frame, app: &mut App, area: Rect) {
    let has_filter_text = app.session.as_ref().is_some_and(|s| !s.filter.is_empty());

    if app.filter_active || has_filter_text {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);

        prompt::render_filter_bar(f, app, chunks[0]);
        view::render(f, app, chunks[1]);
    } else {
        view::render(f, app, area);
    }
}

fn render_describe_view(f: &mut Frame, app: &App, area: Rect) {
    let json = app
        .describe_data
        .as_ref()
        .and_then(|d| serde_json::to_string_pretty(d).ok())
        .unwrap_or_else(|| "No item selected".to_string());

    let lines: Vec<Line> = json.lines().map(highlight_json_line).collect();
    let total_lines = lines.len();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", app.describe_title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let visible_lines = inner_area.height as usize;
    let max_scroll = total_lines.saturating_sub(visible_lines);
    let scroll = app.describe_scroll.min(max_scroll);

    let paragraph = Paragraph::new(lines).scroll((scroll as u16, 0));
    f.render_widget(paragraph, inner_area);

    if total_lines > visible_lines {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        let mut scrollbar_state = ScrollbarState::new(max_scroll + visible_lines).position(scroll);
        f.render_stateful_widget(scrollbar, inner_area, &mut scrollbar_state);
    }
}

/// Apply JSON syntax highlighting to a single line
fn highlight_json_line(line: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = line.chars().peekable();
    let mut current = String::new();
    let mut is_key = true;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if !current.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current)));
                }

                let mut string_content = String::from("\"");
                while let Some(next_c) = chars.next() {
                    string_content.push(next_c);
                    if next_c == '"' {
                        break;
                    }
                    if next_c == '\\' {
                        if let Some(escaped) = chars.next() {
                            string_content.push(escaped);
                        }
                    }
                }

                let style = if is_key {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Green)
                };
                spans.push(Span::styled(string_content, style));
            },
            ':' => {
                current.push(c);
                spans.push(Span::styled(
                    std::mem::take(&mut current),
                    Style::default().fg(Color::White),
                ));
                is_key = false;
            },
            ',' => {
                flush_value(&mut spans, &mut current);
                spans.push(Span::styled(",", Style::default().fg(Color::White)));
                is_key = true;
            },
            '{' | '}' | '[' | ']' => {
                flush_value(&mut spans, &mut current);
                spans.push(Span::styled(c.to_string(), Style::default().fg(Color::Yellow)));
                if c == '{' || c == '[' {
                    is_key = c == '{';
                }
            },
            ' ' | '\t' => {
                flush_value(&mut spans, &mut current);
                spans.push(Span::raw(c.to_string()));
            },
            _ => {
                current.push(c);
            },
        }
    }

    flush_value(&mut spans, &mut current);
    Line::from(spans)
}

fn flush_value(spans: &mut Vec<Span<'static>>, current: &mut String) {
    if !current.is_empty() {
        let style = get_json_value_style(current);
        spans.push(Span::styled(std::mem::take(current), style));
    }
}

/// Get style for JSON values (numbers, booleans, null)
fn get_json_value_style(value: &str) -> Style {
    let trimmed = value.trim();
    if trimmed == "null" {
        Style::default().fg(Color::DarkGray)
    } else if trimmed == "true" || trimmed == "false" {
        Style::default().fg(Color::Magenta)
    } else if trimmed.parse::<f64>().is_ok() {
        Style::default().fg(Color::LightBlue)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_crumb(f: &mut Frame, app: &App, area: Rect) {
    let crumb_display = app.get_breadcrumb().join(" > ");

    let mut hints: Vec<String> = Vec::new();
    if app.mode == Mode::Normal {
        if let Some(session) = app.session.as_ref() {
            let resource = session.resource();
            hints.extend(ItemCallbacks::for_session(session).item_hints());
            if resource.methods.post.is_some() {
                hints.push("n:New".to_string());
            }
            if !resource.sub_resources.is_empty() {
                hints.push("s:Sub-resources".to_string());
            }
            if !session.query_params.is_empty() {
                hints.push("f:Query".to_string());
            }
        }
    }

    let toast = app.notification_manager.current_toast();
    let toast_text = toast.map(|notif| notif.toast_message(app.notification_manager.detail_level));

    let pending = app.notification_manager.pending_count();
    let notification_indicator = if pending > 0 {
        format!(" [↻{}]", pending)
    } else {
        String::new()
    };

    let status_text = if let Some(err) = &app.error_message {
        format!("Error: {}", err)
    } else if let Some(ref toast) = toast_text {
        toast.clone()
    } else if app.is_loading() {
        "Loading...".to_string()
    } else if app.mode == Mode::Describe {
        "j/k: scroll | q/Esc: back".to_string()
    } else if app.filter_active {
        "Type to filter | Enter: apply | Esc: clear".to_string()
    } else {
        hints.join("  ")
    };

    let style = if app.error_message.is_some() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if let Some(notif) = toast {
        match &notif.status {
            NotificationStatus::Success => Style::default().fg(Color::Green),
            NotificationStatus::Error(_) => Style::default().fg(Color::Red),
            NotificationStatus::Pending => Style::default().fg(Color::Yellow),
        }
    } else if app.is_loading() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let crumb = Line::from(vec![
        Span::styled(
            format!("<{}>", crumb_display),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(status_text, style),
        Span::styled(
            notification_indicator,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    f.render_widget(Paragraph::new(crumb), area);
}

/// Rect of `percent_x` by `percent_y` centered in `r`
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
