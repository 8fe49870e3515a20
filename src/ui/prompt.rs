//! Prompts
//!
//! The `:` command box with autocomplete and the `/` filter bar.

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

pub fn render_command_box(f: &mut Frame, app: &App) {
    let area = f.area();

    // Command box at bottom of screen
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(12)])
        .split(area);

    let command_area = chunks[1];
    f.render_widget(Clear, command_area);

    let inner_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(command_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Command ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            " page · sub-resource · /location · back · new · query · refresh · quit ",
            Style::default().fg(Color::DarkGray),
        )));

    f.render_widget(
        Paragraph::new(command_line(&app.command_text, app.command_preview.as_deref())).block(input_block),
        inner_chunks[0],
    );

    let suggestions_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Suggestions (↑/↓ to select, Tab to complete) ",
            Style::default().fg(Color::DarkGray),
        ));

    let suggestions: Vec<ListItem> = app
        .command_suggestions
        .iter()
        .enumerate()
        .take(8)
        .map(|(i, cmd)| {
            let style = if i == app.command_suggestion_selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Span::styled(format!("  {}", cmd), style))
        })
        .collect();

    f.render_widget(List::new(suggestions).block(suggestions_block), inner_chunks[1]);
}

/// Typed text followed by the ghost completion, if the preview extends it
fn command_line<'a>(text: &'a str, preview: Option<&'a str>) -> Line<'a> {
    let mut spans = vec![
        Span::styled(":", Style::default().fg(Color::Cyan)),
        Span::styled(text, Style::default().fg(Color::White)),
    ];
    if let Some(rest) = preview.and_then(|p| p.strip_prefix(text)) {
        spans.push(Span::styled(rest, Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

pub fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let filter = app
        .session
        .as_ref()
        .map(|s| s.filter.as_str())
        .unwrap_or_default();

    let fields = app
        .session
        .as_ref()
        .map(|s| s.filterable_fields().join(", "))
        .unwrap_or_default();

    let mut spans = vec![
        Span::styled(
            "/",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(filter, Style::default().fg(Color::White)),
    ];
    if app.filter_active {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    if !fields.is_empty() {
        spans.push(Span::styled(
            format!("   on {}", fields),
            Style::default().fg(Color::DarkGray),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
