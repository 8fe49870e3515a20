//! Form Popups
//!
//! The create / edit / custom-action form and the query parameter panel.
//! Both edit a [`FieldEditor`].

use super::centered_rect;
use crate::app::App;
use crate::editor::FieldEditor;
use crate::resource::{FieldType, InputField, SelectOption, SELECT_PLACEHOLDER};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

pub fn render_form(f: &mut Frame, app: &App) {
    let Some(form) = &app.form else {
        return;
    };
    render_editor(
        f,
        &form.title,
        &form.editor,
        form.error.as_deref(),
        "Tab/↑↓: field  ←/→/Space: choose  Enter: save  Esc: cancel",
    );
}

pub fn render_query_params(f: &mut Frame, app: &App) {
    let Some(editor) = &app.query_editor else {
        return;
    };
    render_editor(
        f,
        "Query",
        editor,
        None,
        "Tab/↑↓: field  ←/→/Space: choose  Enter: apply  Esc: cancel",
    );
}

fn render_editor(f: &mut Frame, title: &str, editor: &FieldEditor, error: Option<&str>, help: &str) {
    let popup_area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(if error.is_some() { 2 } else { 0 }),
            Constraint::Length(1),
        ])
        .split(inner);

    let lines: Vec<Line> = editor
        .visible_fields()
        .into_iter()
        .enumerate()
        .map(|(idx, field)| field_line(field, idx == editor.selected))
        .collect();

    // Keep the selected field in view
    let visible = chunks[0].height as usize;
    let scroll = editor.selected.saturating_sub(visible.saturating_sub(1));
    f.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), chunks[0]);

    if let Some(error) = error {
        let message = Paragraph::new(error)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        f.render_widget(message, chunks[1]);
    }

    f.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn field_line(field: &InputField, selected: bool) -> Line<'static> {
    let label_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let value = field_display(field);
    let value_style = if field.readonly {
        Style::default().fg(Color::DarkGray)
    } else if selected {
        Style::default().fg(Color::White).bg(Color::Rgb(40, 40, 60))
    } else {
        Style::default().fg(Color::White)
    };

    let marker = if selected { "▶ " } else { "  " };
    Line::from(vec![
        Span::styled(format!("{}{:<20}", marker, field.display_label()), label_style),
        Span::styled(value, value_style),
        Span::styled(
            if selected && is_text_like(field) { "_" } else { "" },
            Style::default().fg(Color::Yellow),
        ),
    ])
}

fn is_text_like(field: &InputField) -> bool {
    !field.readonly && !matches!(field.field_type, FieldType::Boolean | FieldType::Select)
}

fn field_display(field: &InputField) -> String {
    match field.field_type {
        FieldType::Boolean => {
            if field.value.is_true() {
                "[x]".to_string()
            } else {
                "[ ]".to_string()
            }
        },
        FieldType::Select => {
            let current = field.value.as_query_value();
            let shown = field
                .options
                .iter()
                .filter(|o| o.value().as_query_value() == current)
                .find_map(|o| match o {
                    SelectOption::Labeled { display, .. } => Some(display.clone()),
                    SelectOption::Plain(_) => None,
                })
                .unwrap_or(current);
            if shown.is_empty() {
                format!("‹ {} ›", SELECT_PLACEHOLDER)
            } else {
                format!("‹ {} ›", shown)
            }
        },
        FieldType::File => {
            let path = field.value.as_query_value();
            if path.is_empty() {
                "(path to file)".to_string()
            } else {
                path
            }
        },
        _ => field.value.as_query_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FieldValue;
    use serde_json::json;

    #[test]
    fn test_field_display() {
        let flag = InputField::new("published", "Published", FieldType::Boolean, FieldValue::Bool(true));
        assert_eq!(field_display(&flag), "[x]");

        let mut select = InputField::new("userId", "User", FieldType::Select, FieldValue::text("2"));
        select.options = vec![SelectOption::Labeled {
            display: "Ervin".to_string(),
            value: json!(2),
        }];
        assert_eq!(field_display(&select), "‹ Ervin ›");

        let file = InputField::new("file", "File", FieldType::File, FieldValue::default());
        assert_eq!(field_display(&file), "(path to file)");
    }
}
