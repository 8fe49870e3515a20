//! Dialog Components
//!
//! Delete confirmation and the action / sub-resource chooser.

use super::centered_rect;
use crate::app::{App, Mode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    match app.mode {
        Mode::Confirm => render_confirm_dialog(f, app),
        Mode::Menu => render_menu(f, app),
        _ => {},
    }
}

fn render_confirm_dialog(f: &mut Frame, app: &App) {
    let Some(pending) = &app.pending_action else {
        return;
    };

    let popup_area = centered_rect(50, 25, f.area());
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            format!(" Delete {} ", pending.item_label),
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let content_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(inner);

    let message = Paragraph::new(Line::from(Span::styled(
        pending.message.as_str(),
        Style::default().fg(Color::White),
    )))
    .alignment(Alignment::Center);
    f.render_widget(message, content_chunks[0]);

    let selected = |on: bool, bg: Color| {
        if on {
            Style::default()
                .fg(Color::Black)
                .bg(bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let buttons = Line::from(vec![
        Span::styled(" Yes (y) ", selected(pending.selected_yes, Color::Red)),
        Span::raw("    "),
        Span::styled(" No (n) ", selected(!pending.selected_yes, Color::White)),
    ]);

    f.render_widget(
        Paragraph::new(buttons).alignment(Alignment::Center),
        content_chunks[2],
    );
}

fn render_menu(f: &mut Frame, app: &App) {
    let Some(menu) = &app.menu else {
        return;
    };

    let popup_area = centered_rect(40, 40, f.area());
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", menu.title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" Enter: run  Esc: close ").alignment(Alignment::Center));

    let items: Vec<ListItem> = menu
        .entries
        .iter()
        .map(|entry| ListItem::new(format!("  {}", entry)))
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default().with_selected(Some(menu.selected));
    f.render_stateful_widget(list, popup_area, &mut state);
}
