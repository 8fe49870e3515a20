//! Help Overlay
//!
//! Shows keyboard shortcuts and help information.

use super::centered_rect;
use crate::app::App;
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("j/k, ↑/↓", "Move up/down"),
            ("gg", "Go to top"),
            ("G", "Go to bottom"),
            ("Ctrl+d/u", "Page down/up"),
            ("[/]", "Previous/next page (] loads more on infinite lists)"),
            ("b/Backspace", "Go back"),
        ],
    ),
    (
        "Items",
        &[
            ("Enter/d", "View item details"),
            ("n", "New item"),
            ("e", "Edit item"),
            ("x/Delete", "Delete item"),
            ("a", "Custom actions"),
            ("s", "Sub-resources"),
        ],
    ),
    (
        "Query",
        &[
            ("f", "Query parameter panel"),
            ("/", "Filter loaded items"),
            ("Esc", "Clear filter"),
            ("R", "Refresh current view"),
        ],
    ),
    (
        "Commands",
        &[
            (":", "Enter command mode"),
            (":/users?page=2", "Open a location"),
            (":notifications", "Notification history"),
        ],
    ),
];

pub fn render(f: &mut Frame, _app: &App) {
    let popup_area = centered_rect(70, 80, f.area());
    f.render_widget(Clear, popup_area);

    let mut help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (title, keys) in SECTIONS {
        help_text.push(Line::from(Span::styled(
            *title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        help_text.extend(keys.iter().map(|(key, desc)| key_line(key, desc, Color::Yellow)));
        help_text.push(Line::from(""));
    }

    help_text.push(key_line("?/Esc", "Close help", Color::Yellow));
    help_text.push(key_line("q", "Quit application", Color::Yellow));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Help ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    f.render_widget(paragraph, popup_area);
}

fn key_line(key: &'static str, desc: &'static str, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<16}", key), Style::default().fg(color)),
        Span::raw(desc),
    ])
}
