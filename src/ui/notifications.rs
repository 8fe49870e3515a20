//! Notifications Panel UI
//!
//! History of create, update, delete and custom action results.

use super::centered_rect;
use super::view::truncate_string;
use crate::app::App;
use crate::notification::NotificationStatus;
use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};
use std::time::Duration;

/// Render the notifications history panel as an overlay
pub fn render(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, popup_area);

    let pending = app.notification_manager.pending_count();
    let title = if pending > 0 {
        format!(" Notifications [{} pending] ", pending)
    } else {
        " Notifications ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(popup_area);
    f.render_widget(block, popup_area);

    if app.notification_manager.notifications.is_empty() {
        let msg = Paragraph::new("No notifications yet")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(msg, inner_area);
        return;
    }

    let header_cells = [" STATUS", " ACTION", " RESOURCE", " ITEM", " DURATION", " TIME AGO"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
    let header = Row::new(header_cells).height(1);

    let rows = app.notification_manager.notifications.iter().map(|notif| {
        let status_color = match &notif.status {
            NotificationStatus::Pending => Color::Yellow,
            NotificationStatus::Success => Color::Green,
            NotificationStatus::Error(_) => Color::Red,
        };

        Row::new(vec![
            Cell::from(format!(" {}", notif.status.icon())).style(Style::default().fg(status_color)),
            Cell::from(format!(" {}", notif.operation_type.display_name())),
            Cell::from(format!(" {}", truncate_string(&notif.resource_name, 20))),
            Cell::from(format!(" {}", truncate_string(&notif.item_label, 30))),
            Cell::from(format!(" {}", notif.duration_display())),
            Cell::from(format!(" {}", format_time_ago(notif.created_at.elapsed()))),
        ])
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Length(16),
        Constraint::Length(20),
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths).header(header).row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    state.select(Some(app.notifications_selected));
    f.render_stateful_widget(table, inner_area, &mut state);

    // Selected error in full at the bottom
    let footer_area = Rect::new(
        popup_area.x + 1,
        popup_area.y + popup_area.height.saturating_sub(1),
        popup_area.width.saturating_sub(2),
        1,
    );
    let selected_error = app
        .notification_manager
        .notifications
        .get(app.notifications_selected)
        .and_then(|n| match &n.status {
            NotificationStatus::Error(e) => Some(e.clone()),
            _ => None,
        });
    let footer = match selected_error {
        Some(err) => Line::from(Span::styled(err, Style::default().fg(Color::Red))),
        None => Line::from(vec![
            Span::styled("j/k", Style::default().fg(Color::Yellow)),
            Span::raw(": navigate  "),
            Span::styled("c", Style::default().fg(Color::Yellow)),
            Span::raw(": clear all  "),
            Span::styled("q/Esc", Style::default().fg(Color::Yellow)),
            Span::raw(": close"),
        ]),
    };
    f.render_widget(Paragraph::new(footer).alignment(Alignment::Center), footer_area);
}

/// Format elapsed time as human-readable string
fn format_time_ago(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_ago() {
        assert_eq!(format_time_ago(Duration::from_secs(5)), "5s ago");
        assert_eq!(format_time_ago(Duration::from_secs(125)), "2m ago");
        assert_eq!(format_time_ago(Duration::from_secs(7300)), "2h ago");
    }
}
