//! Header Component
//!
//! Displays the admin name, the current location and the configured pages.

use crate::app::App;
use crate::VERSION;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {} · restui v{} ", app.app_config.name, VERSION),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    // Row 1: Location
    let location = Line::from(vec![
        Span::styled(" Location: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.location.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(location), rows[0]);

    // Row 2: Current resource
    let resource_info = match app.current_resource() {
        Some(resource) => {
            let mut spans = vec![
                Span::styled(" Resource: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    resource.name.as_str(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            ];
            if let Some(description) = &resource.description {
                spans.push(Span::styled(
                    format!("  {}", description),
                    Style::default().fg(Color::Gray),
                ));
            }
            Line::from(spans)
        },
        None => Line::from(Span::styled(
            " No resource selected",
            Style::default().fg(Color::Red),
        )),
    };
    f.render_widget(Paragraph::new(resource_info), rows[1]);

    // Row 3: Pages
    let mut pages = vec![Span::styled(" Pages:", Style::default().fg(Color::DarkGray))];
    pages.extend(app.app_config.pages.iter().map(|page| {
        let style = if page.id == app.current_page {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(format!(" {} ", page.id), style)
    }));
    pages.push(Span::styled(
        "   ?:help  ::cmd  /:filter  q:quit",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(pages)), rows[2]);
}
