//! Splash Screen
//!
//! Loading screen shown while the configuration is read and the first
//! location is fetched.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

/// Startup steps: configuration, HTTP client, first location
const STARTUP_STEPS: usize = 3;

const LOGO: [&str; 4] = [
    "  _ __ ___  ___| |_ _   _(_)",
    " | '__/ _ \\/ __| __| | | | |",
    " | | |  __/\\__ \\ |_| |_| | |",
    " |_|  \\___||___/\\__|\\__,_|_|",
];

/// Splash screen state
pub struct SplashState {
    message: String,
    /// Admin name once the configuration is known
    title: Option<String>,
    completed_steps: usize,
}

impl SplashState {
    pub fn new() -> Self {
        Self {
            message: "Initializing...".to_string(),
            title: None,
            completed_steps: 0,
        }
    }

    pub fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub fn complete_step(&mut self) {
        self.completed_steps = (self.completed_steps + 1).min(STARTUP_STEPS);
    }

    fn progress(&self) -> f64 {
        self.completed_steps as f64 / STARTUP_STEPS as f64
    }
}

impl Default for SplashState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render(f: &mut Frame, state: &SplashState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Length(10),
            Constraint::Percentage(35),
        ])
        .split(f.area());

    let center = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(60),
            Constraint::Percentage(20),
        ])
        .split(chunks[1])[1];

    let mut logo: Vec<Line> = LOGO
        .iter()
        .map(|l| Line::from(Span::styled(*l, Style::default().fg(Color::Cyan))))
        .collect();
    logo.push(Line::from(""));
    logo.push(Line::from(Span::styled(
        state
            .title
            .clone()
            .unwrap_or_else(|| "Terminal admin panel for REST APIs".to_string()),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )));

    let logo_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = logo_block.inner(center);
    f.render_widget(logo_block, center);

    let inner_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(inner);

    f.render_widget(
        Paragraph::new(logo).alignment(Alignment::Center),
        inner_chunks[0],
    );

    let progress = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent((state.progress() * 100.0) as u16)
        .label(Span::styled(
            &state.message,
            Style::default().fg(Color::White),
        ));

    f.render_widget(progress, inner_chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_capped() {
        let mut state = SplashState::new();
        for _ in 0..5 {
            state.complete_step();
        }
        assert_eq!(state.progress(), 1.0);
    }
}
