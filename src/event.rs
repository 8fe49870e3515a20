//! Event Handling
//!
//! Keyboard and event handling for restui.

use crate::app::{App, Mode};
use crate::resource::FieldType;
use crate::ui::view::ItemCallbacks;
use anyhow::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use std::time::Duration;

/// Handle events, returns true if app should quit
pub async fn handle_events(app: &mut App) -> Result<bool> {
    if poll(Duration::from_millis(100))? {
        if let Event::Key(key) = read()? {
            return handle_key_event(app, key.code, key.modifiers).await;
        }
    }
    Ok(false)
}

pub async fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    // Global quit shortcut
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match app.mode {
        Mode::Normal => handle_normal_mode(app, code, modifiers).await,
        Mode::Command => handle_command_mode(app, code, modifiers).await,
        Mode::Help => handle_help_mode(app, code),
        Mode::Confirm => handle_confirm_mode(app, code).await,
        Mode::Describe => handle_describe_mode(app, code, modifiers),
        Mode::Form => handle_form_mode(app, code, modifiers).await,
        Mode::QueryParams => handle_query_mode(app, code, modifiers).await,
        Mode::Menu => handle_menu_mode(app, code).await,
        Mode::Notifications => handle_notifications_mode(app, code),
    }
}

async fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    // Any key dismisses the last error
    app.error_message = None;

    // Double-g goes to top
    if code == KeyCode::Char('g') && !app.filter_active {
        if let Some((KeyCode::Char('g'), time)) = app.last_key_press {
            if time.elapsed() < Duration::from_millis(1000) {
                app.go_to_top();
                app.last_key_press = None;
                return Ok(false);
            }
        }
        app.last_key_press = Some((code, std::time::Instant::now()));
        return Ok(false);
    }
    app.last_key_press = None;

    if app.filter_active {
        match code {
            KeyCode::Esc => app.clear_filter(),
            KeyCode::Enter => app.filter_active = false,
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                app.push_filter_char(c);
            },
            _ => {},
        }
        return Ok(false);
    }

    let callbacks = app
        .session
        .as_ref()
        .map(ItemCallbacks::for_session)
        .unwrap_or_default();
    let infinite = app.session.as_ref().is_some_and(|s| s.is_infinite_scroll());

    match code {
        KeyCode::Char('q') => return Ok(true),

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            let at_end = app.selected + 1 >= app.item_count();
            if infinite && at_end && !app.is_loading() {
                app.load_more().await?;
            }
            app.next();
        },
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Home => app.go_to_top(),
        KeyCode::End | KeyCode::Char('G') => app.go_to_bottom(),
        KeyCode::PageDown => app.page_down(10),
        KeyCode::PageUp => app.page_up(10),
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.page_down(10);
        },
        KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.page_up(10);
        },

        // Pagination
        KeyCode::Char(']') if callbacks.get_next_page.is_some() => {
            if infinite {
                app.load_more().await?;
            } else {
                app.next_page().await?;
            }
        },
        KeyCode::Char('[') if callbacks.get_previous_page.is_some() => {
            app.prev_page().await?;
        },

        // Item operations
        KeyCode::Enter | KeyCode::Char('d') if callbacks.details.is_some() => {
            app.open_details().await?;
        },
        KeyCode::Char('e') if callbacks.put.is_some() => {
            app.open_edit_form().await?;
        },
        KeyCode::Char('x') | KeyCode::Delete if callbacks.delete.is_some() => {
            app.request_delete();
        },
        KeyCode::Char('a') if callbacks.action.is_some() => {
            app.open_actions_menu();
        },
        KeyCode::Char('n') => app.open_create_form(),
        KeyCode::Char('s') => app.open_sub_resources_menu(),
        KeyCode::Char('f') => app.enter_query_mode(),

        KeyCode::Char('R') => {
            app.refresh_current().await?;
        },
        KeyCode::Char('/') => app.start_filter(),
        KeyCode::Char(':') => app.enter_command_mode(),
        KeyCode::Char('?') => app.enter_help_mode(),

        // Back navigation
        KeyCode::Backspace | KeyCode::Left | KeyCode::Char('b') => {
            app.navigate_back().await?;
        },

        _ => {},
    }

    Ok(false)
}

async fn handle_command_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc => {
            app.exit_mode();
        },
        KeyCode::Enter => {
            // Commands choose the next mode themselves
            return app.execute_command().await;
        },
        KeyCode::Backspace => {
            app.command_text.pop();
            app.update_command_suggestions();
        },
        KeyCode::Tab | KeyCode::Right => {
            app.apply_suggestion();
        },
        KeyCode::Down => {
            app.next_suggestion();
        },
        KeyCode::Up => {
            app.prev_suggestion();
        },
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            app.command_text.push(c);
            app.update_command_suggestions();
        },
        _ => {},
    }
    Ok(false)
}

fn handle_help_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
            app.exit_mode();
        },
        _ => {},
    }
    Ok(false)
}

async fn handle_confirm_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
            app.confirm_pending(false).await?;
        },
        KeyCode::Left | KeyCode::Char('h') => {
            if let Some(ref mut pending) = app.pending_action {
                pending.selected_yes = true;
            }
        },
        KeyCode::Right | KeyCode::Char('l') => {
            if let Some(ref mut pending) = app.pending_action {
                pending.selected_yes = false;
            }
        },
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.confirm_pending(true).await?;
        },
        KeyCode::Enter => {
            let approved = app.pending_action.as_ref().is_some_and(|p| p.selected_yes);
            app.confirm_pending(approved).await?;
        },
        _ => {},
    }
    Ok(false)
}

async fn handle_form_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc => app.exit_mode(),
        KeyCode::Enter => {
            app.submit_form().await?;
        },
        _ => {
            if let Some(form) = app.form.as_mut() {
                form.error = None;
                edit_field(&mut form.editor, code, modifiers);
            }
        },
    }
    Ok(false)
}

async fn handle_query_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc => app.exit_mode(),
        KeyCode::Enter => {
            app.submit_query_panel().await?;
        },
        _ => {
            if let Some(editor) = app.query_editor.as_mut() {
                edit_field(editor, code, modifiers);
            }
        },
    }
    Ok(false)
}

/// Keys shared by the item form and the query panel
fn edit_field(editor: &mut crate::editor::FieldEditor, code: KeyCode, modifiers: KeyModifiers) {
    let choice = editor
        .current()
        .is_some_and(|f| matches!(f.field_type, FieldType::Boolean | FieldType::Select));

    match code {
        KeyCode::Tab | KeyCode::Down => editor.next(),
        KeyCode::BackTab | KeyCode::Up => editor.previous(),
        KeyCode::Right => editor.toggle(),
        KeyCode::Left => editor.toggle_back(),
        KeyCode::Char(' ') if choice => editor.toggle(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => editor.input_char(c),
        _ => {},
    }
}

async fn handle_menu_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => app.exit_mode(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Enter => {
            app.select_menu_entry().await?;
        },
        _ => {},
    }
    Ok(false)
}

fn handle_notifications_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => app.exit_mode(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Char('g') | KeyCode::Home => app.go_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.go_to_bottom(),
        KeyCode::Char('c') => {
            app.notification_manager.clear();
            app.notifications_selected = 0;
        },
        _ => {},
    }
    Ok(false)
}

fn handle_describe_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => {
            app.exit_mode();
        },
        KeyCode::Char('j') | KeyCode::Down => {
            app.describe_scroll = app.describe_scroll.saturating_add(1);
        },
        KeyCode::Char('k') | KeyCode::Up => {
            app.describe_scroll = app.describe_scroll.saturating_sub(1);
        },
        KeyCode::PageDown => {
            app.describe_scroll = app.describe_scroll.saturating_add(10);
        },
        KeyCode::PageUp => {
            app.describe_scroll = app.describe_scroll.saturating_sub(10);
        },
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.describe_scroll = app.describe_scroll.saturating_add(10);
        },
        KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.describe_scroll = app.describe_scroll.saturating_sub(10);
        },
        KeyCode::Char('g') | KeyCode::Home => {
            app.describe_scroll = 0;
        },
        KeyCode::Char('G') | KeyCode::End => {
            app.describe_scroll_to_bottom(app.viewport_height);
        },
        _ => {},
    }
    Ok(false)
}
