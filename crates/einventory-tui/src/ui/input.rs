//! Keyboard and mouse input handling for the TUI.
//!
//! This module handles terminal events and translates them into application
//! state changes. Every event also counts as operator activity for the
//! inactivity monitor.

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, MouseEventKind};

use einventory_core::auth::ActivityKind;
use einventory_core::Location;

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus};

/// Classify a terminal event as operator activity, if it is one.
pub fn activity_kind(event: &Event) -> Option<ActivityKind> {
    match event {
        Event::Key(_) | Event::Paste(_) => Some(ActivityKind::KeyPress),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(ActivityKind::PointerMove),
            MouseEventKind::ScrollUp
            | MouseEventKind::ScrollDown
            | MouseEventKind::ScrollLeft
            | MouseEventKind::ScrollRight => Some(ActivityKind::Scroll),
            MouseEventKind::Down(_) | MouseEventKind::Up(_) => Some(ActivityKind::Click),
        },
        _ => None,
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.current_location() {
        Location::Login => handle_login_input(app, key).await,
        Location::ForgotPassword | Location::ResetPassword => {
            handle_recovery_input(app, key);
            Ok(false)
        }
        _ => {
            handle_shell_input(app, key);
            Ok(false)
        }
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::F(2) => {
            app.navigate(Location::ForgotPassword);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Left if app.login_focus == LoginFocus::Site => {
            app.cycle_site(-1);
        }
        KeyCode::Right if app.login_focus == LoginFocus::Site => {
            app.cycle_site(1);
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Button => {
                // On failure login_error is set and the view stays put
                app.attempt_login().await;
            }
            other => {
                app.login_focus = other.next();
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_form.identifier.pop();
            }
            LoginFocus::Password => {
                app.login_form.secret.pop();
            }
            LoginFocus::Site | LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_form.identifier.chars().count(), c) {
                    app.login_form.identifier.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_form.secret.chars().count(), c) {
                    app.login_form.secret.push(c);
                }
            }
            LoginFocus::Site => match c {
                'j' | 'l' => app.cycle_site(1),
                'k' | 'h' => app.cycle_site(-1),
                _ => {}
            },
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_recovery_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),
        KeyCode::Char('r') if app.current_location() == Location::ForgotPassword => {
            app.navigate(Location::ResetPassword);
        }
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        _ => {}
    }
}

fn handle_shell_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('L') => app.logout(),
        KeyCode::Up | KeyCode::Char('k') => app.sidebar_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.sidebar_next(),
        KeyCode::Enter => app.open_sidebar_selection(),
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            if let Some(location) = Location::PROTECTED.get(index).copied() {
                app.navigate(location);
            }
        }
        _ => {}
    }
}
