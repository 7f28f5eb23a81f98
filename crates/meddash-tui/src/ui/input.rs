//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. Overlays (login,
//! help, confirmations) take all input while they are shown.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use meddash_core::auth::AdminPage;

use crate::app::{can_add_email_char, can_add_password_char, App, AppState, LoginFocus};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::Initializing => {
            if key.code == KeyCode::Char('q') {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            return Ok(false);
        }
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
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
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete().await,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
                _ => {}
            }
            return Ok(false);
        }
        AppState::Normal | AppState::Quitting => {}
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('L') => app.logout(),
        KeyCode::Char('1') => app.navigate(AdminPage::Statistics).await,
        KeyCode::Char('2') => app.navigate(AdminPage::Users).await,
        KeyCode::Char('3') => app.navigate(AdminPage::Pharmacies).await,
        KeyCode::Left => {
            let page = app.current_page.prev();
            app.navigate(page).await;
        }
        KeyCode::Right => {
            let page = app.current_page.next();
            app.navigate(page).await;
        }
        KeyCode::Char('u') => app.refresh_current_page().await,
        KeyCode::Esc => app.dismiss_error(),
        KeyCode::Char('d') => app.request_delete(),
        _ => handle_table_input(app, key),
    }

    Ok(false)
}

/// Keys shared by the Users and Pharmacies tables
fn handle_table_input(app: &mut App, key: KeyEvent) {
    macro_rules! with_view {
        ($view:ident => $body:expr) => {
            match app.current_page {
                AdminPage::Users => {
                    let $view = &mut app.users;
                    $body
                }
                AdminPage::Pharmacies => {
                    let $view = &mut app.pharmacies;
                    $body
                }
                AdminPage::Statistics => {}
            }
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => with_view!(v => v.select_prev()),
        KeyCode::Down | KeyCode::Char('j') => with_view!(v => v.select_next()),
        KeyCode::Char('[') | KeyCode::PageUp => with_view!(v => v.prev_page()),
        KeyCode::Char(']') | KeyCode::PageDown => with_view!(v => v.next_page()),
        KeyCode::Char('z') => with_view!(v => v.cycle_page_size()),
        KeyCode::Char('s') => with_view!(v => v.cycle_sort_column()),
        KeyCode::Char('r') => with_view!(v => v.reverse_sort()),
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Nothing to show without a session
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}
