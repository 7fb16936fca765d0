//! Keyboard input handling for the TUI.
//!
//! Form screens send printable keys to the focused field. Every other
//! screen treats letters as commands.

use crossterm::event::{KeyCode, KeyEvent};

use ppop_core::routing::{
    optimize_path, patient_path, HOME_PATH, LOGIN_PATH, NEW_PATIENT_PATH, PATIENTS_PATH, TRY_PATH,
};
use ppop_core::Screen;

use crate::app::{App, AppState};
use crate::forms::TextForm;

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    match app.state {
        AppState::ShowingHelp => {
            app.state = AppState::Normal;
            return false;
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return true;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return false;
        }
        AppState::AddingInfusion => {
            handle_infusion_input(app, key);
            return false;
        }
        AppState::Quitting => return true,
        AppState::Normal => {}
    }

    // Any key clears the last status message
    app.status_message = None;

    if app.is_form_screen() {
        handle_form_input(app, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('h') => app.go(HOME_PATH),
        KeyCode::Char('t') => app.go(TRY_PATH),
        KeyCode::Char('l') => app.go(LOGIN_PATH),
        KeyCode::Char('p') => app.go(PATIENTS_PATH),
        KeyCode::Char('n') => app.go(NEW_PATIENT_PATH),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Char('R') => app.reload(),
        KeyCode::Esc | KeyCode::Backspace => app.back(),
        _ => handle_screen_input(app, key),
    }
    false
}

fn handle_screen_input(app: &mut App, key: KeyEvent) {
    match app.screen() {
        Screen::Patients => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                app.patients_selection = app.patients_selection.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if app.patients_selection + 1 < app.patients.len() {
                    app.patients_selection += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(id) = app.selected_patient().map(|p| p.id.clone()) {
                    app.go(&patient_path(&id));
                }
            }
            _ => {}
        },
        Screen::Patient(id) => match key.code {
            KeyCode::Char('i') => app.start_infusion(),
            KeyCode::Char('r') => app.run_prediction(),
            KeyCode::Char('e') => app.run_explanation(),
            KeyCode::Char('o') => app.go(&optimize_path(&id)),
            _ => {}
        },
        _ => {}
    }
}

fn active_form(app: &mut App) -> Option<&mut TextForm> {
    match app.screen() {
        Screen::Login => Some(&mut app.login_form),
        Screen::NewPatient => Some(&mut app.patient_form),
        Screen::Try => Some(&mut app.simulation_form),
        Screen::Optimize(_) => Some(&mut app.optimization_form),
        _ => None,
    }
}

/// Shared editing keys. Returns false for keys it does not handle.
fn edit_form(form: &mut TextForm, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.next(),
        KeyCode::BackTab | KeyCode::Up => form.prev(),
        KeyCode::Left => form.cycle(false),
        KeyCode::Right => form.cycle(true),
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => return false,
    }
    true
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.back(),
        KeyCode::Enter => app.submit_form(),
        _ => {
            if let Some(form) = active_form(app) {
                edit_form(form, key);
            }
        }
    }
}

fn handle_infusion_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.error_message = None;
        }
        KeyCode::Enter => app.submit_infusion(),
        _ => {
            edit_form(&mut app.infusion_form, key);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ppop_core::auth::{CredentialStore, MemoryStore};
    use ppop_core::{ApiClient, Config, Credential};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_at(path: &str, signed_in: bool) -> App {
        let mut store = CredentialStore::new(MemoryStore::new());
        if signed_in {
            store.save(&Credential::new("tok", "doc@example.org")).unwrap();
        }
        let mut app = App::with_parts(Config::default(), store, ApiClient::new(None).unwrap(), path);
        app.shell.hydrate();
        app
    }

    #[tokio::test]
    async fn test_quit_requires_confirmation() {
        let mut app = app_at(HOME_PATH, false);
        assert!(!handle_input(&mut app, key(KeyCode::Char('q'))));
        assert_eq!(app.state, AppState::ConfirmingQuit);
        assert!(!handle_input(&mut app, key(KeyCode::Char('n'))));
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('q')));
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_protected_shortcut_lands_on_login() {
        let mut app = app_at(HOME_PATH, false);
        handle_input(&mut app, key(KeyCode::Char('p')));
        assert_eq!(app.shell.current_path(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_typing_goes_to_login_form() {
        let mut app = app_at(HOME_PATH, false);
        handle_input(&mut app, key(KeyCode::Char('l')));
        for c in "doc@x.org".chars() {
            handle_input(&mut app, key(KeyCode::Char(c)));
        }
        // 'q' is text here, not quit
        handle_input(&mut app, key(KeyCode::Char('q')));
        assert_eq!(app.login_form.value("Email"), "doc@x.orgq");
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Esc));
        assert_eq!(app.shell.current_path(), HOME_PATH);
    }

    #[tokio::test]
    async fn test_sign_out_shortcut() {
        let mut app = app_at(HOME_PATH, true);
        handle_input(&mut app, key(KeyCode::Char('L')));
        assert!(!app.shell.is_authenticated());
        assert_eq!(app.shell.current_path(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_infusion_overlay_escape() {
        let mut app = app_at(HOME_PATH, true);
        app.go("/patients/p1");
        handle_input(&mut app, key(KeyCode::Char('i')));
        assert_eq!(app.state, AppState::AddingInfusion);

        handle_input(&mut app, key(KeyCode::Char('5')));
        assert_eq!(app.infusion_form.value("Dose (IU/kg)"), "5");

        handle_input(&mut app, key(KeyCode::Esc));
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.shell.current_path(), "/patients/p1");
    }

    #[tokio::test]
    async fn test_optimize_shortcut_from_patient() {
        let mut app = app_at(HOME_PATH, true);
        app.go("/patients/p1");
        handle_input(&mut app, key(KeyCode::Char('o')));
        assert_eq!(app.shell.current_path(), "/optimize/p1");
        assert!(app.is_form_screen());
    }
}
