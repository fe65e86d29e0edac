// Keyboard event handling
//
// Maps key presses to toggles on the application state. The wall runs
// unattended, so every binding is optional.

use super::AppState;
use crossterm::event::KeyCode;

/// Handle keyboard events and update application state
///
/// Returns `true` if the application should continue running,
/// `false` if it should exit.
///
/// # Key Bindings
/// - `q`, `Q`, `Esc` - Quit the application
/// - `l`, `L` - Toggle the leaderboard panel
/// - `t`, `T` - Toggle the connection ticker
/// - `a`, `A` - Toggle camera autopan
/// - `h`, `H` - Toggle the activity heatmap
pub fn handle_key_event(app: &mut AppState, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.running = false;
            false
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.toggle_leaderboard();
            true
        }
        KeyCode::Char('t') | KeyCode::Char('T') => {
            app.toggle_ticker();
            true
        }
        KeyCode::Char('a') | KeyCode::Char('A') => {
            app.toggle_autopan();
            true
        }
        KeyCode::Char('h') | KeyCode::Char('H') => {
            app.toggle_heat();
            true
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_config;

    fn app() -> AppState {
        AppState::new(&test_config(), 0)
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();

        assert!(app.running);
        assert!(!handle_key_event(&mut app, KeyCode::Char('q')));
        assert!(!app.running);

        app.running = true;
        assert!(!handle_key_event(&mut app, KeyCode::Char('Q')));
        assert!(!app.running);

        app.running = true;
        assert!(!handle_key_event(&mut app, KeyCode::Esc));
        assert!(!app.running);
    }

    #[test]
    fn test_toggle_leaderboard() {
        let mut app = app();
        assert!(app.toggles.leaderboard);

        assert!(handle_key_event(&mut app, KeyCode::Char('l')));
        assert!(!app.toggles.leaderboard);

        handle_key_event(&mut app, KeyCode::Char('L'));
        assert!(app.toggles.leaderboard);
    }

    #[test]
    fn test_toggle_ticker() {
        let mut app = app();
        assert!(app.toggles.ticker);

        handle_key_event(&mut app, KeyCode::Char('t'));
        assert!(!app.toggles.ticker);

        handle_key_event(&mut app, KeyCode::Char('T'));
        assert!(app.toggles.ticker);
    }

    #[test]
    fn test_toggle_autopan() {
        let mut app = app();
        assert!(app.toggles.autopan);

        handle_key_event(&mut app, KeyCode::Char('a'));
        assert!(!app.toggles.autopan);

        handle_key_event(&mut app, KeyCode::Char('A'));
        assert!(app.toggles.autopan);
    }

    #[test]
    fn test_toggle_heat() {
        let mut app = app();
        assert!(!app.toggles.heat);

        handle_key_event(&mut app, KeyCode::Char('h'));
        assert!(app.toggles.heat);

        handle_key_event(&mut app, KeyCode::Char('H'));
        assert!(!app.toggles.heat);
    }

    #[test]
    fn test_unbound_keys_are_ignored() {
        let mut app = app();
        let before = app.toggles;
        for key in [KeyCode::Char('x'), KeyCode::Up, KeyCode::Tab, KeyCode::Enter] {
            assert!(handle_key_event(&mut app, key));
        }
        assert_eq!(app.toggles, before);
        assert!(app.running);
    }
}
