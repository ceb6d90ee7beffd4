//! Key handling: terminal key events to engine commands.
//!
//! The keymap owns the typed query text. Editing keys change that text and
//! report the new value; everything else maps to a [`Command`] according to
//! the selection mode:
//!
//! | Key | single | multi |
//! |---|---|---|
//! | Enter | commit | commit |
//! | Shift+Enter | commit | toggle + advance |
//! | Tab | cycle | toggle + advance |
//! | Ctrl+Space | - | toggle |
//! | Shift+Tab, Up, Ctrl+P | up | up |
//! | Down, Ctrl+N | down | down |
//! | PageUp / PageDown, Home / End | page / jump | page / jump |
//! | Esc, Ctrl+C, Ctrl+G | cancel | cancel |
//!
//! Query editing: printable characters append, Backspace deletes one char,
//! Ctrl+U clears the line, Ctrl+W deletes the previous word.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::SelectionMode;
use crate::logging;
use crate::session::Command;

/// What a key press asks the service to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Run a command right away
    Command(Command),
    /// The query text changed; recompute (possibly debounced)
    QueryEdited(String),
}

pub struct Keymap {
    mode: SelectionMode,
    input: String,
}

impl Keymap {
    pub fn new(mode: SelectionMode) -> Self {
        Keymap {
            mode,
            input: String::new(),
        }
    }

    /// Current typed text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Forget the typed text; called when a new invocation starts.
    pub fn reset(&mut self) {
        self.input.clear();
    }

    pub fn handle(&mut self, key: KeyEvent) -> Option<KeyAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        let action = self.translate(key);
        if let Some(action) = &action {
            let (name, modifiers) = describe_key(&key);
            let label = match action {
                KeyAction::Command(command) => format!("{:?}", command),
                KeyAction::QueryEdited(_) => "edit".to_string(),
            };
            logging::log_key_event(&name, &modifiers, &label);
        }
        action
    }

    fn translate(&mut self, key: KeyEvent) -> Option<KeyAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let multi = self.mode.is_multi();

        let command = match key.code {
            KeyCode::Esc => Command::Cancel,
            KeyCode::Char('c') | KeyCode::Char('g') if ctrl => Command::Cancel,

            KeyCode::Enter if shift && multi => Command::ToggleSelectAdvance,
            KeyCode::Enter => Command::Commit,

            KeyCode::Tab if multi => Command::ToggleSelectAdvance,
            KeyCode::Tab => Command::Cycle,
            KeyCode::BackTab => Command::MoveUp,
            KeyCode::Char(' ') if ctrl => {
                if !multi {
                    return None;
                }
                Command::ToggleSelect
            }

            KeyCode::Up => Command::MoveUp,
            KeyCode::Char('p') if ctrl => Command::MoveUp,
            KeyCode::Down => Command::MoveDown,
            KeyCode::Char('n') if ctrl => Command::MoveDown,
            KeyCode::PageUp => Command::PageUp,
            KeyCode::PageDown => Command::PageDown,
            KeyCode::Home => Command::MoveHome,
            KeyCode::End => Command::MoveEnd,

            KeyCode::Backspace => return self.edit(|input| input.pop().is_some()),
            KeyCode::Char('u') if ctrl => {
                return self.edit(|input| {
                    let changed = !input.is_empty();
                    input.clear();
                    changed
                })
            }
            KeyCode::Char('w') if ctrl => return self.edit(delete_previous_word),
            KeyCode::Char(c) if !ctrl && !alt => {
                return self.edit(|input| {
                    input.push(c);
                    true
                })
            }

            _ => return None,
        };
        Some(KeyAction::Command(command))
    }

    fn edit(&mut self, apply: impl FnOnce(&mut String) -> bool) -> Option<KeyAction> {
        apply(&mut self.input).then(|| KeyAction::QueryEdited(self.input.clone()))
    }
}

/// Remove trailing whitespace, then the word before it.
fn delete_previous_word(input: &mut String) -> bool {
    let trimmed = input.trim_end_matches(char::is_whitespace);
    let cut = trimmed
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);
    if cut == input.len() {
        return false;
    }
    input.truncate(cut);
    true
}

/// Key name and modifier list for logs.
fn describe_key(key: &KeyEvent) -> (String, String) {
    let name = match key.code {
        KeyCode::Char(c) => c.to_string(),
        other => format!("{:?}", other).to_lowercase(),
    };
    let modifiers = if key.modifiers.is_empty() {
        "none".to_string()
    } else {
        format!("{:?}", key.modifiers).to_lowercase()
    };
    (name, modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn command(keymap: &mut Keymap, key: KeyEvent) -> Option<Command> {
        match keymap.handle(key) {
            Some(KeyAction::Command(command)) => Some(command),
            _ => None,
        }
    }

    #[test]
    fn test_single_mode_tab_cycles_and_enter_commits() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        assert_eq!(command(&mut keymap, press(KeyCode::Tab)), Some(Command::Cycle));
        assert_eq!(
            command(&mut keymap, press(KeyCode::Enter)),
            Some(Command::Commit)
        );
        let shift_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT);
        assert_eq!(command(&mut keymap, shift_enter), Some(Command::Commit));
        assert_eq!(keymap.handle(ctrl(' ')), None);
    }

    #[test]
    fn test_multi_mode_toggle_bindings() {
        let mut keymap = Keymap::new(SelectionMode::Multi);
        assert_eq!(
            command(&mut keymap, press(KeyCode::Tab)),
            Some(Command::ToggleSelectAdvance)
        );
        let shift_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT);
        assert_eq!(
            command(&mut keymap, shift_enter),
            Some(Command::ToggleSelectAdvance)
        );
        assert_eq!(
            command(&mut keymap, ctrl(' ')),
            Some(Command::ToggleSelect)
        );
        assert_eq!(
            command(&mut keymap, press(KeyCode::Enter)),
            Some(Command::Commit)
        );
    }

    #[test]
    fn test_cancel_keys() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        assert_eq!(
            command(&mut keymap, press(KeyCode::Esc)),
            Some(Command::Cancel)
        );
        assert_eq!(command(&mut keymap, ctrl('c')), Some(Command::Cancel));
        assert_eq!(command(&mut keymap, ctrl('g')), Some(Command::Cancel));
    }

    #[test]
    fn test_navigation_keys() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        let cases = [
            (press(KeyCode::Up), Command::MoveUp),
            (ctrl('p'), Command::MoveUp),
            (press(KeyCode::BackTab), Command::MoveUp),
            (press(KeyCode::Down), Command::MoveDown),
            (ctrl('n'), Command::MoveDown),
            (press(KeyCode::PageUp), Command::PageUp),
            (press(KeyCode::PageDown), Command::PageDown),
            (press(KeyCode::Home), Command::MoveHome),
            (press(KeyCode::End), Command::MoveEnd),
        ];
        for (key, expected) in cases {
            assert_eq!(command(&mut keymap, key), Some(expected));
        }
    }

    #[test]
    fn test_typing_builds_query() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        keymap.handle(press(KeyCode::Char('f')));
        let action = keymap.handle(KeyEvent::new(KeyCode::Char('I'), KeyModifiers::SHIFT));
        assert_eq!(action, Some(KeyAction::QueryEdited("fI".to_string())));
        assert_eq!(keymap.input(), "fI");
    }

    #[test]
    fn test_backspace_on_empty_is_ignored() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        assert_eq!(keymap.handle(press(KeyCode::Backspace)), None);
        keymap.handle(press(KeyCode::Char('a')));
        assert_eq!(
            keymap.handle(press(KeyCode::Backspace)),
            Some(KeyAction::QueryEdited(String::new()))
        );
    }

    #[test]
    fn test_ctrl_u_clears_line() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        for c in "abc".chars() {
            keymap.handle(press(KeyCode::Char(c)));
        }
        assert_eq!(
            keymap.handle(ctrl('u')),
            Some(KeyAction::QueryEdited(String::new()))
        );
        assert_eq!(keymap.handle(ctrl('u')), None);
    }

    #[test]
    fn test_ctrl_w_deletes_previous_word() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        for c in "open file  ".chars() {
            keymap.handle(press(KeyCode::Char(c)));
        }
        assert_eq!(
            keymap.handle(ctrl('w')),
            Some(KeyAction::QueryEdited("open ".to_string()))
        );
        assert_eq!(
            keymap.handle(ctrl('w')),
            Some(KeyAction::QueryEdited(String::new()))
        );
        assert_eq!(keymap.handle(ctrl('w')), None);
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        let mut key = press(KeyCode::Enter);
        key.kind = KeyEventKind::Release;
        assert_eq!(keymap.handle(key), None);
    }

    #[test]
    fn test_alt_chars_do_not_edit() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT);
        assert_eq!(keymap.handle(key), None);
        assert_eq!(keymap.input(), "");
    }

    #[test]
    fn test_reset_clears_input() {
        let mut keymap = Keymap::new(SelectionMode::Single);
        keymap.handle(press(KeyCode::Char('z')));
        keymap.reset();
        assert_eq!(keymap.input(), "");
    }
}
