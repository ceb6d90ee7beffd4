//! Terminal host surface built on crossterm.
//!
//! [`TerminalSurface`] puts the terminal in raw mode on the alternate screen
//! and restores it on drop. [`spawn_input_thread`] turns terminal events into
//! [`ServiceEvent`]s for the service loop.
//!
//! Layout, top to bottom: the prompt line, one row per visible match, then
//! the status line.

use std::io::{self, IsTerminal, Stdout, Write};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, Event, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, Clear, ClearType,
    EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{ExecutableCommand, QueueableCommand};
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthChar;

use crate::error::{PickerError, Result};
use crate::service::{ServiceEvent, Surface};
use crate::view::PromptView;

/// Lets the terminal report Shift+Enter as distinct from Enter
const KEYBOARD_FLAGS: KeyboardEnhancementFlags = KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES;

/// Marker drawn before toggled rows in multi-select mode
const SELECTED_MARK: &str = "* ";
const UNSELECTED_MARK: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Prompt,
    Row,
    Highlighted,
    Status,
}

/// One screen line, already clipped to the terminal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

/// Lines for one frame of `view` on a terminal `cols` wide.
pub fn layout(view: &PromptView, cols: u16) -> Vec<Line> {
    let width = cols as usize;
    let mut lines = Vec::with_capacity(view.rows.len() + 2);

    lines.push(Line {
        text: clip(&format!("{} {}", view.prompt, view.input), width),
        style: LineStyle::Prompt,
    });

    for row in &view.rows {
        let mark = if view.mode.is_multi() {
            if row.selected {
                SELECTED_MARK
            } else {
                UNSELECTED_MARK
            }
        } else {
            ""
        };
        lines.push(Line {
            text: clip(&format!("{}{}", mark, row.text), width),
            style: if row.highlighted {
                LineStyle::Highlighted
            } else {
                LineStyle::Row
            },
        });
    }

    lines.push(Line {
        text: clip(&view.status_line(), width),
        style: LineStyle::Status,
    });
    lines
}

/// Fit `text` into `width` terminal columns.
///
/// Candidates come from arbitrary callers, so control characters are never
/// passed through to the terminal. Tabs become a single space.
fn clip(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len().min(width * 4));
    let mut used = 0;
    for c in text.chars() {
        let c = match c {
            '\t' => ' ',
            c if c.is_control() => continue,
            c => c,
        };
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

fn terminal_err(e: io::Error) -> PickerError {
    PickerError::Terminal(e.to_string())
}

/// Current terminal size as (cols, rows).
pub fn size() -> Result<(u16, u16)> {
    terminal::size().map_err(terminal_err)
}

pub struct TerminalSurface {
    out: Stdout,
    cols: u16,
    active: bool,
    keyboard_enhanced: bool,
}

impl TerminalSurface {
    /// Enter raw mode and the alternate screen.
    pub fn attach() -> Result<Self> {
        let mut out = io::stdout();
        if !out.is_terminal() {
            return Err(PickerError::Terminal("stdout is not a terminal".to_string()));
        }
        let (cols, rows) = size()?;

        enable_raw_mode().map_err(terminal_err)?;
        let mut surface = TerminalSurface {
            out: io::stdout(),
            cols,
            active: true,
            keyboard_enhanced: false,
        };
        out.execute(EnterAlternateScreen).map_err(terminal_err)?;
        out.execute(Hide).map_err(terminal_err)?;
        if supports_keyboard_enhancement().unwrap_or(false) {
            out.execute(PushKeyboardEnhancementFlags(KEYBOARD_FLAGS))
                .map_err(terminal_err)?;
            surface.keyboard_enhanced = true;
        } else {
            debug!("Keyboard enhancement unsupported, Shift+Enter reads as Enter");
        }
        surface.clear().map_err(terminal_err)?;

        info!(
            cols = cols,
            rows = rows,
            keyboard_enhanced = surface.keyboard_enhanced,
            "Terminal surface attached"
        );
        Ok(surface)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.out
            .queue(Clear(ClearType::All))?
            .queue(MoveTo(0, 0))?;
        self.out.flush()
    }

    fn paint(&mut self, view: &PromptView) -> io::Result<()> {
        if let Ok((cols, _)) = terminal::size() {
            self.cols = cols;
        }
        self.out.queue(Clear(ClearType::All))?;

        for (row, line) in (0u16..).zip(layout(view, self.cols)) {
            self.out.queue(MoveTo(0, row))?;
            match line.style {
                LineStyle::Highlighted => {
                    self.out
                        .queue(SetAttribute(Attribute::Reverse))?
                        .queue(Print(&line.text))?
                        .queue(SetAttribute(Attribute::Reset))?;
                }
                LineStyle::Prompt | LineStyle::Status => {
                    self.out
                        .queue(SetAttribute(Attribute::Bold))?
                        .queue(Print(&line.text))?
                        .queue(SetAttribute(Attribute::Reset))?;
                }
                LineStyle::Row => {
                    self.out.queue(Print(&line.text))?;
                }
            }
        }
        self.out.flush()
    }
}

impl Surface for TerminalSurface {
    fn draw(&mut self, view: Option<&PromptView>) -> Result<()> {
        match view {
            Some(view) => self.paint(view),
            None => self.clear(),
        }
        .map_err(terminal_err)
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if self.keyboard_enhanced {
            let _ = self.out.execute(PopKeyboardEnhancementFlags);
        }
        let _ = self.out.execute(Show);
        let _ = self.out.execute(LeaveAlternateScreen);
        let _ = self.out.flush();
        let _ = disable_raw_mode();
        debug!("Terminal restored");
    }
}

/// Read terminal events on a background thread and forward them to the loop.
///
/// A read failure asks the service to shut down.
pub fn spawn_input_thread(events: Sender<ServiceEvent>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("terminal-input".to_string())
        .spawn(move || loop {
            let forwarded = match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    events.send(ServiceEvent::Key(key))
                }
                Ok(Event::Resize(cols, rows)) => events.send(ServiceEvent::Resize { cols, rows }),
                Ok(_) => Ok(()),
                Err(e) => {
                    warn!(error = %e, "Terminal input failed");
                    let _ = events.send(ServiceEvent::Shutdown);
                    break;
                }
            };
            if forwarded.is_err() {
                debug!("Service loop gone, input thread exiting");
                break;
            }
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionMode;
    use crate::view::RowView;

    fn row(text: &str, highlighted: bool, selected: bool) -> RowView {
        RowView {
            match_index: 0,
            position: 0,
            text: text.to_string(),
            highlighted,
            selected,
        }
    }

    fn view(mode: SelectionMode, rows: Vec<RowView>) -> PromptView {
        PromptView {
            prompt: "run:".to_string(),
            input: "fo".to_string(),
            match_count: rows.len(),
            candidate_count: 5,
            selected_count: rows.iter().filter(|r| r.selected).count(),
            rows,
            mode,
        }
    }

    #[test]
    fn test_layout_prompt_rows_status() {
        let lines = layout(
            &view(
                SelectionMode::Single,
                vec![row("foo", true, false), row("food", false, false)],
            ),
            80,
        );
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["run: fo", "foo", "food", "2/5"]);
        assert_eq!(lines[0].style, LineStyle::Prompt);
        assert_eq!(lines[1].style, LineStyle::Highlighted);
        assert_eq!(lines[2].style, LineStyle::Row);
        assert_eq!(lines[3].style, LineStyle::Status);
    }

    #[test]
    fn test_layout_marks_selection_in_multi_mode() {
        let lines = layout(
            &view(
                SelectionMode::Multi,
                vec![row("foo", false, true), row("food", true, false)],
            ),
            80,
        );
        assert_eq!(lines[1].text, "* foo");
        assert_eq!(lines[2].text, "  food");
        assert_eq!(lines[3].text, "2/5 (1 selected)");
    }

    #[test]
    fn test_layout_clips_to_width() {
        let lines = layout(
            &view(SelectionMode::Single, vec![row("ünïcödé line", false, false)]),
            4,
        );
        assert_eq!(lines[0].text, "run:");
        assert_eq!(lines[1].text, "ünïc");
    }

    #[test]
    fn test_clip_counts_wide_chars_as_two_columns() {
        assert_eq!(clip("日本語", 4), "日本");
        assert_eq!(clip("日本語", 5), "日本");
        assert_eq!(clip("a日b", 3), "a日");
    }

    #[test]
    fn test_clip_strips_control_characters() {
        assert_eq!(clip("evil\x1b[2Jrow", 80), "evil[2Jrow");
        assert_eq!(clip("bell\x07\r", 80), "bell");
        assert_eq!(clip("a\tb", 80), "a b");
    }

    #[test]
    fn test_layout_keeps_escape_bytes_out_of_rows() {
        let lines = layout(
            &view(SelectionMode::Single, vec![row("\x1b]0;title\x07x", false, false)]),
            80,
        );
        assert!(lines.iter().all(|l| !l.text.chars().any(char::is_control)));
        assert_eq!(lines[1].text, "]0;titlex");
    }

    #[test]
    fn test_keyboard_flags_disambiguate_shift_enter() {
        assert!(KEYBOARD_FLAGS.contains(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES));
        assert!(!KEYBOARD_FLAGS.contains(KeyboardEnhancementFlags::REPORT_EVENT_TYPES));
    }
}
