//! Selection state machine for one picker session.
//!
//! A [`PickerSession`] is either idle or hosting one active invocation. `show`
//! starts (or restarts) an invocation with a fresh candidate list; every
//! keystroke after that arrives as a [`Command`] through [`PickerSession::dispatch`],
//! which is the only way state changes. Committing or cancelling returns the
//! [`Outcome`] to publish and drops all per-invocation state, so a finished
//! invocation can never produce a second outcome.

use tracing::debug;

use crate::config::{resolve_prompt, Config, SelectionMode};
use crate::filter::{filter_candidates, Query};
use crate::perf::TimingGuard;
use crate::viewport::Viewport;

/// Static knobs for a session, fixed across invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub mode: SelectionMode,
    pub page_size: usize,
    pub scroll_buffer: usize,
    pub max_results: Option<usize>,
    pub default_prompt: String,
}

impl SessionOptions {
    pub fn from_config(config: &Config, surface_rows: Option<usize>) -> Self {
        SessionOptions {
            mode: config.selection_mode,
            page_size: config.get_page_size(surface_rows),
            scroll_buffer: config.scroll_buffer,
            max_results: config.max_results,
            default_prompt: config.default_prompt.clone(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions::from_config(&Config::default(), None)
    }
}

/// Engine commands. Keyboard and text-change events are translated into
/// these before they reach the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    MoveHome,
    MoveEnd,
    /// Advance the cursor, wrapping from the last match to the first
    Cycle,
    /// Toggle the highlighted item without moving (multi-select only)
    ToggleSelect,
    /// Toggle the highlighted item, then move down
    ToggleSelectAdvance,
    QueryChanged(String),
    Commit,
    Cancel,
}

/// What an invocation ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Never empty
    ItemSelected(Vec<String>),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    Active,
}

/// Per-invocation state, discarded on commit or cancel.
#[derive(Debug)]
struct Invocation {
    candidates: Vec<String>,
    prompt: String,
    query: String,
    /// Indices into `candidates`, in candidate order
    matches: Vec<usize>,
    cursor: usize,
    /// Candidate positions in toggle order
    selection: Vec<usize>,
}

impl Invocation {
    fn current(&self) -> Option<usize> {
        self.matches.get(self.cursor).copied()
    }
}

pub struct PickerSession {
    options: SessionOptions,
    viewport: Viewport,
    invocation: Option<Invocation>,
}

impl PickerSession {
    pub fn new(options: SessionOptions) -> Self {
        let viewport = Viewport::new(options.page_size, options.scroll_buffer);
        PickerSession {
            options,
            viewport,
            invocation: None,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn mode(&self) -> SelectionMode {
        self.options.mode
    }

    pub fn state(&self) -> InvocationState {
        if self.invocation.is_some() {
            InvocationState::Active
        } else {
            InvocationState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.invocation.is_some()
    }

    /// Start an invocation over `items`.
    ///
    /// Calling this while already active replaces the running invocation:
    /// the query, cursor, selection and viewport all start over and nothing
    /// is emitted for the replaced one.
    pub fn show(&mut self, items: Vec<String>, prompt: Option<&str>) {
        let prompt = resolve_prompt(prompt, &self.options.default_prompt);
        let matches = filter_candidates(&items, &Query::default(), self.options.max_results);

        if self.invocation.is_some() {
            debug!(item_count = items.len(), "Replacing active invocation");
        }

        self.invocation = Some(Invocation {
            candidates: items,
            prompt,
            query: String::new(),
            matches,
            cursor: 0,
            selection: Vec::new(),
        });
        self.viewport.reset();
    }

    /// Apply one command. Returns the outcome when the command ended the invocation.
    pub fn dispatch(&mut self, command: Command) -> Option<Outcome> {
        let _timing = TimingGuard::dispatch();
        let mode = self.options.mode;
        let page = self.viewport.page_size();

        let inv = self.invocation.as_mut()?;

        match command {
            Command::Cancel => {
                self.invocation = None;
                return Some(Outcome::Cancelled);
            }
            Command::Commit => return self.commit(),
            Command::QueryChanged(text) => {
                let query = Query::parse(&text);
                inv.matches = filter_candidates(&inv.candidates, &query, self.options.max_results);
                inv.query = text;
                inv.cursor = 0;
            }
            _ if inv.matches.is_empty() => return None,
            Command::MoveUp => inv.cursor = inv.cursor.saturating_sub(1),
            Command::MoveDown => inv.cursor = (inv.cursor + 1).min(inv.matches.len() - 1),
            Command::PageUp => inv.cursor = inv.cursor.saturating_sub(page),
            Command::PageDown => {
                inv.cursor = inv.cursor.saturating_add(page).min(inv.matches.len() - 1)
            }
            Command::MoveHome => inv.cursor = 0,
            Command::MoveEnd => inv.cursor = inv.matches.len() - 1,
            Command::Cycle => inv.cursor = (inv.cursor + 1) % inv.matches.len(),
            Command::ToggleSelect => {
                if mode.is_multi() {
                    toggle(inv);
                }
            }
            Command::ToggleSelectAdvance => {
                if mode.is_multi() {
                    toggle(inv);
                }
                inv.cursor = (inv.cursor + 1).min(inv.matches.len() - 1);
            }
        }

        let (cursor, len) = (inv.cursor, inv.matches.len());
        self.viewport.follow(cursor, len);
        None
    }

    fn commit(&mut self) -> Option<Outcome> {
        let inv = self.invocation.as_ref()?;

        let items: Vec<String> = if !inv.selection.is_empty() {
            inv.selection
                .iter()
                .map(|&idx| inv.candidates[idx].clone())
                .collect()
        } else if let Some(idx) = inv.current() {
            vec![inv.candidates[idx].clone()]
        } else {
            // Nothing matched and nothing toggled: keep waiting for input
            return None;
        };

        self.invocation = None;
        Some(Outcome::ItemSelected(items))
    }

    /// Adapt to a new surface height without losing the cursor.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.options.page_size = page_size.max(1);
        let (cursor, len) = self
            .invocation
            .as_ref()
            .map(|inv| (inv.cursor, inv.matches.len()))
            .unwrap_or((0, 0));
        self.viewport.set_page_size(page_size, cursor, len);
    }

    // ============================================================
    // READ ACCESS (used by the view model and tests)
    // ============================================================

    pub fn prompt(&self) -> Option<&str> {
        self.invocation.as_ref().map(|inv| inv.prompt.as_str())
    }

    /// The query the current match list was computed from.
    pub fn query(&self) -> Option<&str> {
        self.invocation.as_ref().map(|inv| inv.query.as_str())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.invocation.as_ref().map(|inv| inv.cursor)
    }

    pub fn candidate_count(&self) -> usize {
        self.invocation.as_ref().map_or(0, |inv| inv.candidates.len())
    }

    pub fn match_count(&self) -> usize {
        self.invocation.as_ref().map_or(0, |inv| inv.matches.len())
    }

    /// Candidate positions of the current matches, in order.
    pub fn match_positions(&self) -> &[usize] {
        self.invocation
            .as_ref()
            .map_or(&[][..], |inv| inv.matches.as_slice())
    }

    /// Current match lines, in order.
    pub fn matches(&self) -> Vec<&str> {
        self.invocation.as_ref().map_or_else(Vec::new, |inv| {
            inv.matches
                .iter()
                .map(|&idx| inv.candidates[idx].as_str())
                .collect()
        })
    }

    pub fn candidate(&self, position: usize) -> Option<&str> {
        self.invocation
            .as_ref()
            .and_then(|inv| inv.candidates.get(position))
            .map(String::as_str)
    }

    /// The highlighted line, if any match exists.
    pub fn current_item(&self) -> Option<&str> {
        let inv = self.invocation.as_ref()?;
        inv.current().map(|idx| inv.candidates[idx].as_str())
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.invocation
            .as_ref()
            .is_some_and(|inv| inv.selection.contains(&position))
    }

    /// Toggled lines in toggle order.
    pub fn selected_items(&self) -> Vec<&str> {
        self.invocation.as_ref().map_or_else(Vec::new, |inv| {
            inv.selection
                .iter()
                .map(|&idx| inv.candidates[idx].as_str())
                .collect()
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}

/// Flip membership of the highlighted candidate, keeping toggle order.
fn toggle(inv: &mut Invocation) {
    let Some(idx) = inv.current() else {
        return;
    };
    if let Some(pos) = inv.selection.iter().position(|&x| x == idx) {
        inv.selection.remove(pos);
    } else {
        inv.selection.push(idx);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
