//! View model for the prompt.
//!
//! [`PromptView::from_session`] is a pure function of session state: it lists
//! the rows inside the viewport with their highlight and selection flags.
//! Surfaces draw this and nothing else, so everything a surface must show is
//! decided (and tested) here.

use crate::config::SelectionMode;
use crate::session::PickerSession;

/// One visible match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Index in the match list
    pub match_index: usize,
    /// Position in the caller's candidate list
    pub position: usize,
    pub text: String,
    /// Under the cursor
    pub highlighted: bool,
    /// Toggled in multi-select mode
    pub selected: bool,
}

/// Everything a surface needs to draw one frame of an active prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub prompt: String,
    /// Text in the input line; may run ahead of the filtered rows while a
    /// recompute is debounced
    pub input: String,
    pub rows: Vec<RowView>,
    pub match_count: usize,
    pub candidate_count: usize,
    pub selected_count: usize,
    pub mode: SelectionMode,
}

impl PromptView {
    /// Build the view for an active session; `None` while idle.
    ///
    /// `input` is the text the user has typed. Pass `None` to show the query
    /// the session last filtered with.
    pub fn from_session(session: &PickerSession, input: Option<&str>) -> Option<Self> {
        let prompt = session.prompt()?;
        let cursor = session.cursor();
        let positions = session.match_positions();
        let range = session.viewport().range(positions.len());

        let rows = positions[range.clone()]
            .iter()
            .zip(range)
            .map(|(&position, match_index)| RowView {
                match_index,
                position,
                text: session.candidate(position).unwrap_or_default().to_string(),
                highlighted: cursor == Some(match_index),
                selected: session.is_selected(position),
            })
            .collect();

        Some(PromptView {
            prompt: prompt.to_string(),
            input: input
                .or_else(|| session.query())
                .unwrap_or_default()
                .to_string(),
            rows,
            match_count: positions.len(),
            candidate_count: session.candidate_count(),
            selected_count: session.selected_items().len(),
            mode: session.mode(),
        })
    }

    /// "matches/total" counter, with the selection count in multi mode.
    pub fn status_line(&self) -> String {
        if self.mode.is_multi() && self.selected_count > 0 {
            format!(
                "{}/{} ({} selected)",
                self.match_count, self.candidate_count, self.selected_count
            )
        } else {
            format!("{}/{}", self.match_count, self.candidate_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Command, SessionOptions};

    fn session(mode: SelectionMode, count: usize) -> PickerSession {
        let mut session = PickerSession::new(SessionOptions {
            mode,
            page_size: 4,
            scroll_buffer: 1,
            max_results: None,
            default_prompt: ">".to_string(),
        });
        session.show((0..count).map(|i| format!("line {}", i)).collect(), Some("run"));
        session
    }

    #[test]
    fn test_idle_session_has_no_view() {
        let session = PickerSession::new(SessionOptions::default());
        assert!(PromptView::from_session(&session, None).is_none());
    }

    #[test]
    fn test_first_page_with_cursor_highlight() {
        let session = session(SelectionMode::Single, 10);
        let view = PromptView::from_session(&session, None).unwrap();
        assert_eq!(view.prompt, "run");
        assert_eq!(view.rows.len(), 4);
        assert!(view.rows[0].highlighted);
        assert_eq!(view.rows.iter().filter(|r| r.highlighted).count(), 1);
        assert_eq!(view.status_line(), "10/10");
    }

    #[test]
    fn test_rows_follow_viewport() {
        let mut session = session(SelectionMode::Single, 10);
        session.dispatch(Command::MoveEnd);
        let view = PromptView::from_session(&session, None).unwrap();
        let texts: Vec<&str> = view.rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["line 6", "line 7", "line 8", "line 9"]);
        assert!(view.rows[3].highlighted);
        assert_eq!(view.rows[3].match_index, 9);
    }

    #[test]
    fn test_selected_flags_and_status() {
        let mut session = session(SelectionMode::Multi, 3);
        session.dispatch(Command::ToggleSelectAdvance);
        let view = PromptView::from_session(&session, None).unwrap();
        assert!(view.rows[0].selected);
        assert!(!view.rows[0].highlighted);
        assert!(view.rows[1].highlighted);
        assert_eq!(view.status_line(), "3/3 (1 selected)");
    }

    #[test]
    fn test_filtered_rows_report_candidate_position() {
        let mut session = session(SelectionMode::Single, 12);
        session.dispatch(Command::QueryChanged("1".to_string()));
        let view = PromptView::from_session(&session, None).unwrap();
        let positions: Vec<usize> = view.rows.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 10, 11]);
        assert_eq!(view.input, "1");
        assert_eq!(view.status_line(), "3/12");
    }

    #[test]
    fn test_pending_input_overrides_query() {
        let session = session(SelectionMode::Single, 2);
        let view = PromptView::from_session(&session, Some("li")).unwrap();
        assert_eq!(view.input, "li");
        assert_eq!(view.rows.len(), 2);
    }

    #[test]
    fn test_empty_match_list_renders_no_rows() {
        let mut session = session(SelectionMode::Single, 3);
        session.dispatch(Command::QueryChanged("zzz".to_string()));
        let view = PromptView::from_session(&session, None).unwrap();
        assert!(view.rows.is_empty());
        assert_eq!(view.status_line(), "0/3");
    }
}
