//! Query matching for the candidate list.
//!
//! The filter is a plain inclusion test, not a fuzzy scorer: the query is
//! split on whitespace into lowercase tokens, and a line matches when it
//! contains every token as a substring, ignoring case. Matches keep the
//! order in which the caller supplied the lines.

use crate::perf::TimingGuard;

/// A parsed query: the lowercase tokens every match must contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    tokens: Vec<String>,
}

impl Query {
    /// Tokenize `text` on whitespace. Whitespace-only text yields the empty query.
    pub fn parse(text: &str) -> Self {
        Query {
            tokens: text.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    /// True when there are no tokens; the empty query matches everything.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether `line` contains every token, case-insensitively.
    pub fn matches(&self, line: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let haystack = line.to_lowercase();
        self.tokens.iter().all(|token| haystack.contains(token.as_str()))
    }
}

/// Indices of the candidates matching `query`, in candidate order.
///
/// `limit` caps the number of indices returned; `None` keeps every match.
pub fn filter_candidates(candidates: &[String], query: &Query, limit: Option<usize>) -> Vec<usize> {
    let _timing = TimingGuard::filter();

    let cap = limit.unwrap_or(usize::MAX);
    if query.is_empty() {
        return (0..candidates.len().min(cap)).collect();
    }

    candidates
        .iter()
        .enumerate()
        .filter(|(_, line)| query.matches(line))
        .map(|(idx, _)| idx)
        .take(cap)
        .collect()
}
