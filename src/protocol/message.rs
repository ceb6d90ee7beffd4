//! Protocol Message enum for the picker bus
//!
//! This module contains the Message enum that represents every message
//! exchanged between callers and the picker service.

use serde::{Deserialize, Serialize};

use crate::session::Outcome;

/// Protocol message with type discrimination via serde tag
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    // ============================================================
    // REQUESTS
    // ============================================================
    /// Show a prompt over `items`
    ///
    /// # Example
    /// ```json
    /// {"type":"show","items":["apple","banana"],"prompt":"fruit:"}
    /// ```
    #[serde(rename = "show")]
    Show {
        items: Vec<String>,
        /// Prompt text; empty or absent uses the configured default
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        /// Optional request ID for correlation in logs
        #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    // ============================================================
    // SIGNALS
    // ============================================================
    /// The user committed; `items` is never empty
    ///
    /// `requestId` echoes the `show` that started the invocation.
    #[serde(rename = "itemSelected")]
    ItemSelected {
        items: Vec<String>,
        #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// The invocation ended without a selection
    #[serde(rename = "cancelled")]
    Cancelled {
        #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    // ============================================================
    // REPLIES
    // ============================================================
    /// A request was rejected without touching the session
    #[serde(rename = "error")]
    Error { message: String },
}

impl Message {
    pub fn error(message: impl Into<String>) -> Self {
        Message::Error {
            message: message.into(),
        }
    }

    pub fn cancelled(request_id: Option<String>) -> Self {
        Message::Cancelled { request_id }
    }

    /// Signal announcing how the invocation tagged `request_id` ended.
    pub fn signal(outcome: Outcome, request_id: Option<String>) -> Self {
        match outcome {
            Outcome::ItemSelected(items) => Message::ItemSelected { items, request_id },
            Outcome::Cancelled => Message::Cancelled { request_id },
        }
    }

    /// Request ID carried by a `show` or a signal.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Message::Show { request_id, .. }
            | Message::ItemSelected { request_id, .. }
            | Message::Cancelled { request_id } => request_id.as_deref(),
            Message::Error { .. } => None,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Show { .. } => "show",
            Message::ItemSelected { .. } => "itemSelected",
            Message::Cancelled { .. } => "cancelled",
            Message::Error { .. } => "error",
        }
    }
}
