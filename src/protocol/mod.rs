//! JSONL protocol spoken on the picker bus
//!
//! Messages are exchanged as newline-delimited JSON (JSONL), each object
//! tagged by a `type` field.
//!
//! # Message Categories
//!
//! ## Requests (caller → service)
//! - `show`: display a prompt over a list of lines
//!
//! ## Signals (service → every connected caller)
//! - `itemSelected`: the user committed one or more lines
//! - `cancelled`: the user aborted the prompt
//!
//! ## Replies (service → requesting caller only)
//! - `error`: the request was rejected and engine state left untouched
//!
//! # Module Structure
//!
//! - `message`: the Message enum and constructors
//! - `io`: JSONL parsing with graceful error handling, serialization, streaming reads

mod io;
mod message;

pub use io::*;
pub use message::*;
