//! runpick - incremental-search picker service
//!
//! A caller sends a list of lines over the picker bus; the user narrows it by
//! typing and commits one line (or, in multi-select mode, several). The
//! outcome is published back on the bus.
//!
//! Engine: [`filter`], [`viewport`], [`session`], [`view`].
//! Boundary: [`protocol`], [`transport`], [`service`], [`debounce`], [`keymap`].
//! Host: [`terminal`].

pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod keymap;
pub mod logging;
pub mod perf;
pub mod protocol;
pub mod service;
pub mod session;
pub mod terminal;
pub mod transport;
pub mod view;
pub mod viewport;
