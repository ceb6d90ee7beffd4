//! Unix-domain socket bus.
//!
//! One picker service owns the socket at a well-known path. Callers connect,
//! write a `show` request as one JSONL line, and read signals back:
//!
//! ```text
//! caller  -> {"type":"show","items":["a","b"],"prompt":"run:"}
//! service -> {"type":"itemSelected","items":["b"]}     (every connection)
//! service -> {"type":"error","message":"..."}          (offending connection only)
//! ```
//!
//! Signals are broadcast to every connected client. A client that only wants
//! the outcome of its own request simply reads until the first signal.

mod client;
mod server;

pub use client::BusClient;
pub use server::{BusServer, SignalSink, Subscribers};
