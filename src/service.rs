//! The picker service: one event loop owning all picker state.
//!
//! Bus connection threads and the terminal input thread only send
//! [`ServiceEvent`]s; [`PickerService::run`] applies them one at a time. The
//! loop sleeps until the next event or the pending query recompute, whichever
//! comes first.
//!
//! Navigation, commit and cancel never wait on a debounced recompute: commit
//! and navigation apply the pending query first, cancel discards it.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::{Result, ResultExt};
use crate::keymap::{KeyAction, Keymap};
use crate::logging;
use crate::perf::TimingGuard;
use crate::protocol::Message;
use crate::session::{Command, Outcome, PickerSession, SessionOptions};
use crate::transport::SignalSink;
use crate::view::PromptView;

/// Prompt line plus status line
pub const CHROME_ROWS: usize = 2;

/// Match rows that fit on a surface `rows` tall.
pub fn page_size_for_rows(rows: u16) -> usize {
    (rows as usize).saturating_sub(CHROME_ROWS).max(1)
}

/// Everything that can wake the loop.
#[derive(Debug)]
pub enum ServiceEvent {
    /// `show` request from the bus
    Show {
        items: Vec<String>,
        prompt: Option<String>,
        request_id: Option<String>,
        /// Bus connection the request arrived on
        connection: Option<u64>,
    },
    Key(KeyEvent),
    Resize { cols: u16, rows: u16 },
    /// Host is going away
    Shutdown,
}

/// Whether the loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Something that can draw the prompt. `None` clears it.
pub trait Surface {
    fn draw(&mut self, view: Option<&PromptView>) -> Result<()>;
}

pub struct PickerService<S: SignalSink, V: Surface> {
    session: PickerSession,
    keymap: Keymap,
    debouncer: Debouncer<String>,
    /// Page size came from config; ignore surface resizes
    fixed_page_size: bool,
    request_id: Option<String>,
    /// Connection that asked for the active invocation
    origin: Option<u64>,
    sink: S,
    surface: V,
}

impl<S: SignalSink, V: Surface> PickerService<S, V> {
    pub fn new(config: &Config, surface_rows: Option<u16>, sink: S, surface: V) -> Self {
        let rows = surface_rows.map(page_size_for_rows);
        let options = SessionOptions::from_config(config, rows);
        info!(
            mode = ?options.mode,
            page_size = options.page_size,
            debounce_ms = config.debounce_ms,
            "Picker service created"
        );
        PickerService {
            keymap: Keymap::new(options.mode),
            session: PickerSession::new(options),
            debouncer: Debouncer::new(config.get_debounce()),
            fixed_page_size: config.page_size.is_some(),
            request_id: None,
            origin: None,
            sink,
            surface,
        }
    }

    pub fn session(&self) -> &PickerSession {
        &self.session
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    /// Text in the input line, possibly ahead of the last recompute.
    pub fn input(&self) -> &str {
        self.keymap.input()
    }

    pub fn has_pending_recompute(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Drain events until shutdown or until every sender is gone.
    pub fn run(mut self, events: Receiver<ServiceEvent>) {
        info!("Picker service loop started");
        loop {
            let now = Instant::now();
            self.poll_debounce(now);

            let received = match self.debouncer.time_until_due(now) {
                Some(wait) => events.recv_timeout(wait),
                None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            let event = match received {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("All event senders dropped");
                    break;
                }
            };

            if self.handle_event(event, Instant::now()) == Flow::Exit {
                break;
            }
        }
        self.shutdown();
        info!("Picker service loop finished");
    }

    pub fn handle_event(&mut self, event: ServiceEvent, now: Instant) -> Flow {
        match event {
            ServiceEvent::Show {
                items,
                prompt,
                request_id,
                connection,
            } => self.on_show(items, prompt, request_id, connection),
            ServiceEvent::Key(key) => return self.on_key(key, now),
            ServiceEvent::Resize { rows, .. } => {
                if !self.fixed_page_size {
                    self.session.set_page_size(page_size_for_rows(rows));
                }
                self.redraw();
            }
            ServiceEvent::Shutdown => {
                self.shutdown();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// Run the debounced recompute if its deadline has passed.
    pub fn poll_debounce(&mut self, now: Instant) {
        if let Some(text) = self.debouncer.fire_if_due(now) {
            self.apply(Command::QueryChanged(text));
        }
    }

    /// Cancel any active invocation, emitting `cancelled`, and clear the surface.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.debouncer.cancel();
        if self.session.is_active() {
            info!("Cancelling active invocation on shutdown");
            self.apply(Command::Cancel);
        }
        self.surface.draw(None).warn_on_err();
    }

    fn on_show(
        &mut self,
        items: Vec<String>,
        prompt: Option<String>,
        request_id: Option<String>,
        connection: Option<u64>,
    ) {
        let replacing = self.session.is_active();
        let action = if replacing { "replace" } else { "show" };
        logging::log_invocation_event(action, request_id.as_deref(), items.len());

        let replaced_id = self.request_id.take();
        if let Some(origin) = self.origin.take() {
            // Only the replaced caller hears about it; the bus sees no signal
            if replacing && connection != Some(origin) {
                self.sink.reply(origin, &Message::cancelled(replaced_id));
            }
        }

        self.debouncer.cancel();
        self.keymap.reset();
        self.session.show(items, prompt.as_deref());
        self.request_id = request_id;
        self.origin = connection;
        self.redraw();
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if !self.session.is_active() {
            return if is_quit_key(&key) {
                info!("Quit requested while idle");
                Flow::Exit
            } else {
                Flow::Continue
            };
        }

        match self.keymap.handle(key) {
            Some(KeyAction::QueryEdited(text)) => {
                if let Some(text) = self.debouncer.schedule(text, now) {
                    self.apply(Command::QueryChanged(text));
                } else {
                    // Input line updates right away, rows follow after the delay
                    self.redraw();
                }
            }
            Some(KeyAction::Command(Command::Cancel)) => {
                self.debouncer.cancel();
                self.apply(Command::Cancel);
            }
            Some(KeyAction::Command(command)) => {
                if let Some(text) = self.debouncer.flush() {
                    self.session.dispatch(Command::QueryChanged(text));
                }
                self.apply(command);
            }
            None => {}
        }
        Flow::Continue
    }

    /// Dispatch one command, publish its outcome, redraw.
    fn apply(&mut self, command: Command) {
        if let Some(outcome) = self.session.dispatch(command) {
            self.finish(outcome);
        }
        self.redraw();
    }

    fn finish(&mut self, outcome: Outcome) {
        let (action, count) = match &outcome {
            Outcome::ItemSelected(items) => ("commit", items.len()),
            Outcome::Cancelled => ("cancel", 0),
        };
        logging::log_invocation_event(action, self.request_id.as_deref(), count);

        self.debouncer.cancel();
        self.keymap.reset();
        self.origin = None;
        self.sink.emit(&Message::signal(outcome, self.request_id.take()));
    }

    fn redraw(&mut self) {
        let _timing = TimingGuard::render();
        let view = PromptView::from_session(&self.session, Some(self.keymap.input()));
        self.surface.draw(view.as_ref()).warn_on_err();
    }
}

/// Ctrl+C or Ctrl+D with no prompt showing stops the host.
fn is_quit_key(key: &KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
