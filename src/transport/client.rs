//! Caller side of the bus.

use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{PickerError, Result};
use crate::protocol::{write_message, JsonlReader, Message};
use crate::session::Outcome;

pub struct BusClient {
    writer: UnixStream,
    reader: JsonlReader<UnixStream>,
    request_id: Option<String>,
}

impl BusClient {
    pub fn connect(path: &Path) -> Result<Self> {
        let writer = UnixStream::connect(path)?;
        let reader = JsonlReader::new(writer.try_clone()?);
        debug!(path = %path.display(), "Connected to bus");
        Ok(BusClient {
            writer,
            reader,
            request_id: None,
        })
    }

    pub fn send(&mut self, message: &Message) -> Result<()> {
        write_message(&mut self.writer, message)
    }

    /// Ask the service to show a prompt over `items`.
    pub fn show(
        &mut self,
        items: Vec<String>,
        prompt: Option<String>,
        request_id: Option<String>,
    ) -> Result<()> {
        info!(
            item_count = items.len(),
            request_id = request_id.as_deref(),
            "Sending show request"
        );
        self.request_id = request_id.clone();
        self.send(&Message::Show {
            items,
            prompt,
            request_id,
        })
    }

    /// Block until the signal that answers our request.
    ///
    /// When `show` was sent with a request id, signals carrying a different id
    /// belong to other callers and are skipped. An `error` reply becomes
    /// [`PickerError::Rejected`]; the service closing the connection becomes
    /// [`PickerError::Disconnected`].
    pub fn wait_for_outcome(&mut self) -> Result<Outcome> {
        while let Some(message) = self.reader.next_message_graceful()? {
            if !self.answers_us(&message) {
                debug!(
                    message_type = message.kind(),
                    request_id = message.request_id(),
                    "Skipping signal for another request"
                );
                continue;
            }
            match message {
                Message::ItemSelected { items, .. } => return Ok(Outcome::ItemSelected(items)),
                Message::Cancelled { .. } => return Ok(Outcome::Cancelled),
                Message::Error { message } => return Err(PickerError::Rejected(message)),
                Message::Show { .. } => debug!("Ignoring show echoed by the bus"),
            }
        }
        Err(PickerError::Disconnected)
    }

    fn answers_us(&self, message: &Message) -> bool {
        match (&self.request_id, message) {
            (Some(ours), Message::ItemSelected { .. } | Message::Cancelled { .. }) => {
                message.request_id() == Some(ours.as_str())
            }
            _ => true,
        }
    }
}
