//! Service side of the bus: claim the socket, accept callers, fan out signals.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PickerError, Result, ResultExt};
use crate::protocol::{log_unusable, write_message, JsonlReader, Message, ParseResult};
use crate::service::ServiceEvent;

/// A client that stopped reading must not stall the event loop
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Where the service publishes `itemSelected` / `cancelled`.
pub trait SignalSink: Send {
    /// Broadcast to every listener.
    fn emit(&self, message: &Message);
    /// Deliver to the connection a request arrived on.
    fn reply(&self, connection: u64, message: &Message);
}

struct Subscriber {
    id: u64,
    stream: UnixStream,
}

/// Write halves of every open connection.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<Vec<Subscriber>>>,
}

impl Subscribers {
    fn add(&self, id: u64, stream: UnixStream) {
        stream.set_write_timeout(Some(WRITE_TIMEOUT)).warn_on_err();
        self.inner.lock().push(Subscriber { id, stream });
    }

    fn remove(&self, id: u64) {
        self.inner.lock().retain(|sub| sub.id != id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `message` to one connection only.
    pub fn send_to(&self, id: u64, message: &Message) -> Result<()> {
        let mut subs = self.inner.lock();
        match subs.iter_mut().find(|sub| sub.id == id) {
            Some(sub) => write_message(&mut sub.stream, message),
            None => Err(PickerError::Disconnected),
        }
    }

    /// Send `message` to every connection, dropping the ones that fail.
    ///
    /// Returns how many connections received it.
    pub fn broadcast(&self, message: &Message) -> usize {
        let mut subs = self.inner.lock();
        subs.retain_mut(|sub| match write_message(&mut sub.stream, message) {
            Ok(()) => true,
            Err(e) => {
                debug!(connection_id = sub.id, error = %e, "Dropping dead subscriber");
                false
            }
        });
        subs.len()
    }
}

impl SignalSink for Subscribers {
    fn emit(&self, message: &Message) {
        let delivered = self.broadcast(message);
        info!(
            event_type = "signal",
            message_type = message.kind(),
            delivered = delivered,
            "Signal emitted"
        );
    }

    fn reply(&self, connection: u64, message: &Message) {
        debug!(
            connection_id = connection,
            message_type = message.kind(),
            "Replying to one connection"
        );
        self.send_to(connection, message).warn_on_err();
    }
}

/// Owner of the bus socket. The socket file is removed on drop.
pub struct BusServer {
    path: PathBuf,
    listener: UnixListener,
    subscribers: Subscribers,
}

impl BusServer {
    /// Claim the bus at `path`.
    ///
    /// Fails with [`PickerError::NameTaken`] when a live instance answers on
    /// the path. A socket file nobody answers on is left over from a crash and
    /// is replaced. Anything at the path that is not a socket is left alone
    /// and the bind fails.
    pub fn bind(path: &Path) -> Result<Self> {
        if let Ok(metadata) = fs::symlink_metadata(path) {
            if !metadata.file_type().is_socket() {
                return Err(PickerError::Bind {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "path exists and is not a socket",
                    ),
                });
            }
            if UnixStream::connect(path).is_ok() {
                return Err(PickerError::NameTaken {
                    path: path.to_path_buf(),
                });
            }
            info!(path = %path.display(), "Removing stale bus socket");
            fs::remove_file(path).map_err(|source| PickerError::Bind {
                path: path.to_path_buf(),
                source,
            })?;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PickerError::Bind {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let listener = UnixListener::bind(path).map_err(|source| PickerError::Bind {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Bus claimed");
        Ok(BusServer {
            path: path.to_path_buf(),
            listener,
            subscribers: Subscribers::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle for publishing signals to connected callers.
    pub fn subscribers(&self) -> Subscribers {
        self.subscribers.clone()
    }

    /// Start accepting connections. Requests are forwarded into `events`.
    pub fn spawn(&self, events: Sender<ServiceEvent>) -> Result<JoinHandle<()>> {
        let listener = self.listener.try_clone()?;
        let subscribers = self.subscribers.clone();
        let handle = thread::Builder::new()
            .name("bus-accept".to_string())
            .spawn(move || accept_loop(listener, subscribers, events))?;
        Ok(handle)
    }
}

impl Drop for BusServer {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Releasing bus socket");
        fs::remove_file(&self.path).warn_on_err();
    }
}

fn accept_loop(listener: UnixListener, subscribers: Subscribers, events: Sender<ServiceEvent>) {
    debug!("Bus accept loop started");
    for (id, stream) in (0u64..).zip(listener.incoming()) {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Failed to accept bus connection");
                continue;
            }
        };
        let Some(writer) = stream.try_clone().warn_on_err() else {
            continue;
        };
        subscribers.add(id, writer);
        debug!(connection_id = id, "Bus client connected");

        let subscribers = subscribers.clone();
        let events = events.clone();
        thread::Builder::new()
            .name(format!("bus-conn-{}", id))
            .spawn(move || serve_connection(id, stream, subscribers, events))
            .log_err();
    }
}

fn serve_connection(
    id: u64,
    stream: UnixStream,
    subscribers: Subscribers,
    events: Sender<ServiceEvent>,
) {
    let mut reader = JsonlReader::new(stream);
    loop {
        let parsed = match reader.next_parsed() {
            Ok(Some(parsed)) => parsed,
            Ok(None) => break,
            Err(e) => {
                debug!(connection_id = id, error = %e, "Bus read failed");
                break;
            }
        };

        match parsed {
            ParseResult::Ok(Message::Show {
                items,
                prompt,
                request_id,
            }) => {
                let event = ServiceEvent::Show {
                    items,
                    prompt,
                    request_id,
                    connection: Some(id),
                };
                if events.send(event).is_err() {
                    debug!(connection_id = id, "Service loop gone, closing connection");
                    break;
                }
            }
            ParseResult::Ok(other) => {
                warn!(
                    connection_id = id,
                    message_type = other.kind(),
                    "Ignoring non-request message from client"
                );
            }
            ParseResult::InvalidPayload {
                message_type,
                error,
                raw,
            } => {
                warn!(
                    connection_id = id,
                    message_type = %message_type,
                    error = %error,
                    raw_preview = %raw,
                    "Rejecting malformed request"
                );
                let reply = Message::error(format!("invalid {} request: {}", message_type, error));
                subscribers.send_to(id, &reply).warn_on_err();
            }
            other => {
                log_unusable(other);
            }
        }
    }
    subscribers.remove(id);
    debug!(connection_id = id, "Bus client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::sync::mpsc;
    use std::time::Instant;

    fn socket_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("bus.sock")
    }

    fn wait_for_subscribers(subscribers: &Subscribers, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while subscribers.len() != count {
            assert!(Instant::now() < deadline, "subscribers never reached {}", count);
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn read_line(stream: &UnixStream) -> String {
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        line
    }

    #[test]
    fn test_second_bind_fails_with_name_taken() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        let _first = BusServer::bind(&path).unwrap();
        match BusServer::bind(&path) {
            Err(PickerError::NameTaken { path: taken }) => assert_eq!(taken, path),
            other => panic!("Expected NameTaken, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let server = BusServer::bind(&path).unwrap();
        assert_eq!(server.path(), path.as_path());
    }

    #[test]
    fn test_drop_removes_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        drop(BusServer::bind(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_regular_file_at_socket_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "keep me").unwrap();

        match BusServer::bind(&path) {
            Err(PickerError::Bind { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("Expected Bind error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_show_request_reaches_event_queue() {
        let dir = tempfile::tempdir().unwrap();
        let server = BusServer::bind(&socket_path(&dir)).unwrap();
        let (tx, rx) = mpsc::channel();
        server.spawn(tx).unwrap();

        let mut client = UnixStream::connect(server.path()).unwrap();
        client
            .write_all(b"{\"type\":\"show\",\"items\":[\"a\",\"b\"],\"requestId\":\"r1\"}\n")
            .unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ServiceEvent::Show {
                items,
                prompt,
                request_id,
                connection,
            } => {
                assert_eq!(items, vec!["a", "b"]);
                assert!(connection.is_some());
                assert!(prompt.is_none());
                assert_eq!(request_id.as_deref(), Some("r1"));
            }
            other => panic!("Expected Show event, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_show_gets_error_reply_only() {
        let dir = tempfile::tempdir().unwrap();
        let server = BusServer::bind(&socket_path(&dir)).unwrap();
        let (tx, rx) = mpsc::channel();
        server.spawn(tx).unwrap();

        let mut client = UnixStream::connect(server.path()).unwrap();
        client
            .write_all(b"{\"type\":\"show\",\"items\":\"apple\"}\n")
            .unwrap();

        let reply: Message = serde_json::from_str(read_line(&client).trim()).unwrap();
        assert!(matches!(reply, Message::Error { .. }));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_broadcast_reaches_every_client() {
        let dir = tempfile::tempdir().unwrap();
        let server = BusServer::bind(&socket_path(&dir)).unwrap();
        let (tx, _rx) = mpsc::channel();
        server.spawn(tx).unwrap();
        let subscribers = server.subscribers();

        let first = UnixStream::connect(server.path()).unwrap();
        let second = UnixStream::connect(server.path()).unwrap();
        wait_for_subscribers(&subscribers, 2);

        subscribers.emit(&Message::cancelled(None));
        assert_eq!(read_line(&first), "{\"type\":\"cancelled\"}\n");
        assert_eq!(read_line(&second), "{\"type\":\"cancelled\"}\n");
    }

    #[test]
    fn test_reply_reaches_only_the_requesting_client() {
        let dir = tempfile::tempdir().unwrap();
        let server = BusServer::bind(&socket_path(&dir)).unwrap();
        let (tx, rx) = mpsc::channel();
        server.spawn(tx).unwrap();
        let subscribers = server.subscribers();

        let mut asker = UnixStream::connect(server.path()).unwrap();
        let bystander = UnixStream::connect(server.path()).unwrap();
        wait_for_subscribers(&subscribers, 2);
        asker
            .write_all(b"{\"type\":\"show\",\"items\":[\"a\"],\"requestId\":\"r1\"}\n")
            .unwrap();
        let connection = match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ServiceEvent::Show { connection, .. } => connection.unwrap(),
            other => panic!("Expected Show event, got {:?}", other),
        };

        SignalSink::reply(&subscribers, connection, &Message::cancelled(Some("r1".into())));
        subscribers.emit(&Message::cancelled(Some("r2".into())));

        assert_eq!(
            read_line(&asker),
            "{\"type\":\"cancelled\",\"requestId\":\"r1\"}\n"
        );
        assert_eq!(
            read_line(&bystander),
            "{\"type\":\"cancelled\",\"requestId\":\"r2\"}\n"
        );
    }

    #[test]
    fn test_disconnected_client_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let server = BusServer::bind(&socket_path(&dir)).unwrap();
        let (tx, _rx) = mpsc::channel();
        server.spawn(tx).unwrap();
        let subscribers = server.subscribers();

        let client = UnixStream::connect(server.path()).unwrap();
        wait_for_subscribers(&subscribers, 1);
        drop(client);
        wait_for_subscribers(&subscribers, 0);
        assert_eq!(subscribers.broadcast(&Message::cancelled(None)), 0);
    }

    #[test]
    fn test_reply_to_unknown_connection_fails() {
        let subscribers = Subscribers::default();
        assert!(matches!(
            subscribers.send_to(9, &Message::error("x")),
            Err(PickerError::Disconnected)
        ));
        assert!(subscribers.is_empty());
    }
}
