//! One client's connection to a chat relay.
//!
//! A [`Session`] exists only after the transport connected and the join
//! handshake was written; a failed connect never yields one. From then on a
//! background task reads the socket, frames and decodes records, and hands
//! events to the [`Dispatcher`]. The session itself keeps the write half.
//!
//! ```text
//! Idle -> Connecting -> Joined -> Closed
//!              \__________________/
//!                 connect failure
//! ```
//!
//! `Idle` and `Connecting` belong to the caller (a `Session` value does not
//! exist yet); a live session reports `Joined` until it closes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chatline_core::timestamp_now;
use chatline_protocol::{ChatEvent, FrameBuffer, decode, encode_line};

use crate::dispatch::Dispatcher;
use crate::error::{ConnectError, SendError};

/// Bound on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Bytes requested per socket read.
const READ_CHUNK: usize = 1024;

/// Lifecycle of a connection, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Joined,
    Closed,
}

/// Generates a fresh opaque user identifier.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Settings that stay fixed across connects within one process run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity sent in every join and message.
    pub user_id: String,
    /// Bound on establishing the connection.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Creates a config for the given identity with the default timeout.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Builder: set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// State shared between the session and its receive task.
struct Shared {
    connected: AtomicBool,
    writer: Mutex<Option<OwnedWriteHalf>>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    /// Marks the session closed and wakes anything waiting on the socket.
    /// Returns true for the caller that closed it.
    fn close(&self) -> bool {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        // Receivers may be gone already; the value must still flip.
        self.shutdown.send_replace(true);
        was_connected
    }

    async fn release_writer(&self) {
        if let Some(mut writer) = self.writer.lock().await.take()
            && let Err(e) = writer.shutdown().await
        {
            debug!(error = %e, "error shutting down write half");
        }
    }
}

/// A joined chat connection.
pub struct Session {
    host: String,
    port: u16,
    peer: Option<SocketAddr>,
    user_id: String,
    username: String,
    shared: Arc<Shared>,
}

impl Session {
    /// Connects to `host:port`, joins as `username` and starts receiving.
    ///
    /// Every decoded inbound event, and a final connection-lost notice if
    /// the peer goes away, is sent through `dispatcher`. The username is
    /// taken as given; callers validate it.
    pub async fn connect(
        config: &SessionConfig,
        username: &str,
        host: &str,
        port: u16,
        dispatcher: Dispatcher,
    ) -> Result<Self, ConnectError> {
        let target = format!("{host}:{port}");
        debug!(relay = %target, timeout_ms = config.connect_timeout.as_millis() as u64, "connecting");

        let stream =
            bounded_connect(TcpStream::connect((host, port)), config.connect_timeout, &target)
                .await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable Nagle");
        }
        let peer = stream.peer_addr().ok();
        let (reader, mut writer) = stream.into_split();

        let join = ChatEvent::join(&config.user_id, username);
        let line = encode_line(&join).map_err(|e| ConnectError::transport(&target, e.to_string()))?;
        writer
            .write_all(&line)
            .await
            .map_err(|e| ConnectError::transport(&target, format!("failed to send join: {e}")))?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            writer: Mutex::new(Some(writer)),
            shutdown,
        });

        tokio::spawn(receive_loop(reader, shared.clone(), dispatcher, shutdown_rx));

        info!(relay = %target, username, user_id = %config.user_id, "joined");

        Ok(Self {
            host: host.to_string(),
            port,
            peer,
            user_id: config.user_id.clone(),
            username: username.to_string(),
            shared,
        })
    }

    /// Writes one event followed by the record separator.
    ///
    /// A failed write is reported but leaves the session open; only the
    /// receive loop decides that the connection is gone. A write stalled on
    /// a peer that stopped reading is abandoned when the session closes.
    pub async fn send(&self, event: &ChatEvent) -> Result<(), SendError> {
        if !self.is_connected() {
            return Err(SendError::NotConnected);
        }
        let line = encode_line(event)?;
        let mut shutdown = self.shared.shutdown.subscribe();

        let mut guard = tokio::select! {
            guard = self.shared.writer.lock() => guard,
            _ = shutdown.wait_for(|stop| *stop) => return Err(SendError::NotConnected),
        };
        let writer = guard.as_mut().ok_or(SendError::NotConnected)?;
        tokio::select! {
            written = writer.write_all(&line) => written.inspect_err(|e| {
                warn!(error = %e, "write failed");
            })?,
            _ = shutdown.wait_for(|stop| *stop) => {
                debug!("write abandoned on disconnect");
                return Err(SendError::NotConnected);
            }
        }
        Ok(())
    }

    /// Sends `body` as a text message from this session's user.
    pub async fn send_text(&self, body: &str) -> Result<(), SendError> {
        let event = ChatEvent::text(&self.user_id, &self.username, body, timestamp_now());
        self.send(&event).await
    }

    /// Closes the connection. Calling it again, or after the peer left, does nothing.
    ///
    /// No connection-lost notice is dispatched for a local disconnect.
    pub async fn disconnect(&self) {
        let was_connected = self.shared.close();
        self.shared.release_writer().await;
        if was_connected {
            info!(relay = %self.relay(), "disconnected");
        }
    }

    /// Returns true until the session closes.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Returns `Joined` while connected, `Closed` afterwards.
    pub fn state(&self) -> SessionState {
        if self.is_connected() {
            SessionState::Joined
        } else {
            SessionState::Closed
        }
    }

    /// Returns true if `event` was authored by this session's user.
    pub fn is_own(&self, event: &ChatEvent) -> bool {
        event.is_from(&self.user_id)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolved address of the relay, if the OS reported one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn relay(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Runs a connect future under a deadline and classifies its failure.
pub(crate) async fn bounded_connect<F, T>(
    connect: F,
    bound: Duration,
    target: &str,
) -> Result<T, ConnectError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(bound, connect).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => {
            debug!(relay = %target, error = %e, "connect failed");
            Err(match ConnectError::from_io(target, e) {
                ConnectError::Timeout { target, .. } => ConnectError::Timeout { target, after: bound },
                other => other,
            })
        }
        Err(_) => Err(ConnectError::Timeout {
            target: target.to_string(),
            after: bound,
        }),
    }
}

#[derive(Debug)]
enum LoopEnd {
    PeerClosed,
    ReadError(std::io::Error),
    Shutdown,
    QueueClosed,
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    let end = 'read: loop {
        let read = tokio::select! {
            biased;
            _ = shutdown.changed() => break 'read LoopEnd::Shutdown,
            read = reader.read(&mut chunk) => read,
        };

        let n = match read {
            Ok(0) => break LoopEnd::PeerClosed,
            Ok(n) => n,
            Err(e) => break LoopEnd::ReadError(e),
        };

        for record in frames.feed(&chunk[..n]) {
            match decode(&record) {
                Ok(event) => {
                    if !dispatcher.dispatch_event(event) {
                        break 'read LoopEnd::QueueClosed;
                    }
                }
                Err(e) => debug!(error = %e, bytes = record.len(), "dropping undecodable record"),
            }
        }
    };

    if let Some(tail) = frames.finish() {
        debug!(bytes = tail.len(), "discarding unterminated record");
    }

    if shared.close() {
        shared.release_writer().await;
        match &end {
            LoopEnd::PeerClosed => warn!("relay closed the connection"),
            LoopEnd::ReadError(e) => warn!(error = %e, "read failed"),
            LoopEnd::Shutdown | LoopEnd::QueueClosed => debug!(?end, "receive loop stopped"),
        }
        dispatcher.connection_lost();
    } else {
        debug!(?end, "receive loop stopped after disconnect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{EventQueue, SessionEvent};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(5);

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    async fn connect(port: u16, name: &str) -> (Session, EventQueue) {
        let (dispatcher, queue) = Dispatcher::channel();
        let config = SessionConfig::new(format!("id-{name}"));
        let session = Session::connect(&config, name, "127.0.0.1", port, dispatcher)
            .await
            .unwrap();
        (session, queue)
    }

    async fn next(queue: &mut EventQueue) -> Option<SessionEvent> {
        tokio::time::timeout(WAIT, queue.recv()).await.expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn connect_sends_join_first() {
        let (listener, port) = listener().await;
        let (session, _queue) = connect(port, "alice").await;

        let (peer, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(peer).lines();
        let line = lines.next_line().await.unwrap().unwrap();

        assert_eq!(decode(line.as_bytes()).unwrap(), ChatEvent::join("id-alice", "alice"));
        assert_eq!(session.state(), SessionState::Joined);
        assert_eq!(session.username(), "alice");
        assert_eq!(session.port(), port);
        assert!(session.peer_addr().is_some());
    }

    #[tokio::test]
    async fn refused_when_nothing_listens() {
        let (listener, port) = listener().await;
        drop(listener);

        let (dispatcher, _queue) = Dispatcher::channel();
        let config = SessionConfig::new("u");
        let result = Session::connect(&config, "alice", "127.0.0.1", port, dispatcher).await;
        assert!(matches!(result, Err(ConnectError::Refused { .. })), "{:?}", result.err());
    }

    #[tokio::test]
    async fn timeout_when_connect_never_completes() {
        let bound = Duration::from_millis(50);
        let result =
            bounded_connect(std::future::pending::<std::io::Result<()>>(), bound, "slow:1").await;
        match result {
            Err(ConnectError::Timeout { target, after }) => {
                assert_eq!(target, "slow:1");
                assert_eq!(after, bound);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_failures_are_transport_errors() {
        let (dispatcher, _queue) = Dispatcher::channel();
        let config = SessionConfig::new("u");
        let result =
            Session::connect(&config, "alice", "host.invalid", 12345, dispatcher).await;
        assert!(
            matches!(result, Err(ConnectError::Transport { .. } | ConnectError::Timeout { .. })),
            "{:?}",
            result.err()
        );
    }

    #[tokio::test]
    async fn connect_io_failure_is_transport_error() {
        let failing = async { Err::<(), _>(std::io::Error::other("no route to relay")) };
        match bounded_connect(failing, Duration::from_secs(1), "relay:1").await {
            Err(ConnectError::Transport { target, cause }) => {
                assert_eq!(target, "relay:1");
                assert!(cause.contains("no route"), "{cause}");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn inbound_events_arrive_in_order_and_garbage_is_skipped() {
        let (listener, port) = listener().await;
        let (session, mut queue) = connect(port, "bob").await;
        let (mut peer, _) = listener.accept().await.unwrap();

        let mut wire = Vec::new();
        wire.extend(encode_line(&ChatEvent::system("one")).unwrap());
        wire.extend_from_slice(b"not json\n{\"type\":\"typing\"}\n\n");
        wire.extend(encode_line(&ChatEvent::text("x", "carol", "two", "t")).unwrap());
        wire.extend(encode_line(&ChatEvent::system("three")).unwrap());
        for piece in wire.chunks(7) {
            peer.write_all(piece).await.unwrap();
            peer.flush().await.unwrap();
        }

        assert_eq!(next(&mut queue).await, Some(SessionEvent::Event(ChatEvent::system("one"))));
        assert_eq!(
            next(&mut queue).await,
            Some(SessionEvent::Event(ChatEvent::text("x", "carol", "two", "t")))
        );
        assert_eq!(next(&mut queue).await, Some(SessionEvent::Event(ChatEvent::system("three"))));
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn send_text_writes_one_record() {
        let (listener, port) = listener().await;
        let (session, _queue) = connect(port, "alice").await;
        let (peer, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(peer).lines();
        let _join = lines.next_line().await.unwrap().unwrap();

        session.send_text("hi\nthere").await.unwrap();
        let line = lines.next_line().await.unwrap().unwrap();
        match decode(line.as_bytes()).unwrap() {
            ChatEvent::Text { user_id, username, body, timestamp } => {
                assert_eq!(user_id, "id-alice");
                assert_eq!(username, "alice");
                assert_eq!(body, "hi\nthere");
                assert!(!timestamp.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn peer_close_reports_connection_lost_once() {
        let (listener, port) = listener().await;
        let (session, mut queue) = connect(port, "alice").await;
        let (peer, _) = listener.accept().await.unwrap();
        let mut peer = BufReader::new(peer);
        let mut join = String::new();
        peer.read_line(&mut join).await.unwrap();

        peer.write_all(&encode_line(&ChatEvent::system("bye")).unwrap()).await.unwrap();
        peer.write_all(br#"{"type":"system","message":"unterminated"}"#).await.unwrap();
        drop(peer);

        assert_eq!(next(&mut queue).await, Some(SessionEvent::Event(ChatEvent::system("bye"))));
        assert_eq!(next(&mut queue).await, Some(SessionEvent::ConnectionLost));
        assert_eq!(next(&mut queue).await, None);
        assert_eq!(session.state(), SessionState::Closed);

        session.disconnect().await;
        session.disconnect().await;
        assert!(matches!(
            session.send_text("late").await,
            Err(SendError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn local_disconnect_is_silent_and_idempotent() {
        let (listener, port) = listener().await;
        let (session, mut queue) = connect(port, "alice").await;
        let (peer, _) = listener.accept().await.unwrap();

        tokio::join!(session.disconnect(), session.disconnect());
        session.disconnect().await;

        assert_eq!(next(&mut queue).await, None);
        assert!(!session.is_connected());

        let mut lines = BufReader::new(peer).lines();
        let _join = lines.next_line().await.unwrap().unwrap();
        assert!(lines.next_line().await.unwrap().is_none(), "expected EOF at peer");
    }

    #[tokio::test]
    async fn disconnect_does_not_wait_on_stalled_write() {
        let (listener, port) = listener().await;
        let (session, _queue) = connect(port, "alice").await;
        // Accepted but never read, so the socket buffers fill up.
        let (_peer, _) = listener.accept().await.unwrap();

        let session = Arc::new(session);
        let sender = tokio::spawn({
            let session = session.clone();
            async move {
                let body = "x".repeat(512 * 1024);
                loop {
                    if let Err(e) = session.send_text(&body).await {
                        return e;
                    }
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!sender.is_finished(), "writes should be stalled on a full buffer");

        tokio::time::timeout(Duration::from_secs(3), session.disconnect())
            .await
            .expect("disconnect blocked behind a stalled write");
        let err = tokio::time::timeout(WAIT, sender).await.unwrap().unwrap();
        assert!(matches!(err, SendError::NotConnected), "{err:?}");
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn dropping_session_stops_receive_task() {
        let (listener, port) = listener().await;
        let (session, mut queue) = connect(port, "alice").await;
        let (_peer, _) = listener.accept().await.unwrap();

        drop(session);
        assert_eq!(next(&mut queue).await, None);
    }
}
