//! TCP listener and per-connection relay loop.
//!
//! Every connection subscribes to one broadcast channel. Text records a
//! client sends are re-encoded and published to all subscribers, the
//! sender included. A join is turned into a system announcement.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, broadcast};
use tracing::{debug, error, info, warn};

use chatline_protocol::{ChatEvent, FrameBuffer, decode, encode_line};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

const READ_CHUNK: usize = 4096;

/// One encoded record, separator included.
type Line = Arc<[u8]>;

/// Broadcast relay accepting chat clients.
pub struct RelayServer {
    config: ServerConfig,
    listener: TcpListener,
    connection_semaphore: Arc<Semaphore>,
    broadcast: broadcast::Sender<Line>,
}

impl RelayServer {
    /// Binds the listening socket described by `config`.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| ServerError::bind(&config.bind_addr, e))?;
        info!(addr = %listener.local_addr()?, "Relay listening");

        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));
        let (broadcast, _) = broadcast::channel(config.backlog);

        Ok(Self {
            config,
            listener,
            connection_semaphore,
            broadcast,
        })
    }

    /// Returns the bound address, with the real port if 0 was requested.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts a single connection.
    ///
    /// Waits for a free slot first when `max_connections` are open.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let permit = self
            .connection_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServerError::Shutdown)?;

        let (stream, peer) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "could not disable Nagle");
        }
        debug!(%peer, "Accepted new connection");

        Ok(Connection {
            stream,
            peer,
            // Subscribe before serving so nothing published after accept is missed.
            inbound: self.broadcast.subscribe(),
            outbound: self.broadcast.clone(),
            max_record: self.config.max_record_size,
            _permit: permit,
        })
    }

    /// Runs the accept loop, serving each connection on its own task.
    pub async fn run(&self) -> ServerResult<()> {
        loop {
            match self.accept().await {
                Ok(connection) => {
                    tokio::spawn(connection.serve());
                }
                Err(ServerError::Shutdown) => return Err(ServerError::Shutdown),
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Runs the accept loop until `shutdown` completes.
    pub async fn run_until_shutdown<S>(&self, shutdown: S) -> ServerResult<()>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}

/// A client connected to the relay.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    inbound: broadcast::Receiver<Line>,
    outbound: broadcast::Sender<Line>,
    max_record: usize,
    _permit: OwnedSemaphorePermit,
}

impl Connection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Relays records until either side closes.
    ///
    /// Announces the member's departure if it had joined.
    pub async fn serve(self) {
        let Connection {
            stream,
            peer,
            mut inbound,
            outbound,
            max_record,
            _permit,
        } = self;
        let (mut reader, mut writer) = stream.into_split();
        let mut frames = FrameBuffer::with_max_record(max_record);
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut member = Member::new(peer);

        loop {
            tokio::select! {
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => {
                        debug!(%peer, "client closed the connection");
                        break;
                    }
                    Ok(n) => {
                        for record in frames.feed(&chunk[..n]) {
                            if let Some(event) = member.relay(&record) {
                                publish(&outbound, &event);
                            }
                        }
                    }
                    Err(e) => {
                        debug!(%peer, error = %e, "read failed");
                        break;
                    }
                },
                line = inbound.recv() => match line {
                    Ok(line) => {
                        if let Err(e) = writer.write_all(&line).await {
                            debug!(%peer, error = %e, "write failed");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%peer, skipped, "client too slow, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        if let Some(name) = member.username {
            info!(%peer, username = %name, "member left");
            publish(&outbound, &ChatEvent::system(format!("{name} left the chat")));
        }
    }
}

/// What the relay knows about one connection.
struct Member {
    peer: SocketAddr,
    username: Option<String>,
}

impl Member {
    fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            username: None,
        }
    }

    /// Maps an inbound record to the event to publish, if any.
    fn relay(&mut self, record: &[u8]) -> Option<ChatEvent> {
        let event = match decode(record) {
            Ok(event) => event,
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "dropping undecodable record");
                return None;
            }
        };

        match event {
            ChatEvent::Join { user_id, username } => {
                let name = if username.is_empty() {
                    "Unknown".to_string()
                } else {
                    username
                };
                info!(peer = %self.peer, %user_id, username = %name, "member joined");
                let notice = ChatEvent::system(format!("{name} joined the chat"));
                self.username = Some(name);
                Some(notice)
            }
            event @ ChatEvent::Text { .. } => Some(event),
            ChatEvent::System { .. } => {
                debug!(peer = %self.peer, "dropping system record sent by a client");
                None
            }
        }
    }
}

fn publish(outbound: &broadcast::Sender<Line>, event: &ChatEvent) {
    match encode_line(event) {
        Ok(line) => {
            // Only fails with no subscribers left.
            let _ = outbound.send(Line::from(line));
        }
        Err(e) => warn!(error = %e, "failed to encode relayed event"),
    }
}
