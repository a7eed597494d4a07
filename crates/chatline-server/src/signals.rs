//! Shutdown signalling for the relay.
//!
//! SIGTERM and SIGINT (Ctrl+C off Unix) flip a watch channel from `false`
//! to `true`. Anything holding a [`ShutdownSignal`] wakes up; code can
//! raise the same signal with [`SignalHandler::trigger_shutdown`].

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Owns the shutdown flag. Clones share it.
#[derive(Clone)]
pub struct SignalHandler {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Installs the OS signal handlers and waits for them on a task.
    ///
    /// Call once at startup.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let handler = self.clone();

        tokio::spawn(async move {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            info!(signal = name, "Shutting down");
            handler.trigger_shutdown();
        });
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> io::Result<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(signal = "ctrl-c", "Shutting down");
                handler.trigger_shutdown();
            }
        });
        Ok(())
    }

    /// Returns a handle whose `wait` completes on shutdown.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger_shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Completes once shutdown is requested.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for shutdown. Returns at once if it was already requested.
    pub async fn wait(mut self) {
        // Errs only once every handler is dropped.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
