//! Line-oriented terminal rendering of a chat session.

use std::io::{self, BufRead, Write};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use chatline_core::clock_label;
use chatline_protocol::ChatEvent;

use crate::dispatch::PresentationSink;
use crate::error::ConnectError;

/// Command that leaves the chat.
pub const QUIT_COMMAND: &str = "/quit";

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing to send.
    Empty,
    /// Leave the chat.
    Quit,
    /// Text to send, already trimmed.
    Message(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            QUIT_COMMAND => Self::Quit,
            text => Self::Message(text.to_string()),
        }
    }
}

/// Lines buffered between the input thread and the chat loop.
const INPUT_BACKLOG: usize = 16;

/// Reads lines from `reader` on a dedicated thread.
///
/// Blocking terminal reads cannot be cancelled, so they stay off the
/// runtime: a pending read never holds up shutdown. The channel closes at
/// end of input, after a read error, or once the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INPUT_BACKLOG);
    thread::Builder::new().name("chatline-input".into()).spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
        debug!("input reader stopped");
    })?;
    Ok(rx)
}

/// Maps a connect failure to what the user reads.
pub fn connect_error_message(err: &ConnectError) -> String {
    match err {
        ConnectError::Timeout { .. } => "Connection timeout - Server not responding".to_string(),
        ConnectError::Refused { .. } => "Connection refused - Start the server first!".to_string(),
        ConnectError::Transport { cause, .. } => format!("Connection failed: {cause}"),
    }
}

/// Renders session events as plain text lines.
///
/// Messages authored by `user_id` are shown as the user's own.
pub struct TerminalSink<W> {
    out: W,
    user_id: String,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, user_id: impl Into<String>) -> Self {
        Self {
            out,
            user_id: user_id.into(),
        }
    }

    /// Prints the greeting shown once after joining.
    pub fn welcome(&mut self, username: &str) {
        self.notice("Welcome to the chat! Start messaging...");
        self.notice(&format!("You joined as {username}"));
    }

    /// Prints a locally generated notice.
    pub fn notice(&mut self, text: &str) {
        self.line(&format!("*** {text}"));
    }

    /// Prints `text` without a trailing newline.
    pub fn prompt(&mut self, text: &str) {
        if let Err(e) = write!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!(error = %e, "failed to write to terminal");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!(error = %e, "failed to write to terminal");
        }
    }

    fn render_text(&mut self, user_id: &str, username: &str, body: &str, timestamp: &str) {
        let author = if user_id == self.user_id {
            "you"
        } else if username.is_empty() {
            "Unknown"
        } else {
            username
        };
        let line = match clock_label(timestamp) {
            Some(clock) => format!("[{clock}] {author}: {body}"),
            None => format!("{author}: {body}"),
        };
        self.line(&line);
    }
}

impl<W: Write> PresentationSink for TerminalSink<W> {
    fn on_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::System { body } => self.notice(&body),
            ChatEvent::Text {
                user_id,
                username,
                body,
                timestamp,
            } => self.render_text(&user_id, &username, &body, &timestamp),
            ChatEvent::Join { user_id, username } => {
                if user_id != self.user_id {
                    let name = if username.is_empty() { "Unknown" } else { username.as_str() };
                    self.notice(&format!("{name} joined"));
                }
            }
        }
    }

    fn on_connection_lost(&mut self) {
        self.notice("Lost connection to server");
    }
}
