//! Interactive chat: the presentation loop of the terminal client.
//!
//! This loop is the only place that renders or reads user input. It
//! connects, then alternates between draining session events and typed
//! lines until the user quits or the connection drops. Lines come from a
//! reader thread, see [`spawn_line_reader`].

use std::io::{self, Write};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cli::LoginForm;
use crate::dispatch::{Dispatcher, PresentationSink, SessionEvent, deliver};
use crate::error::ClientResult;
use crate::login::Login;
use crate::session::{Session, SessionConfig, SessionState, generate_user_id};
use crate::terminal::{Input, TerminalSink, connect_error_message, spawn_line_reader};

/// How a chat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The user typed `/quit` or closed the input.
    Quit,
    /// The relay went away.
    ConnectionLost,
}

/// Runs the chat on stdin/stdout with a fresh identity.
pub async fn run(form: LoginForm) -> ClientResult<ChatOutcome> {
    let input = spawn_line_reader(io::BufReader::new(io::stdin()))?;
    let mut stdout = io::stdout();
    chat(form, generate_user_id(), input, &mut stdout).await
}

/// Runs the chat over a stream of typed lines and any output.
pub async fn chat<W: Write>(
    form: LoginForm,
    user_id: String,
    mut lines: mpsc::Receiver<io::Result<String>>,
    out: &mut W,
) -> ClientResult<ChatOutcome> {
    let mut sink = TerminalSink::new(out, &user_id);
    let mut state = SessionState::Idle;

    let username = match form.username {
        Some(name) => name,
        None => {
            sink.prompt("Username: ");
            lines.recv().await.transpose()?.unwrap_or_default()
        }
    };
    let login = Login::parse(&username, &form.host, &form.port).inspect_err(|e| {
        sink.notice(&e.to_string());
    })?;

    let config = SessionConfig::new(user_id)
        .with_connect_timeout(Duration::from_secs(form.connect_timeout));
    let (dispatcher, mut queue) = Dispatcher::channel();

    transition(&mut state, SessionState::Connecting);
    sink.notice("Connecting...");
    let session =
        match Session::connect(&config, &login.username, &login.host, login.port, dispatcher).await
        {
            Ok(session) => session,
            Err(e) => {
                transition(&mut state, SessionState::Closed);
                sink.notice(&connect_error_message(&e));
                return Err(e.into());
            }
        };
    transition(&mut state, session.state());
    sink.welcome(session.username());

    let outcome = 'chat: loop {
        tokio::select! {
            event = queue.recv() => match event {
                Some(SessionEvent::ConnectionLost) | None => {
                    sink.on_connection_lost();
                    break 'chat ChatOutcome::ConnectionLost;
                }
                Some(event) => deliver(event, &mut sink),
            },
            line = lines.recv() => match line.transpose()? {
                Some(line) => match Input::parse(&line) {
                    Input::Empty => {}
                    Input::Quit => break 'chat ChatOutcome::Quit,
                    Input::Message(text) => {
                        if !session.is_connected() {
                            continue 'chat;
                        }
                        if let Err(e) = session.send_text(&text).await {
                            warn!(error = %e, "message not sent");
                            sink.notice("Failed to send message");
                        }
                    }
                },
                None => break 'chat ChatOutcome::Quit,
            },
        }
    };

    session.disconnect().await;
    transition(&mut state, session.state());
    Ok(outcome)
}

fn transition(state: &mut SessionState, next: SessionState) {
    if *state != next {
        debug!(from = ?state, to = ?next, "session state");
        *state = next;
    }
}
