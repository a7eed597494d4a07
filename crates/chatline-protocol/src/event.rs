//! Chat events exchanged between clients and the relay.

use serde::{Deserialize, Serialize};

/// One message unit, inbound or outbound.
///
/// The `type` tag selects the variant on the wire. Text and system events
/// carry their body in a field named `message`.
///
/// String fields default to empty when absent so that a peer omitting, say,
/// a timestamp does not lose the whole message. Renderers decide how to show
/// empty names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user announcing itself after connecting.
    Join {
        /// Opaque identity, compared only for equality.
        #[serde(default)]
        user_id: String,
        /// Display name chosen at login.
        #[serde(default)]
        username: String,
    },

    /// A text message from a user.
    #[serde(rename = "message")]
    Text {
        /// Opaque identity of the author.
        #[serde(default)]
        user_id: String,
        /// Author display name.
        #[serde(default)]
        username: String,
        /// Message body.
        #[serde(rename = "message", default)]
        body: String,
        /// Producer-assigned timestamp, not validated.
        #[serde(default)]
        timestamp: String,
    },

    /// A notice from the relay (joins, departures, announcements).
    System {
        /// Notice text.
        #[serde(rename = "message", default)]
        body: String,
    },
}

/// Discriminator of a [`ChatEvent`], as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Join,
    Text,
    System,
}

impl EventKind {
    /// Parses a wire `type` value.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "join" => Some(Self::Join),
            "message" => Some(Self::Text),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Returns the wire `type` value.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Text => "message",
            Self::System => "system",
        }
    }
}

impl ChatEvent {
    /// Creates a join event.
    pub fn join(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self::Join {
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    /// Creates a text event.
    pub fn text(
        user_id: impl Into<String>,
        username: impl Into<String>,
        body: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self::Text {
            user_id: user_id.into(),
            username: username.into(),
            body: body.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Creates a system notice.
    pub fn system(body: impl Into<String>) -> Self {
        Self::System { body: body.into() }
    }

    /// Returns the event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Join { .. } => EventKind::Join,
            Self::Text { .. } => EventKind::Text,
            Self::System { .. } => EventKind::System,
        }
    }

    /// Returns the author's identity, if the event has one.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Join { user_id, .. } | Self::Text { user_id, .. } => Some(user_id),
            Self::System { .. } => None,
        }
    }

    /// Returns the author's display name, if the event has one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Join { username, .. } | Self::Text { username, .. } => Some(username),
            Self::System { .. } => None,
        }
    }

    /// Returns true if this event was authored by `user_id`.
    pub fn is_from(&self, user_id: &str) -> bool {
        self.user_id() == Some(user_id)
    }
}
