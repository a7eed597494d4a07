//! Wire protocol for chatline.
//!
//! # Protocol Overview
//!
//! A connection carries a stream of UTF-8 JSON objects, one per line:
//!
//! ```text
//! {"type":"join","user_id":"…","username":"alice"}\n
//! {"type":"message","user_id":"…","username":"alice","message":"hi","timestamp":"…"}\n
//! {"type":"system","message":"alice joined the chat"}\n
//! ```
//!
//! There is no length prefix and no escaping beyond JSON's own: the encoder
//! never emits a raw newline inside a record, so the newline byte alone
//! delimits records.
//!
//! A bad record does not poison the stream. A record that is not an object
//! or has a missing or unknown `type` is rejected on its own and the next
//! line is read as usual.
//!
//! # Example
//!
//! ```rust
//! use chatline_protocol::{ChatEvent, FrameBuffer, decode, encode_line};
//!
//! let event = ChatEvent::system("welcome");
//! let wire = encode_line(&event).unwrap();
//!
//! let mut frames = FrameBuffer::new();
//! let records = frames.feed(&wire);
//! assert_eq!(decode(&records[0]).unwrap(), event);
//! ```

mod codec;
mod error;
mod event;
mod framing;

pub use codec::{decode, encode, encode_line};
pub use error::{ProtocolError, ProtocolResult};
pub use event::{ChatEvent, EventKind};
pub use framing::FrameBuffer;

/// Byte terminating every record on the wire.
pub const RECORD_SEPARATOR: u8 = b'\n';

/// Largest record accepted in either direction (1 MB).
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;
