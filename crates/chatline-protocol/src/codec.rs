//! Encoding and decoding of single records.
//!
//! A record is one compact JSON object. [`encode`] produces the object alone;
//! [`encode_line`] appends the record separator for writing to the wire.

use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::event::{ChatEvent, EventKind};
use crate::{MAX_RECORD_SIZE, RECORD_SEPARATOR};

/// Encodes an event as one JSON record without the trailing separator.
///
/// The output never contains a raw newline: JSON string escaping turns
/// newlines inside message bodies into `\n` escapes.
pub fn encode(event: &ChatEvent) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(event)?;
    if json.len() > MAX_RECORD_SIZE {
        return Err(ProtocolError::RecordTooLarge {
            size: json.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    Ok(json)
}

/// Encodes an event followed by exactly one record separator.
pub fn encode_line(event: &ChatEvent) -> ProtocolResult<Vec<u8>> {
    let mut line = encode(event)?;
    line.push(RECORD_SEPARATOR);
    Ok(line)
}

/// Decodes one record (without separator) into an event.
///
/// # Errors
///
/// Fails when the bytes are not a JSON object, when `type` is missing or
/// not a string, when `type` is not one of `join`, `message` or `system`,
/// or when a field has the wrong JSON type.
pub fn decode(record: &[u8]) -> ProtocolResult<ChatEvent> {
    let value: Value = serde_json::from_slice(record)?;

    let tag = match &value {
        Value::Object(fields) => match fields.get("type") {
            Some(Value::String(tag)) => tag.as_str(),
            _ => return Err(ProtocolError::MissingType),
        },
        other => {
            return Err(ProtocolError::malformed(format!(
                "expected an object, got {}",
                json_kind(other)
            )));
        }
    };

    if EventKind::from_wire(tag).is_none() {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
