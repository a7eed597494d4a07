//! Newline-delimited record framing.
//!
//! TCP delivers an arbitrary fragmentation of the record stream: one read
//! may hold half a record, exactly one, or several. [`FrameBuffer`] keeps
//! the unterminated tail between reads and hands out complete records.
//!
//! ```text
//! read #1: {"type":"system","message":"a"}\n{"type":"sys
//! read #2: tem","message":"b"}\n
//!          ^ carried over from read #1
//! ```

use tracing::warn;

use crate::{MAX_RECORD_SIZE, RECORD_SEPARATOR};

/// Carry-over buffer splitting a byte stream into records.
///
/// After every [`feed`](Self::feed) the buffer holds no separator: all
/// complete records have been drained.
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    max_record: usize,
    /// Set while dropping an oversized record up to its separator.
    discarding: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Creates an empty buffer with the default record size limit.
    pub fn new() -> Self {
        Self::with_max_record(MAX_RECORD_SIZE)
    }

    /// Creates an empty buffer that drops records longer than `max_record`.
    pub fn with_max_record(max_record: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_record,
            discarding: false,
        }
    }

    /// Appends `bytes` and returns every record completed by them, in order.
    ///
    /// Records are returned without their separator. Empty and
    /// whitespace-only records are skipped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut records = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == RECORD_SEPARATOR) {
            let (head, tail) = (&rest[..pos], &rest[pos + 1..]);
            rest = tail;

            if self.discarding {
                self.discarding = false;
                self.pending.clear();
                continue;
            }

            if self.pending.len() + head.len() > self.max_record {
                warn!(
                    size = self.pending.len() + head.len(),
                    max = self.max_record,
                    "dropping oversized record"
                );
                self.pending.clear();
                continue;
            }

            self.pending.extend_from_slice(head);
            let record = std::mem::take(&mut self.pending);
            if !is_blank(&record) {
                records.push(record);
            }
        }

        if !self.discarding && !rest.is_empty() {
            if self.pending.len() + rest.len() > self.max_record {
                warn!(
                    max = self.max_record,
                    "record exceeds size limit, discarding until next separator"
                );
                self.pending.clear();
                self.discarding = true;
            } else {
                self.pending.extend_from_slice(rest);
            }
        }

        records
    }

    /// Returns the buffered bytes of the unterminated record.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Returns true when no partial record is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && !self.discarding
    }

    /// Drops any buffered bytes, e.g. before reusing the buffer on a new connection.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Ends the stream, returning the unterminated tail if there is one.
    ///
    /// Callers at end of stream discard this tail; it is returned so they
    /// can log what was lost.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.discarding = false;
        let tail = std::mem::take(&mut self.pending);
        (!is_blank(&tail)).then_some(tail)
    }
}

fn is_blank(record: &[u8]) -> bool {
    record.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode_line};
    use crate::event::ChatEvent;

    fn strings(records: Vec<Vec<u8>>) -> Vec<String> {
        records
            .into_iter()
            .map(|r| String::from_utf8(r).unwrap())
            .collect()
    }

    fn feed_chunks(frames: &mut FrameBuffer, chunks: &[&[u8]]) -> Vec<String> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(strings(frames.feed(chunk)));
        }
        out
    }

    const STREAM: &[u8] = b"R1\nrecord two\n{\"k\":3}\nR4\n";
    const EXPECTED: [&str; 4] = ["R1", "record two", "{\"k\":3}", "R4"];

    #[test]
    fn whole_stream_in_one_read() {
        let mut frames = FrameBuffer::new();
        assert_eq!(strings(frames.feed(STREAM)), EXPECTED);
        assert!(frames.is_empty());
    }

    #[test]
    fn one_byte_at_a_time() {
        let mut frames = FrameBuffer::new();
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        assert_eq!(feed_chunks(&mut frames, &chunks), EXPECTED);
        assert!(frames.is_empty());
    }

    #[test]
    fn every_three_way_split() {
        for i in 0..=STREAM.len() {
            for j in i..=STREAM.len() {
                let mut frames = FrameBuffer::new();
                let got = feed_chunks(&mut frames, &[&STREAM[..i], &STREAM[i..j], &STREAM[j..]]);
                assert_eq!(got, EXPECTED, "split at {i}/{j}");
                assert!(frames.is_empty(), "left over at {i}/{j}");
            }
        }
    }

    #[test]
    fn trailing_partial_record_is_carried() {
        let mut frames = FrameBuffer::new();
        assert_eq!(strings(frames.feed(b"A\nB")), ["A"]);
        assert_eq!(frames.pending(), b"B");
        assert_eq!(strings(frames.feed(b"C\n")), ["BC"]);
        assert!(frames.is_empty());
    }

    #[test]
    fn empty_feed_yields_nothing() {
        let mut frames = FrameBuffer::new();
        assert!(frames.feed(b"").is_empty());
        assert!(frames.feed(b"par").is_empty());
        assert!(frames.feed(b"").is_empty());
        assert_eq!(strings(frames.feed(b"tial\n")), ["partial"]);
    }

    #[test]
    fn empty_and_blank_records_are_skipped() {
        let mut frames = FrameBuffer::new();
        let got = strings(frames.feed(b"\n\nA\n\n  \t\nB\n\r\n"));
        assert_eq!(got, ["A", "B"]);
    }

    #[test]
    fn no_separator_left_after_feed() {
        let mut frames = FrameBuffer::new();
        frames.feed(b"x\ny\nz");
        assert!(!frames.pending().contains(&RECORD_SEPARATOR));
    }

    #[test]
    fn clear_resets_partial_record() {
        let mut frames = FrameBuffer::new();
        frames.feed(b"stale half");
        frames.clear();
        assert_eq!(strings(frames.feed(b"fresh\n")), ["fresh"]);
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut frames = FrameBuffer::new();
        frames.feed(b"done\nhalf");
        assert_eq!(frames.finish(), Some(b"half".to_vec()));
        assert!(frames.is_empty());
        assert_eq!(frames.finish(), None);
    }

    #[test]
    fn oversized_record_in_one_chunk_is_dropped() {
        let mut frames = FrameBuffer::with_max_record(4);
        let got = strings(frames.feed(b"ok\ntoolong\nfine\n"));
        assert_eq!(got, ["ok", "fine"]);
    }

    #[test]
    fn oversized_record_across_chunks_is_dropped() {
        let mut frames = FrameBuffer::with_max_record(4);
        assert_eq!(strings(frames.feed(b"ok\nabc")), ["ok"]);
        assert!(frames.feed(b"defgh").is_empty());
        assert!(!frames.is_empty());
        assert!(frames.feed(b"ijk").is_empty());
        assert_eq!(strings(frames.feed(b"lmn\nnext\n")), ["next"]);
        assert!(frames.is_empty());
    }

    fn decode_all(frames: &mut FrameBuffer, chunks: &[&[u8]]) -> Vec<ChatEvent> {
        chunks
            .iter()
            .flat_map(|chunk| frames.feed(chunk))
            .filter_map(|record| decode(&record).ok())
            .collect()
    }

    #[test]
    fn malformed_records_do_not_desync_stream() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"{garbage\n");
        wire.extend_from_slice(&encode_line(&ChatEvent::system("first")).unwrap());
        wire.extend_from_slice(b"{\"type\":\"typing\"}\n[]\n");
        wire.extend_from_slice(&encode_line(&ChatEvent::join("U1", "alice")).unwrap());

        let (head, tail) = wire.split_at(13);
        let mut frames = FrameBuffer::new();
        assert_eq!(
            decode_all(&mut frames, &[head, tail]),
            [ChatEvent::system("first"), ChatEvent::join("U1", "alice")]
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn unterminated_event_at_end_of_stream_is_not_delivered() {
        let mut wire = encode_line(&ChatEvent::system("kept")).unwrap();
        wire.extend_from_slice(br#"{"type":"system","message":"lost"}"#);

        let mut frames = FrameBuffer::new();
        assert_eq!(decode_all(&mut frames, &[wire.as_slice()]), [ChatEvent::system("kept")]);
        let tail = frames.finish().unwrap();
        assert_eq!(decode(&tail).unwrap(), ChatEvent::system("lost"));
        assert!(frames.is_empty());
    }

    #[test]
    fn encoded_events_split_back_into_one_record_each() {
        let events = vec![
            ChatEvent::join("U1", "alice"),
            ChatEvent::text("U1", "alice", "multi\nline", "2025-01-01T00:00:00"),
            ChatEvent::system("bye"),
        ];

        let mut wire = Vec::new();
        for event in &events {
            wire.extend_from_slice(&encode_line(event).unwrap());
        }
        assert_eq!(wire.iter().filter(|&&b| b == RECORD_SEPARATOR).count(), events.len());

        let chunks: Vec<&[u8]> = wire.chunks(7).collect();
        let mut frames = FrameBuffer::new();
        assert_eq!(decode_all(&mut frames, &chunks), events);
        assert_eq!(frames.finish(), None);
    }
}
