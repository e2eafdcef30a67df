use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BrokerError, Result};

const PUBLISH: &[u8] = b"PUBLISH";
const PUBLISH_PREFIX: &[u8] = b"PUBLISH ";
const CONSUME: &[u8] = b"CONSUME";

// Room for the line terminator and whitespace around a maximal PUBLISH line.
const LINE_SLACK: usize = 16;

// Bytes kept from the start of a discarded line, enough to tell a PUBLISH
// behind leading whitespace from anything else.
const HEAD_BYTES: usize = PUBLISH_PREFIX.len() + LINE_SLACK;

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Publish(Bytes),
    Consume,
}

impl Command {
    /// Parses one line with its terminator already removed.
    ///
    /// Surrounding ASCII whitespace is ignored. A bare `PUBLISH` carries an
    /// empty payload so the broker can reject it as such.
    pub fn parse(line: &Bytes) -> Result<Self> {
        let trimmed = line.trim_ascii();
        if trimmed == CONSUME {
            return Ok(Command::Consume);
        }
        if trimmed == PUBLISH {
            return Ok(Command::Publish(Bytes::new()));
        }
        match trimmed.strip_prefix(PUBLISH_PREFIX) {
            Some(payload) => Ok(Command::Publish(line.slice_ref(payload))),
            None => Err(BrokerError::InvalidFormat),
        }
    }

    /// Error for a line too long to be framed, judged by its first bytes:
    /// an oversized `PUBLISH` is a message that is too large, anything else
    /// is not a command at all.
    pub fn reject_oversized(head: &[u8], len: usize, max_message_bytes: usize) -> BrokerError {
        if head.trim_ascii_start().starts_with(PUBLISH_PREFIX) {
            BrokerError::MessageTooLarge {
                size: len,
                max: max_message_bytes,
            }
        } else {
            BrokerError::InvalidFormat
        }
    }
}

#[derive(Debug)]
pub enum Response {
    Published,
    Message(Bytes),
    Error(BrokerError),
}

impl Response {
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Response::Published => dst.extend_from_slice(b"SUCCESS: Message published\n"),
            Response::Message(payload) => {
                dst.reserve(payload.len() + 10);
                dst.extend_from_slice(b"SUCCESS: ");
                dst.extend_from_slice(payload);
                dst.put_u8(b'\n');
            }
            Response::Error(err) => {
                dst.extend_from_slice(b"ERROR: ");
                dst.extend_from_slice(err.to_string().as_bytes());
                dst.put_u8(b'\n');
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Line(Bytes),
    /// A line longer than the framer accepts. Only its first bytes are kept.
    Oversized { len: usize, head: Bytes },
}

/// Splits a read buffer into `\n`-terminated lines of bounded length.
#[derive(Debug)]
pub struct LineFramer {
    max_line_bytes: usize,
    // Where to resume scanning for a newline.
    next_index: usize,
    // Set while skipping the rest of an oversized line.
    discarding: bool,
    discarded: usize,
    head: BytesMut,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            next_index: 0,
            discarding: false,
            discarded: 0,
            head: BytesMut::new(),
        }
    }

    /// Framer sized for `PUBLISH` lines carrying up to `max_message_bytes`.
    pub fn for_message_limit(max_message_bytes: usize) -> Self {
        Self::new(max_message_bytes + PUBLISH_PREFIX.len() + LINE_SLACK)
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    pub fn decode(&mut self, buf: &mut BytesMut) -> Option<Frame> {
        let newline = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| offset + self.next_index);

        match newline {
            Some(pos) => {
                let mut line = buf.split_to(pos + 1);
                self.next_index = 0;
                line.truncate(pos);
                if self.discarding {
                    self.discarding = false;
                    self.keep_head(&line);
                    let len = std::mem::take(&mut self.discarded) + pos;
                    let head = self.head.split().freeze();
                    return Some(Frame::Oversized { len, head });
                }
                if line.len() > self.max_line_bytes {
                    let head = line.split_to(HEAD_BYTES.min(line.len())).freeze();
                    return Some(Frame::Oversized { len: pos, head });
                }
                Some(Frame::Line(line.freeze()))
            }
            None if self.discarding || buf.len() > self.max_line_bytes => {
                self.discarding = true;
                self.keep_head(buf);
                self.discarded += buf.len();
                buf.clear();
                self.next_index = 0;
                None
            }
            None => {
                self.next_index = buf.len();
                None
            }
        }
    }

    fn keep_head(&mut self, bytes: &[u8]) {
        let room = HEAD_BYTES.saturating_sub(self.head.len());
        self.head.extend_from_slice(&bytes[..room.min(bytes.len())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command> {
        Command::parse(&Bytes::copy_from_slice(line.as_bytes()))
    }

    #[test]
    fn parses_publish_and_consume() {
        assert_eq!(
            parse("PUBLISH hello world").unwrap(),
            Command::Publish(Bytes::from_static(b"hello world"))
        );
        assert_eq!(parse("CONSUME").unwrap(), Command::Consume);
        assert_eq!(parse("  CONSUME\r").unwrap(), Command::Consume);
    }

    #[test]
    fn bare_publish_is_empty_payload() {
        assert_eq!(parse("PUBLISH").unwrap(), Command::Publish(Bytes::new()));
        assert_eq!(parse("PUBLISH   \r").unwrap(), Command::Publish(Bytes::new()));
    }

    #[test]
    fn rejects_unknown_commands() {
        for line in ["FOO bar", "", "CONSUMEX", "publish hi", "PUBLISHhi", "CONSUME now"] {
            assert!(
                matches!(parse(line), Err(BrokerError::InvalidFormat)),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn encodes_responses() {
        let mut out = BytesMut::new();
        Response::Published.encode(&mut out);
        Response::Message(Bytes::from_static(b"hello")).encode(&mut out);
        Response::Error(BrokerError::QueueFull { capacity: 100 }).encode(&mut out);
        assert_eq!(
            &out[..],
            b"SUCCESS: Message published\nSUCCESS: hello\nERROR: Server is full\n"
        );
    }

    #[test]
    fn framer_yields_complete_lines_only() {
        let mut framer = LineFramer::new(64);
        let mut buf = BytesMut::from(&b"CONSUME\nPUBLISH a\nPUBL"[..]);
        assert_eq!(
            framer.decode(&mut buf),
            Some(Frame::Line(Bytes::from_static(b"CONSUME")))
        );
        assert_eq!(
            framer.decode(&mut buf),
            Some(Frame::Line(Bytes::from_static(b"PUBLISH a")))
        );
        assert_eq!(framer.decode(&mut buf), None);
        buf.extend_from_slice(b"ISH b\n");
        assert_eq!(
            framer.decode(&mut buf),
            Some(Frame::Line(Bytes::from_static(b"PUBLISH b")))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn framer_discards_oversized_lines() {
        let mut framer = LineFramer::new(8);
        let mut buf = BytesMut::from(&b"PUBLISH 0123"[..]);
        assert_eq!(framer.decode(&mut buf), None);
        assert!(buf.is_empty());
        buf.extend_from_slice(b"4567\nCONSUME\n");
        assert_eq!(
            framer.decode(&mut buf),
            Some(Frame::Oversized {
                len: 16,
                head: Bytes::from_static(b"PUBLISH 01234567"),
            })
        );
        assert_eq!(
            framer.decode(&mut buf),
            Some(Frame::Line(Bytes::from_static(b"CONSUME")))
        );
    }

    #[test]
    fn framer_flags_long_line_arriving_at_once() {
        let mut framer = LineFramer::new(4);
        let mut buf = BytesMut::from(&b"ABCDEFG\n"[..]);
        assert_eq!(
            framer.decode(&mut buf),
            Some(Frame::Oversized {
                len: 7,
                head: Bytes::from_static(b"ABCDEFG"),
            })
        );
    }

    #[test]
    fn framer_keeps_only_head_of_discarded_line() {
        let mut framer = LineFramer::new(32);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"FOO ");
        buf.extend_from_slice(&[b'y'; 100]);
        assert_eq!(framer.decode(&mut buf), None);
        buf.extend_from_slice(&[b'y'; 50]);
        assert_eq!(framer.decode(&mut buf), None);
        buf.extend_from_slice(b"y\n");

        match framer.decode(&mut buf) {
            Some(Frame::Oversized { len, head }) => {
                assert_eq!(len, 155);
                assert_eq!(head.len(), HEAD_BYTES);
                assert!(head.starts_with(b"FOO "));
            }
            other => panic!("expected oversized frame, got {other:?}"),
        }
    }

    #[test]
    fn oversized_lines_rejected_by_command() {
        assert!(matches!(
            Command::reject_oversized(b"PUBLISH xxxxxxxx", 20_000, 10_240),
            BrokerError::MessageTooLarge { size: 20_000, max: 10_240 }
        ));
        assert!(matches!(
            Command::reject_oversized(b"  PUBLISH xxxxxx", 20_000, 10_240),
            BrokerError::MessageTooLarge { .. }
        ));
        assert!(matches!(
            Command::reject_oversized(b"FOO yyyyyyyyyyyy", 20_000, 10_240),
            BrokerError::InvalidFormat
        ));
        assert!(matches!(
            Command::reject_oversized(b"CONSUMEzzzzzzzzz", 20_000, 10_240),
            BrokerError::InvalidFormat
        ));
    }
}
