//! Typed wire values.
//!
//! Every reply keyspan writes, and every command it reads, is one of six
//! shapes:
//!
//! - Simple string: `+OK\r\n`
//! - Error: `-ERR unknown command\r\n`
//! - Integer: `:42\r\n`
//! - Bulk string: `$5\r\nhello\r\n` (binary safe)
//! - Null: `$-1\r\n`
//! - Array: `*2\r\n$4\r\nKEYS\r\n$1\r\n*\r\n`
//!
//! Keys, values, channels and messages are all opaque bytes, so bulk strings
//! carry [`Bytes`] rather than `String`.

use bytes::Bytes;

/// CRLF line terminator.
pub const CRLF: &[u8] = b"\r\n";

/// One-byte type prefixes.
pub mod prefix {
    pub const SIMPLE: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single protocol value, used for both requests and replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Non-binary text without CRLF, e.g. `+OK`.
    Simple(String),
    /// Error reply, e.g. `-ERR wrong number of arguments`.
    Error(String),
    /// Signed 64-bit integer reply.
    Integer(i64),
    /// Binary-safe payload.
    Bulk(Bytes),
    /// Null bulk string (`$-1`), reported for absent keys.
    Null,
    /// Ordered sequence of frames; commands arrive as arrays of bulks.
    Array(Vec<Frame>),
}

impl Frame {
    pub fn simple(s: impl Into<String>) -> Self {
        Frame::Simple(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Frame::Error(s.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(data.into())
    }

    /// The canonical `+OK` reply.
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    /// The canonical `+PONG` reply.
    pub fn pong() -> Self {
        Frame::Simple("PONG".to_string())
    }

    /// Encodes this frame into its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        self.encode_into(&mut buf);
        buf
    }

    /// Encodes this frame into an existing buffer, appending.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => {
                buf.push(prefix::SIMPLE);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Bulk(data) => {
                buf.push(prefix::BULK);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Frame::Null => {
                buf.extend_from_slice(b"$-1");
                buf.extend_from_slice(CRLF);
            }
            Frame::Array(items) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for item in items {
                    item.encode_into(buf);
                }
            }
        }
    }

    /// Borrows the payload of a bulk or simple string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Frame::Bulk(b) => Some(b),
            Frame::Simple(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }
}
