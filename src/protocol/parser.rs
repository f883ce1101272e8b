//! Incremental frame parser.
//!
//! TCP delivers a byte stream, not message boundaries: a read may hold half a
//! command or several pipelined ones. [`parse_frame`] therefore never consumes
//! from the caller's buffer itself: it returns the parsed frame together with
//! the number of bytes it covered, or `Ok(None)` when the buffer ends before
//! the frame does. The connection layer advances its buffer on success and
//! reads more on `None`.
//!
//! Besides the five prefixed types, a line that starts with no known prefix is
//! treated as an inline command (space-separated words), which keeps hand-typed
//! `telnet` sessions working.

use crate::protocol::types::{prefix, Frame, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Hard cap on a single bulk payload (512 MB, as in Redis).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum array nesting before parsing is refused.
pub const MAX_DEPTH: usize = 32;

/// Errors for malformed wire data. These terminate the connection; everything
/// recoverable is reported in-band as an error frame instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid length literal: {0}")]
    BadLength(String),

    #[error("invalid integer literal: {0}")]
    BadInteger(String),

    #[error("invalid UTF-8 in line: {0}")]
    BadUtf8(String),

    #[error("negative bulk length: {0}")]
    NegativeBulkLength(i64),

    #[error("negative array length: {0}")]
    NegativeArrayLength(i64),

    #[error("bulk payload of {size} bytes exceeds limit of {max}")]
    BulkTooLarge { size: usize, max: usize },

    #[error("array nesting deeper than {0}")]
    TooDeep(usize),

    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Attempts to parse one frame from the front of `buf`.
///
/// Returns `Ok(Some((frame, consumed)))` on success, `Ok(None)` when the
/// buffer holds only a partial frame, and an error for data that can never
/// become a valid frame.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
    parse_at_depth(buf, 0)
}

fn parse_at_depth(buf: &[u8], depth: usize) -> Result<Option<(Frame, usize)>, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::TooDeep(MAX_DEPTH));
    }
    let Some(&first) = buf.first() else {
        return Ok(None);
    };

    match first {
        prefix::SIMPLE => parse_line(buf, |s| Ok(Frame::Simple(s.to_string()))),
        prefix::ERROR => parse_line(buf, |s| Ok(Frame::Error(s.to_string()))),
        prefix::INTEGER => parse_line(buf, |s| {
            let n: i64 = s
                .parse()
                .map_err(|_| ProtocolError::BadInteger(s.to_string()))?;
            Ok(Frame::Integer(n))
        }),
        prefix::BULK => parse_bulk(buf),
        prefix::ARRAY => parse_array(buf, depth),
        _ => parse_inline(buf),
    }
}

/// Parses a one-line frame (`+`, `-`, `:`): prefix, UTF-8 text, CRLF.
fn parse_line(
    buf: &[u8],
    build: impl FnOnce(&str) -> Result<Frame, ProtocolError>,
) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(line_end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let text = as_utf8(&buf[1..1 + line_end])?;
    let frame = build(text)?;
    Ok(Some((frame, 1 + line_end + 2)))
}

/// Parses `$<len>\r\n<payload>\r\n`, with `$-1\r\n` as null.
fn parse_bulk(buf: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(len_end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let len = parse_len(&buf[1..1 + len_end])?;
    let header = 1 + len_end + 2;

    if len == -1 {
        return Ok(Some((Frame::Null, header)));
    }
    if len < 0 {
        return Err(ProtocolError::NegativeBulkLength(len));
    }
    let len = len as usize;
    if len > MAX_BULK_LEN {
        return Err(ProtocolError::BulkTooLarge {
            size: len,
            max: MAX_BULK_LEN,
        });
    }

    let total = header + len + 2;
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + len..total] != CRLF {
        return Err(ProtocolError::Malformed(
            "bulk payload not CRLF-terminated".to_string(),
        ));
    }

    let payload = Bytes::copy_from_slice(&buf[header..header + len]);
    Ok(Some((Frame::Bulk(payload), total)))
}

/// Parses `*<count>\r\n` followed by `count` nested frames.
fn parse_array(buf: &[u8], depth: usize) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(count_end) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let count = parse_len(&buf[1..1 + count_end])?;
    let mut consumed = 1 + count_end + 2;

    if count == -1 {
        return Ok(Some((Frame::Null, consumed)));
    }
    if count < 0 {
        return Err(ProtocolError::NegativeArrayLength(count));
    }

    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match parse_at_depth(&buf[consumed..], depth + 1)? {
            Some((frame, used)) => {
                items.push(frame);
                consumed += used;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((Frame::Array(items), consumed)))
}

/// Parses a bare `word word word\r\n` line into an array of bulks.
fn parse_inline(buf: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(line_end) = find_crlf(buf) else {
        return Ok(None);
    };
    let line = as_utf8(&buf[..line_end])?;
    let words: Vec<Frame> = line
        .split_whitespace()
        .map(|w| Frame::Bulk(Bytes::copy_from_slice(w.as_bytes())))
        .collect();
    if words.is_empty() {
        return Err(ProtocolError::Malformed("empty inline command".to_string()));
    }
    Ok(Some((Frame::Array(words), line_end + 2)))
}

fn parse_len(raw: &[u8]) -> Result<i64, ProtocolError> {
    let text = as_utf8(raw)?;
    text.parse()
        .map_err(|_| ProtocolError::BadLength(text.to_string()))
}

fn as_utf8(raw: &[u8]) -> Result<&str, ProtocolError> {
    std::str::from_utf8(raw).map_err(|e| ProtocolError::BadUtf8(e.to_string()))
}

/// Offset of the `\r` of the first CRLF pair, if present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == CRLF)
}
