//! Wire protocol implementation.
//!
//! keyspan speaks the Redis serialization protocol (RESP) so that stock Redis
//! clients and tooling can talk to it unmodified. The protocol is built from a
//! small set of typed values, each introduced by a one-byte prefix and
//! terminated by CRLF.
//!
//! - `types`: the [`Frame`] enum and its wire encoding
//! - `parser`: incremental, binary-safe parsing of incoming bytes
//!
//! The parser is incremental by design: it reports `Ok(None)` on partial
//! input so the connection layer can keep accumulating bytes from the socket
//! and retry, which is what makes client pipelining work.

pub mod parser;
pub mod types;

pub use parser::{parse_frame, ProtocolError};
pub use types::Frame;
