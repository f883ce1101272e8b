//! Client connection management.
//!
//! Every accepted socket gets its own async task running a read → dispatch →
//! reply loop. The loop owns the socket until a command takes it away:
//! `QUIT` closes it, `DETACH` moves it to a one-shot background writer, and
//! `SUBSCRIBE`/`PSUBSCRIBE` move it into the pub/sub hub. Partial reads and
//! pipelined commands are both handled by accumulating into a `BytesMut`
//! buffer and parsing incrementally.

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
