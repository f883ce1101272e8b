//! Per-connection session loop.
//!
//! A session walks a small state machine: idle, waiting for a complete
//! command; processing, while a command runs and its reply is written; and
//! two terminal hand-offs: closed (QUIT, client EOF, transport error) and
//! detached (DETACH or a subscribe command transferred socket ownership
//! elsewhere). Commands on one connection are strictly sequential: a reply is
//! fully written before the next command is parsed.

use crate::commands::{Dispatcher, Outcome};
use crate::protocol::{parse_frame, Frame, ProtocolError};
use crate::pubsub::Topic;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Read buffer cap; a client exceeding this without completing a frame is cut
/// off rather than allowed to balloon memory.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial read buffer capacity.
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Server-wide connection counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn add_bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn add_bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// How the command-processing phase of a session ended.
#[derive(Debug)]
enum SessionEnd {
    /// QUIT or clean client EOF; nothing left to do.
    Closed,
    /// DETACH: the socket moves to a one-shot background writer.
    Detach,
    /// SUBSCRIBE/PSUBSCRIBE: the socket moves to the pub/sub hub.
    Subscribe(Vec<Topic>),
}

/// Errors that terminate a session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("client went away mid-frame")]
    TruncatedFrame,

    #[error("read buffer limit exceeded")]
    BufferFull,
}

/// State for one client session.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    buffer: BytesMut,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Arc<Dispatcher>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            dispatcher,
            stats,
        }
    }

    /// Runs the session to completion, including any terminal hand-off.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let end = self.serve().await;
        self.stats.connection_closed();

        match end {
            Ok(SessionEnd::Closed) => {
                debug!(client = %self.addr, "session closed");
                Ok(())
            }
            Ok(SessionEnd::Detach) => {
                // Ownership transfer: the background task owns the socket
                // and is responsible for closing it on every path.
                let stream = self.stream.into_inner();
                tokio::spawn(write_ok_and_close(stream, self.addr));
                info!(client = %self.addr, "connection detached");
                Ok(())
            }
            Ok(SessionEnd::Subscribe(topics)) => {
                let hub = Arc::clone(self.dispatcher.pubsub());
                let stream = self.stream.into_inner();
                hub.attach(stream, self.addr, topics);
                Ok(())
            }
            Err(e) => {
                match &e {
                    ConnectionError::Io(io)
                        if io.kind() == std::io::ErrorKind::ConnectionReset =>
                    {
                        debug!(client = %self.addr, "connection reset by client")
                    }
                    _ => warn!(client = %self.addr, error = %e, "session error"),
                }
                Err(e)
            }
        }
    }

    /// The read → dispatch → reply loop. Hand-off outcomes flush pending
    /// writes and bubble up so `run`, which owns the socket, can move it.
    async fn serve(&mut self) -> Result<SessionEnd, ConnectionError> {
        loop {
            let Some(frame) = self.read_frame().await? else {
                return Ok(SessionEnd::Closed);
            };

            let outcome = self.dispatcher.dispatch(frame);
            self.stats.command_processed();

            match outcome {
                Outcome::Reply(reply) => self.write_frame(&reply).await?,
                Outcome::Close(reply) => {
                    self.write_frame(&reply).await?;
                    return Ok(SessionEnd::Closed);
                }
                Outcome::Detach => {
                    self.stream.flush().await?;
                    return Ok(SessionEnd::Detach);
                }
                Outcome::Subscribe(topics) => {
                    self.stream.flush().await?;
                    return Ok(SessionEnd::Subscribe(topics));
                }
            }
        }
    }

    /// Reads until the buffer holds one complete frame.
    ///
    /// `Ok(None)` is a clean EOF between commands; EOF mid-frame is an error.
    async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some((frame, consumed)) = parse_frame(&self.buffer)? {
                let _ = self.buffer.split_to(consumed);
                trace!(client = %self.addr, consumed, "frame parsed");
                return Ok(Some(frame));
            }

            if self.buffer.len() >= MAX_BUFFER_SIZE {
                warn!(client = %self.addr, size = self.buffer.len(), "read buffer overflow");
                return Err(ConnectionError::BufferFull);
            }

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ConnectionError::TruncatedFrame)
                };
            }
            self.stats.add_bytes_read(n);
        }
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let wire = frame.encode();
        self.stream.write_all(&wire).await?;
        self.stream.flush().await?;
        self.stats.add_bytes_written(wire.len());
        Ok(())
    }
}

/// DETACH's background half: one terminal `+OK`, then close.
async fn write_ok_and_close(mut stream: TcpStream, addr: SocketAddr) {
    if let Err(e) = stream.write_all(&Frame::ok().encode()).await {
        debug!(client = %addr, error = %e, "detached write failed");
    }
    let _ = stream.shutdown().await;
    debug!(client = %addr, "detached connection closed");
}

/// Convenience wrapper: build a handler and run it, logging terminal errors.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::Io(ref io) if io.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => debug!(client = %addr, error = %e, "session ended with error"),
        }
    }
}
