//! # keyspan - a Redis-wire gateway over an ordered key-value engine
//!
//! keyspan speaks enough of the Redis protocol that stock clients and tooling
//! (`redis-cli`, `redis-benchmark`) work unmodified, while the data lives in
//! an ordered key-value engine reached through a narrow adapter trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           keyspan                            │
//! │                                                              │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────┐      │
//! │  │ TCP server │──>│ Connection │──>│    Dispatcher    │      │
//! │  │ (accept)   │   │  session   │   │  (command table) │      │
//! │  └────────────┘   └────────────┘   └───┬──────────┬───┘      │
//! │                                        │          │          │
//! │        ┌───────────────┐   ┌───────────▼──┐   ┌───▼──────┐   │
//! │        │ Frame parser  │   │ Scan engine  │   │ Pub/Sub  │   │
//! │        │ (incremental) │   │ KEYS / SCAN  │   │   hub    │   │
//! │        └───────────────┘   └──────┬───────┘   └──────────┘   │
//! │                                   │                          │
//! │                       ┌───────────▼───────────┐              │
//! │                       │  Store adapter trait  │              │
//! │                       │ (ordered range scans) │              │
//! │                       └───────────────────────┘              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What makes it interesting
//!
//! The engine underneath offers sorted range iteration, not Redis's bucketed
//! hash table, so incremental `SCAN` is emulated with a stateless skip-count
//! cursor replayed over the (possibly prefix-restricted) key range. Patterns
//! use a reduced glob grammar (`*` only) shared by `KEYS`, `SCAN MATCH`
//! and pattern subscriptions.
//!
//! ## Command surface
//!
//! `PING`, `QUIT`, `SET`, `GET`, `DEL`, `KEYS`, `SCAN`, `PUBLISH`,
//! `SUBSCRIBE`, `PSUBSCRIBE`, `DETACH`, `CONFIG` (stub), `TYPE`.
//!
//! ## Module overview
//!
//! - [`protocol`]: frame types and the incremental wire parser
//! - [`glob`]: the reduced glob matcher
//! - [`store`]: the engine adapter trait plus the bundled in-memory engine
//! - [`scan`]: KEYS/SCAN emulation over ordered iteration
//! - [`commands`]: command table, handlers, dispatch outcomes
//! - [`pubsub`]: subscription registry and detached subscriber I/O
//! - [`connection`]: per-connection session loop and statistics

pub mod commands;
pub mod connection;
pub mod glob;
pub mod protocol;
pub mod pubsub;
pub mod scan;
pub mod store;

pub use commands::{Command, Dispatcher, Outcome};
pub use connection::{handle_connection, ConnectionStats};
pub use glob::glob_match;
pub use protocol::{Frame, ProtocolError};
pub use pubsub::{PubSubHub, Topic};
pub use scan::{matching_keys, scan_page, ScanOptions, ScanPage};
pub use store::{MemoryStore, Store, StoreError};

/// Default port (same as Redis, so stock tooling connects out of the box).
pub const DEFAULT_PORT: u16 = 6379;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
