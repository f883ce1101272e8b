//! Storage engine boundary.
//!
//! The command layer does not own a storage engine; it consumes one through
//! the [`Store`] trait: point reads and writes plus ordered range iteration.
//! Byte-lexicographic key order is the one invariant the scan engine leans
//! on: for a fixed key set, iteration is deterministic and monotonic.
//!
//! [`MemoryStore`] is the bundled engine, an ordered in-memory map that lets
//! the server binary and the test suite run without an external backend. Any
//! engine with sorted range scans (an LSM tree, a B-tree file, …) can be
//! plugged in instead.

pub mod adapter;
pub mod memory;

pub use adapter::{Store, StoreError, Visit};
pub use memory::MemoryStore;
