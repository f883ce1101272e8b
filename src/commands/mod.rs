//! Command processing layer.
//!
//! A parsed frame becomes a [`Command`]; the [`Dispatcher`] validates its
//! arity against a fixed command table and routes it to a handler. Handlers
//! return an [`Outcome`] that tells the connection what to do next: write a
//! reply and keep going, close, or hand the socket off (DETACH, SUBSCRIBE).

pub mod dispatcher;

pub use dispatcher::{Command, Dispatcher, Outcome};
