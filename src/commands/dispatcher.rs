//! Command table and dispatch.
//!
//! Dispatch is table-driven: a map from uppercase command name to a
//! [`CommandSpec`] carrying the arity rule and a plain handler function, so
//! each handler is testable on its own and adding a command is one table
//! entry. Arity is checked before the handler runs, and therefore before
//! any store access.
//!
//! Each command executes inside a scoped panic guard. An index slip or a
//! misbehaving engine must cost one error reply, not the connection: the
//! escaped panic is converted into an `-ERR` frame and the session keeps
//! serving. Ordinary failures never travel by panic; they are `Result`s
//! turned into error frames by the handlers themselves.

use crate::protocol::Frame;
use crate::pubsub::{PubSubHub, Topic};
use crate::scan::{matching_keys, scan_page, ScanOptions};
use crate::store::Store;
use bytes::Bytes;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// A client command: case-insensitive name plus argument vector.
#[derive(Debug, Clone)]
pub struct Command {
    /// Name as the client sent it (echoed back in error replies).
    pub name: String,
    /// Arguments, excluding the name.
    pub args: Vec<Bytes>,
}

impl Command {
    /// Extracts a command from a parsed frame (an array of strings).
    pub fn from_frame(frame: Frame) -> Result<Self, Frame> {
        let Frame::Array(items) = frame else {
            return Err(Frame::error("ERR invalid command format"));
        };
        let mut items = items.into_iter();
        let name = match items.next() {
            Some(item) => match item.as_bytes().map(std::str::from_utf8) {
                Some(Ok(name)) => name.to_string(),
                _ => return Err(Frame::error("ERR invalid command name")),
            },
            None => return Err(Frame::error("ERR empty command")),
        };

        let mut args = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Frame::Bulk(b) => args.push(b),
                Frame::Simple(s) => args.push(Bytes::from(s)),
                _ => return Err(Frame::error("ERR invalid argument type")),
            }
        }
        Ok(Command { name, args })
    }
}

/// What the connection should do after a command.
#[derive(Debug)]
pub enum Outcome {
    /// Write the frame, return to idle.
    Reply(Frame),
    /// Write the frame, then close the connection (QUIT).
    Close(Frame),
    /// Hand the socket to a background task that writes `+OK` and closes.
    Detach,
    /// Hand the socket to the pub/sub hub with these registrations.
    Subscribe(Vec<Topic>),
}

/// Arity rule for one command, counted excluding the name.
#[derive(Debug, Clone, Copy)]
enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// SCAN's rule: the full argument vector including the name must pair up
    /// into flag/value couples, i.e. an odd count excluding the name.
    Pairs,
}

impl Arity {
    fn accepts(&self, argc: usize) -> bool {
        match *self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
            Arity::Pairs => argc % 2 == 1,
        }
    }
}

type Handler = fn(&Dispatcher, &Command) -> Outcome;

struct CommandSpec {
    arity: Arity,
    handler: Handler,
}

/// Routes commands to handlers over a shared store and pub/sub hub.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    pubsub: Arc<PubSubHub>,
    table: HashMap<&'static str, CommandSpec>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, pubsub: Arc<PubSubHub>) -> Self {
        let mut table: HashMap<&'static str, CommandSpec> = HashMap::new();
        let mut entry = |name: &'static str, arity: Arity, handler: Handler| {
            table.insert(name, CommandSpec { arity, handler });
        };

        entry("PING", Arity::AtLeast(0), cmd_ping);
        entry("QUIT", Arity::AtLeast(0), cmd_quit);
        entry("SET", Arity::Exact(2), cmd_set);
        entry("GET", Arity::Exact(1), cmd_get);
        entry("DEL", Arity::Exact(1), cmd_del);
        entry("KEYS", Arity::Exact(1), cmd_keys);
        entry("SCAN", Arity::Pairs, cmd_scan);
        entry("PUBLISH", Arity::Exact(2), cmd_publish);
        entry("SUBSCRIBE", Arity::AtLeast(1), cmd_subscribe);
        entry("PSUBSCRIBE", Arity::AtLeast(1), cmd_psubscribe);
        entry("DETACH", Arity::AtLeast(0), cmd_detach);
        entry("CONFIG", Arity::Exact(2), cmd_config);
        entry("TYPE", Arity::AtLeast(0), cmd_type);

        Self {
            store,
            pubsub,
            table,
        }
    }

    /// The pub/sub hub commands publish into and subscribers attach to.
    pub fn pubsub(&self) -> &Arc<PubSubHub> {
        &self.pubsub
    }

    /// Dispatches one parsed frame under the panic guard.
    pub fn dispatch(&self, frame: Frame) -> Outcome {
        let command = match Command::from_frame(frame) {
            Ok(command) => command,
            Err(reply) => return Outcome::Reply(reply),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(&command))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!(command = %command.name, error = %message, "command panicked");
                Outcome::Reply(Frame::error(format!("ERR '{message}'")))
            }
        }
    }

    fn execute(&self, command: &Command) -> Outcome {
        let lookup = command.name.to_ascii_uppercase();
        let Some(spec) = self.table.get(lookup.as_str()) else {
            debug!(command = %command.name, "unknown command");
            return Outcome::Reply(Frame::error(format!(
                "ERR unknown command '{}'",
                command.name
            )));
        };
        if !spec.arity.accepts(command.args.len()) {
            return Outcome::Reply(wrong_arity(&command.name));
        }
        (spec.handler)(self, command)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.table.len())
            .finish()
    }
}

fn wrong_arity(name: &str) -> Frame {
    Frame::error(format!(
        "ERR wrong number of arguments for '{name}' command"
    ))
}

fn store_error(err: impl std::fmt::Display) -> Frame {
    Frame::error(format!("ERR '{err}'"))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected internal error".to_string()
    }
}

fn cmd_ping(_d: &Dispatcher, _cmd: &Command) -> Outcome {
    Outcome::Reply(Frame::pong())
}

fn cmd_quit(_d: &Dispatcher, _cmd: &Command) -> Outcome {
    Outcome::Close(Frame::ok())
}

fn cmd_set(d: &Dispatcher, cmd: &Command) -> Outcome {
    let key = cmd.args[0].clone();
    let value = cmd.args[1].clone();
    Outcome::Reply(match d.store.put(key, value) {
        Ok(()) => Frame::ok(),
        Err(e) => store_error(e),
    })
}

fn cmd_get(d: &Dispatcher, cmd: &Command) -> Outcome {
    Outcome::Reply(match d.store.get(&cmd.args[0]) {
        Ok(Some(value)) => Frame::Bulk(value),
        Ok(None) => Frame::Null,
        Err(e) => store_error(e),
    })
}

fn cmd_del(d: &Dispatcher, cmd: &Command) -> Outcome {
    Outcome::Reply(match d.store.delete(&cmd.args[0]) {
        Ok(()) => Frame::ok(),
        Err(e) => store_error(e),
    })
}

fn cmd_keys(d: &Dispatcher, cmd: &Command) -> Outcome {
    Outcome::Reply(match matching_keys(d.store.as_ref(), &cmd.args[0]) {
        Ok(keys) => Frame::Array(keys.into_iter().map(Frame::Bulk).collect()),
        Err(e) => store_error(e),
    })
}

/// SCAN <cursor> [MATCH pattern] [COUNT n]
///
/// Flags pair positionally: the name pairs with the cursor, then flag/value
/// couples follow in any order. Unknown flags are ignored and malformed
/// numbers fall back to their defaults, which keeps loose benchmarking
/// clients working.
fn cmd_scan(d: &Dispatcher, cmd: &Command) -> Outcome {
    let mut opts = ScanOptions {
        cursor: parse_number(&cmd.args[0]).unwrap_or(0),
        pattern: None,
        count: 0,
    };

    let mut i = 1;
    while i + 1 < cmd.args.len() {
        let flag = &cmd.args[i];
        let value = &cmd.args[i + 1];
        if flag.eq_ignore_ascii_case(b"match") {
            opts.pattern = Some(value.clone());
        } else if flag.eq_ignore_ascii_case(b"count") {
            opts.count = parse_number(value).unwrap_or(0) as usize;
        } else if flag.eq_ignore_ascii_case(b"scan") {
            opts.cursor = parse_number(value).unwrap_or(0);
        }
        i += 2;
    }

    Outcome::Reply(match scan_page(d.store.as_ref(), &opts) {
        Ok(page) => Frame::Array(vec![
            Frame::bulk(page.cursor.to_string()),
            Frame::Array(page.keys.into_iter().map(Frame::Bulk).collect()),
        ]),
        Err(e) => store_error(e),
    })
}

fn cmd_publish(d: &Dispatcher, cmd: &Command) -> Outcome {
    let reached = d.pubsub.publish(&cmd.args[0], cmd.args[1].clone());
    Outcome::Reply(Frame::Integer(reached as i64))
}

fn cmd_subscribe(_d: &Dispatcher, cmd: &Command) -> Outcome {
    Outcome::Subscribe(cmd.args.iter().cloned().map(Topic::Channel).collect())
}

fn cmd_psubscribe(_d: &Dispatcher, cmd: &Command) -> Outcome {
    Outcome::Subscribe(cmd.args.iter().cloned().map(Topic::Pattern).collect())
}

fn cmd_detach(_d: &Dispatcher, _cmd: &Command) -> Outcome {
    Outcome::Detach
}

/// Compatibility stub so `redis-benchmark` and friends can run their
/// CONFIG GET probes: echo the parameter name, report no value.
fn cmd_config(_d: &Dispatcher, cmd: &Command) -> Outcome {
    Outcome::Reply(Frame::Array(vec![
        Frame::Bulk(cmd.args[1].clone()),
        Frame::bulk(Bytes::new()),
    ]))
}

/// The store has no type system; every key reads as a scalar.
fn cmd_type(_d: &Dispatcher, _cmd: &Command) -> Outcome {
    Outcome::Reply(Frame::simple("string"))
}

fn parse_number(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}
