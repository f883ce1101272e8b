//! Publish/subscribe fan-out and detached subscriber I/O.
//!
//! Subscribing is a one-way door: once a connection issues `SUBSCRIBE` or
//! `PSUBSCRIBE`, command processing for it stops and the hub takes ownership
//! of the socket. A per-subscriber forwarding task writes confirmation frames
//! and every subsequently published message, and watches the read half for
//! client EOF; on any exit path the subscriber is deregistered and the socket
//! closed.
//!
//! Channel patterns use the same reduced glob grammar as key patterns.

use crate::glob::glob_match;
use crate::protocol::Frame;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One subscription registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Exact channel name.
    Channel(Bytes),
    /// Glob pattern over channel names.
    Pattern(Bytes),
}

impl Topic {
    fn matches(&self, channel: &[u8]) -> bool {
        match self {
            Topic::Channel(name) => name.as_ref() == channel,
            Topic::Pattern(pattern) => glob_match(pattern, channel),
        }
    }

    /// Frame pushed to a subscriber when a message lands on `channel`.
    fn message_frame(&self, channel: &[u8], payload: &Bytes) -> Frame {
        match self {
            Topic::Channel(_) => Frame::Array(vec![
                Frame::bulk(Bytes::from_static(b"message")),
                Frame::bulk(Bytes::copy_from_slice(channel)),
                Frame::Bulk(payload.clone()),
            ]),
            Topic::Pattern(pattern) => Frame::Array(vec![
                Frame::bulk(Bytes::from_static(b"pmessage")),
                Frame::Bulk(pattern.clone()),
                Frame::bulk(Bytes::copy_from_slice(channel)),
                Frame::Bulk(payload.clone()),
            ]),
        }
    }

    /// Confirmation frame acknowledging this registration.
    fn confirm_frame(&self, position: i64) -> Frame {
        let (kind, name) = match self {
            Topic::Channel(name) => (&b"subscribe"[..], name.clone()),
            Topic::Pattern(pattern) => (&b"psubscribe"[..], pattern.clone()),
        };
        Frame::Array(vec![
            Frame::bulk(Bytes::copy_from_slice(kind)),
            Frame::Bulk(name),
            Frame::Integer(position),
        ])
    }
}

struct Subscriber {
    topics: Vec<Topic>,
    outbox: mpsc::UnboundedSender<Frame>,
}

/// Subscription registry and message router.
///
/// Shared by every connection; `publish` is synchronous (frames are queued on
/// unbounded per-subscriber channels), the actual socket writes happen on the
/// subscribers' forwarding tasks.
#[derive(Default)]
pub struct PubSubHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl PubSubHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `payload` to every subscriber with a matching topic.
    ///
    /// Returns the number of connections reached. A connection holding
    /// several matching topics receives one frame per topic but counts once.
    /// Subscribers whose forwarding task has gone away are pruned here.
    pub fn publish(&self, channel: &[u8], payload: Bytes) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        let mut reached = 0;
        let mut dead = Vec::new();

        for (&id, sub) in subscribers.iter() {
            let mut delivered = false;
            for topic in &sub.topics {
                if !topic.matches(channel) {
                    continue;
                }
                if sub.outbox.send(topic.message_frame(channel, &payload)).is_ok() {
                    delivered = true;
                } else {
                    dead.push(id);
                    break;
                }
            }
            if delivered {
                reached += 1;
            }
        }

        for id in dead {
            subscribers.remove(&id);
        }
        reached
    }

    /// Number of registered subscriber connections.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Registers a subscriber and returns its id plus the frame inbox.
    ///
    /// Confirmation frames for each topic are already queued on the inbox in
    /// registration order.
    fn register(&self, topics: Vec<Topic>) -> (u64, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for (i, topic) in topics.iter().enumerate() {
            let _ = tx.send(topic.confirm_frame(i as i64 + 1));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap()
            .insert(id, Subscriber { topics, outbox: tx });
        (id, rx)
    }

    fn deregister(&self, id: u64) {
        self.subscribers.lock().unwrap().remove(&id);
    }

    /// Takes ownership of a subscribing connection's socket.
    ///
    /// Spawns the forwarding task: confirmation frames first, then published
    /// messages as they arrive, until the outbox closes, a write fails, or
    /// the client hangs up. Every exit path deregisters and closes.
    pub fn attach(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr, topics: Vec<Topic>) {
        let (id, mut inbox) = self.register(topics);
        let hub = Arc::clone(self);
        info!(client = %addr, id = id, "subscriber attached");

        tokio::spawn(async move {
            let (mut reader, mut writer) = stream.into_split();
            let mut discard = [0u8; 512];
            loop {
                tokio::select! {
                    frame = inbox.recv() => {
                        let Some(frame) = frame else { break };
                        if writer.write_all(&frame.encode()).await.is_err() {
                            break;
                        }
                    }
                    read = reader.read(&mut discard) => {
                        // Subscribers send nothing we act on; EOF or error
                        // is the only signal, anything else is drained.
                        match read {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }
                    }
                }
            }
            hub.deregister(id);
            let _ = writer.shutdown().await;
            debug!(client = %addr, id = id, "subscriber detached");
        });
    }
}

impl std::fmt::Debug for PubSubHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &[u8]) -> Topic {
        Topic::Channel(Bytes::copy_from_slice(name))
    }

    fn pattern(p: &[u8]) -> Topic {
        Topic::Pattern(Bytes::copy_from_slice(p))
    }

    #[test]
    fn publish_with_no_subscribers_reaches_nobody() {
        let hub = PubSubHub::new();
        assert_eq!(hub.publish(b"news", Bytes::from_static(b"hi")), 0);
    }

    #[test]
    fn channel_subscriber_receives_message_frame() {
        let hub = PubSubHub::new();
        let (_, mut rx) = hub.register(vec![channel(b"news")]);

        // Confirmation first.
        let confirm = rx.try_recv().unwrap();
        assert_eq!(
            confirm,
            Frame::Array(vec![
                Frame::bulk(Bytes::from_static(b"subscribe")),
                Frame::bulk(Bytes::from_static(b"news")),
                Frame::Integer(1),
            ])
        );

        assert_eq!(hub.publish(b"news", Bytes::from_static(b"hello")), 1);
        let msg = rx.try_recv().unwrap();
        assert_eq!(
            msg,
            Frame::Array(vec![
                Frame::bulk(Bytes::from_static(b"message")),
                Frame::bulk(Bytes::from_static(b"news")),
                Frame::bulk(Bytes::from_static(b"hello")),
            ])
        );
    }

    #[test]
    fn pattern_subscriber_gets_pmessage_with_glob_semantics() {
        let hub = PubSubHub::new();
        let (_, mut rx) = hub.register(vec![pattern(b"news.*")]);
        let _ = rx.try_recv().unwrap(); // psubscribe confirmation

        assert_eq!(hub.publish(b"news.tech", Bytes::from_static(b"x")), 1);
        assert_eq!(hub.publish(b"sports.tech", Bytes::from_static(b"x")), 0);

        let msg = rx.try_recv().unwrap();
        assert_eq!(
            msg,
            Frame::Array(vec![
                Frame::bulk(Bytes::from_static(b"pmessage")),
                Frame::bulk(Bytes::from_static(b"news.*")),
                Frame::bulk(Bytes::from_static(b"news.tech")),
                Frame::bulk(Bytes::from_static(b"x")),
            ])
        );
    }

    #[test]
    fn connection_with_overlapping_topics_counts_once() {
        let hub = PubSubHub::new();
        let (_, mut rx) = hub.register(vec![channel(b"news"), pattern(b"n*")]);
        let _ = rx.try_recv().unwrap();
        let _ = rx.try_recv().unwrap();

        // One connection, two matching topics: counted once, two frames.
        assert_eq!(hub.publish(b"news", Bytes::from_static(b"x")), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn multiple_connections_each_count() {
        let hub = PubSubHub::new();
        let (_, _rx1) = hub.register(vec![channel(b"c")]);
        let (_, _rx2) = hub.register(vec![channel(b"c")]);
        let (_, _rx3) = hub.register(vec![channel(b"other")]);

        assert_eq!(hub.publish(b"c", Bytes::from_static(b"x")), 2);
    }

    #[test]
    fn dead_subscribers_are_pruned_on_publish() {
        let hub = PubSubHub::new();
        let (_, rx) = hub.register(vec![channel(b"c")]);
        assert_eq!(hub.subscriber_count(), 1);

        drop(rx);
        assert_eq!(hub.publish(b"c", Bytes::from_static(b"x")), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn confirmations_number_topics_in_order() {
        let hub = PubSubHub::new();
        let (_, mut rx) = hub.register(vec![channel(b"a"), channel(b"b")]);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(matches!(first, Frame::Array(ref v) if v[2] == Frame::Integer(1)));
        assert!(matches!(second, Frame::Array(ref v) if v[2] == Frame::Integer(2)));
    }
}
