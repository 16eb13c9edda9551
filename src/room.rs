use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::signal::SignalMessage;

/// FIFO of messages waiting for the owning peer's next poll.
#[derive(Debug)]
pub struct Mailbox {
    queue: VecDeque<SignalMessage>,
    capacity: usize,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Mailbox {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends to the tail. When full the oldest message is dropped and returned.
    pub fn enqueue(&mut self, message: SignalMessage) -> Option<SignalMessage> {
        let dropped = if self.queue.len() >= self.capacity {
            self.queue.pop_front()
        } else {
            None
        };
        self.queue.push_back(message);
        dropped
    }

    /// Hands back everything queued so far and leaves the mailbox empty.
    pub fn drain(&mut self) -> Vec<SignalMessage> {
        std::mem::take(&mut self.queue).into()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Debug)]
pub struct Peer {
    pub name: String,
    pub code: String,
    pub ip: String,
    pub mailbox: Mailbox,
    pub last_seen: Instant,
}

impl Peer {
    pub fn new(code: &str, name: &str, ip: &str, mailbox_capacity: usize) -> Self {
        Peer {
            name: name.to_string(),
            code: code.to_string(),
            ip: ip.to_string(),
            mailbox: Mailbox::new(mailbox_capacity),
            last_seen: Instant::now(),
        }
    }

    fn deliver(&mut self, message: SignalMessage) {
        if let Some(dropped) = self.mailbox.enqueue(message) {
            warn!(
                room = %self.code,
                peer = %self.name,
                from = %dropped.from,
                kind = %dropped.kind,
                "mailbox full, dropped oldest message"
            );
        }
    }

    pub fn drain(&mut self) -> Vec<SignalMessage> {
        self.last_seen = Instant::now();
        self.mailbox.drain()
    }

    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }
}

/// A group of peers sharing a code. Peers are keyed by name, kept in name order.
#[derive(Debug, Default)]
pub struct Room {
    pub peers: BTreeMap<String, Peer>,
}

impl Room {
    pub fn new() -> Self {
        Room::default()
    }

    /// Names of everyone in the room except `name`.
    pub fn others(&self, name: &str) -> Vec<String> {
        self.peers
            .keys()
            .filter(|peer| peer.as_str() != name)
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    /// Queues `message` for its recipient, or for every peer but the sender
    /// when it has none. Returns how many mailboxes received it, or `None`
    /// if the named recipient is not in the room.
    pub fn route(&mut self, message: SignalMessage) -> Option<usize> {
        match message.recipient() {
            Some(target) => {
                let peer = self.peers.get_mut(target)?;
                peer.deliver(message);
                Some(1)
            }
            None => {
                let mut delivered = 0;
                for (name, peer) in self.peers.iter_mut() {
                    if *name == message.from {
                        continue;
                    }
                    peer.deliver(message.clone());
                    delivered += 1;
                }
                Some(delivered)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(from: &str, to: Option<&str>, kind: &str) -> SignalMessage {
        SignalMessage {
            code: "R1".into(),
            from: from.into(),
            to: to.map(String::from),
            kind: kind.into(),
            data: None,
        }
    }

    #[test]
    fn mailbox_drains_in_fifo_order_once() {
        let mut mailbox = Mailbox::new(8);
        mailbox.enqueue(msg("a", None, "offer"));
        mailbox.enqueue(msg("a", None, "candidate"));

        let kinds: Vec<_> = mailbox.drain().into_iter().map(|m| m.kind).collect();
        assert_eq!(kinds, ["offer", "candidate"]);
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn full_mailbox_drops_oldest() {
        let mut mailbox = Mailbox::new(2);
        assert!(mailbox.enqueue(msg("a", None, "1")).is_none());
        assert!(mailbox.enqueue(msg("a", None, "2")).is_none());
        let dropped = mailbox.enqueue(msg("a", None, "3")).unwrap();
        assert_eq!(dropped.kind, "1");
        assert_eq!(mailbox.len(), 2);

        let kinds: Vec<_> = mailbox.drain().into_iter().map(|m| m.kind).collect();
        assert_eq!(kinds, ["2", "3"]);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut mailbox = Mailbox::new(0);
        mailbox.enqueue(msg("a", None, "offer"));
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn broadcast_skips_sender() {
        let mut room = Room::new();
        for name in ["alice", "bob", "carol"] {
            room.peers
                .insert(name.into(), Peer::new("R1", name, "", 8));
        }

        assert_eq!(room.route(msg("alice", None, "hello")), Some(2));
        assert_eq!(room.peers["alice"].mailbox.len(), 0);
        assert_eq!(room.peers["bob"].mailbox.len(), 1);
        assert_eq!(room.peers["carol"].mailbox.len(), 1);
    }

    #[test]
    fn direct_route_to_unknown_peer_is_none() {
        let mut room = Room::new();
        room.peers.insert("alice".into(), Peer::new("R1", "alice", "", 8));
        assert_eq!(room.route(msg("alice", Some("zed"), "offer")), None);
        assert_eq!(room.others("alice"), Vec::<String>::new());
    }
}
