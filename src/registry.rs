use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::RelayError;
use crate::room::{Peer, Room};
use crate::signal::SignalMessage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub rooms: usize,
    pub peers: usize,
    /// Messages queued across all mailboxes.
    pub pending: usize,
}

/// Every room and every mailbox in the process, behind a single lock.
///
/// All operations take the same mutex for their whole duration, so an enqueue
/// and a drain on the same mailbox can never interleave, and the order in
/// which sends acquire the lock is the order peers see messages in.
#[derive(Debug)]
pub struct Registry {
    rooms: Mutex<HashMap<String, Room>>,
    mailbox_capacity: usize,
}

impl Registry {
    pub fn new(mailbox_capacity: usize) -> Self {
        Registry {
            rooms: Mutex::new(HashMap::new()),
            mailbox_capacity,
        }
    }

    /// Puts `name` into room `code`, creating the room if needed. An existing
    /// peer with the same name is replaced along with its pending messages.
    /// Returns the other peers present at this moment.
    pub async fn join(&self, code: &str, name: &str, ip: &str) -> Vec<String> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(code.to_string()).or_insert_with(Room::new);
        let peer = Peer::new(code, name, ip, self.mailbox_capacity);
        if room.peers.insert(name.to_string(), peer).is_some() {
            debug!(room = %code, peer = %name, "peer rejoined, mailbox reset");
        }
        room.others(name)
    }

    /// Removes `name` from `code`, dropping the room once it is empty.
    /// Returns whether a peer was actually removed.
    pub async fn leave(&self, code: &str, name: &str) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(code) else {
            return false;
        };
        let removed = room.peers.remove(name).is_some();
        if room.is_empty() {
            rooms.remove(code);
            debug!(room = %code, "room closed");
        }
        removed
    }

    /// Current roster of `code`, or `None` if no such room exists.
    pub async fn lookup(&self, code: &str) -> Option<Vec<String>> {
        let rooms = self.rooms.lock().await;
        rooms.get(code).map(Room::names)
    }

    /// Queues `message` for its recipient, or broadcasts it to the rest of the
    /// room. Returns the number of mailboxes it landed in.
    pub async fn send(&self, message: SignalMessage) -> Result<usize, RelayError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(&message.code)
            .ok_or(RelayError::RoomNotFound)?;
        room.route(message).ok_or(RelayError::TargetNotFound)
    }

    /// Takes all pending messages for `name`. Unknown rooms and peers yield
    /// an empty list.
    pub async fn poll(&self, code: &str, name: &str) -> Vec<SignalMessage> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .get_mut(code)
            .and_then(|room| room.peers.get_mut(name))
            .map(Peer::drain)
            .unwrap_or_default()
    }

    /// Drops peers not seen within `ttl`, and any rooms left empty.
    /// Returns how many peers were evicted.
    pub async fn evict_stale(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut rooms = self.rooms.lock().await;
        let mut evicted = 0;
        rooms.retain(|code, room| {
            room.peers.retain(|name, peer| {
                let stale = peer.is_stale(now, ttl);
                if stale {
                    info!(room = %code, peer = %name, ip = %peer.ip, "evicting stale peer");
                    evicted += 1;
                }
                !stale
            });
            !room.is_empty()
        });
        evicted
    }

    pub async fn stats(&self) -> RegistryStats {
        let rooms = self.rooms.lock().await;
        let mut stats = RegistryStats {
            rooms: rooms.len(),
            ..RegistryStats::default()
        };
        for peer in rooms.values().flat_map(|room| room.peers.values()) {
            stats.peers += 1;
            stats.pending += peer.mailbox.len();
        }
        stats
    }
}
