use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::registry::Registry;

/// Periodically evicts peers that have not joined or polled within `ttl`.
pub fn spawn(registry: Arc<Registry>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.evict_stale(ttl).await;
            if evicted > 0 {
                let stats = registry.stats().await;
                info!(evicted, rooms = stats.rooms, peers = stats.peers, "stale peer sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryStats;

    #[tokio::test(start_paused = true)]
    async fn sweeps_silent_peers_on_schedule() {
        let registry = Arc::new(Registry::new(8));
        registry.join("R1", "alice", "").await;
        let sweeper = spawn(registry.clone(), Duration::from_secs(60), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(registry.stats().await.peers, 1);

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(registry.stats().await, RegistryStats::default());

        sweeper.abort();
    }
}
