use anyhow::{bail, Result};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::client::PeerClient;

/// The set of peers this node knows, keyed by `host:port` address.
///
/// Shared across every inbound call; all access goes through the concurrent map,
/// never through ambient mutable state.
pub struct PeerRegistry {
    local_addr: String,
    peers: DashMap<String, PeerClient>,
}

impl PeerRegistry {
    pub fn new(local_addr: String) -> Self {
        Self {
            local_addr,
            peers: DashMap::new(),
        }
    }

    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.peers.contains_key(addr)
    }

    /// Every known peer address, unordered.
    pub fn list_connected(&self) -> Vec<String> {
        self.peers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of live handles in iteration order. Selection tie-breaks
    /// elsewhere rely on "first encountered" over this order.
    pub fn clients(&self) -> Vec<PeerClient> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Transitive gossip join seeded with `seed_addr`.
    ///
    /// Processes a work queue of candidate addresses: each not-yet-known address
    /// is resolved, added, and its own connected list enqueued. If the remote's
    /// list did not contain this node, the relation is made symmetric by calling
    /// `join` back on it. One unreachable transitive address never aborts the
    /// fan-out; an unreachable seed is an error.
    pub async fn join(&self, seed_addr: &str) -> Result<()> {
        let mut queue = VecDeque::new();
        queue.push_back(seed_addr.to_string());

        while let Some(addr) = queue.pop_front() {
            if addr == self.local_addr || self.peers.contains_key(&addr) {
                continue;
            }

            let client = PeerClient::new(&addr);
            let known = match client.list_connected().await {
                Ok(known) => known,
                Err(e) => {
                    tracing::warn!("Could not reach peer {} during join: {}", addr, e);
                    continue;
                }
            };

            self.peers.insert(addr.clone(), client.clone());
            tracing::info!("Connected to remote server: {}", addr);
            tracing::info!("Remote server is also connected to {:?}", known);

            let mut add_me = true;
            for other in known {
                if other == self.local_addr {
                    add_me = false;
                } else if !self.peers.contains_key(&other) {
                    queue.push_back(other);
                }
            }

            if add_me {
                if let Err(e) = client.join(&self.local_addr).await {
                    tracing::warn!("Symmetric join back to {} failed: {}", addr, e);
                }
            }
        }

        if seed_addr != self.local_addr && !self.peers.contains_key(seed_addr) {
            bail!("unable to join peer {}", seed_addr);
        }
        Ok(())
    }

    /// Measures `testResponse` round-trip latency for every known peer and
    /// returns addresses ordered fastest first (ties keep measurement order).
    /// Measured fresh on every call; peers that fail the probe are omitted.
    pub async fn probe_latencies(&self) -> Vec<(String, Duration)> {
        let mut measured = Vec::new();

        // Snapshot first so no map guard is held across the probe awaits.
        for client in self.clients() {
            let started = Instant::now();
            match client.test_response().await {
                Ok(true) => measured.push((client.addr().to_string(), started.elapsed())),
                Ok(false) | Err(_) => {
                    tracing::warn!("Peer {} did not answer liveness probe", client.addr());
                }
            }
        }

        measured.sort_by_key(|(_, elapsed)| *elapsed);
        measured
    }
}
