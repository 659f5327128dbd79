use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::client::PeerClient;
use super::merge::MergeReport;
use super::sweeper::Thresholds;
use super::table::MembershipTable;
use super::types::Record;
use crate::config::NodeConfig;
use crate::error::Result;

/// Node context: identity, membership table, timings and the outbound client.
///
/// Built once at startup and shared by `Arc` between the HTTP handlers and the
/// background loops.
pub struct MembershipService {
    pub local: Record,
    pub table: MembershipTable,
    pub config: NodeConfig,
    client: PeerClient,
}

impl MembershipService {
    pub fn new(self_endpoint: String, config: NodeConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let local = Record::healthy(&config.service, &self_endpoint, &config.zone);
        let table = MembershipTable::new(
            local.clone(),
            Thresholds {
                unhealthy: config.unhealthy_threshold,
                dead: config.dead_threshold,
            },
        );
        let client = PeerClient::new(config.gossip_timeout);

        Ok(Arc::new(Self {
            local,
            table,
            config,
            client,
        }))
    }

    pub fn self_endpoint(&self) -> &str {
        &self.local.endpoint
    }

    /// Spawns the heartbeat loop and the sweep+gossip loop. If seeds are
    /// given, one exchange with each of them runs first.
    pub fn start(self: Arc<Self>, seeds: Vec<String>) -> Vec<JoinHandle<()>> {
        tracing::info!("Starting membership service as {}", self.self_endpoint());

        let heartbeat_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.heartbeat_loop().await;
            })
        };

        let gossip_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.bootstrap(&seeds).await;
                service.gossip_loop().await;
            })
        };

        tracing::info!("All background tasks started");

        vec![heartbeat_handle, gossip_handle]
    }

    /// Re-announces this node to its own table.
    pub fn heartbeat_once(&self) {
        if let Err(e) = self.table.heartbeat(self.local.clone()) {
            tracing::error!("Self heartbeat failed: {}", e);
        }
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.heartbeat_interval);

        loop {
            interval.tick().await;
            self.heartbeat_once();
        }
    }

    async fn gossip_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.gossip_interval);

        loop {
            interval.tick().await;

            let report = self.table.sweep();
            if !report.is_empty() {
                tracing::info!(
                    "Sweep demoted {} and evicted {} record(s)",
                    report.demoted.len(),
                    report.evicted.len()
                );
            }
            let counts = self.table.counts();
            tracing::debug!(
                "Table: {} healthy, {} unhealthy",
                counts.healthy,
                counts.unhealthy
            );

            self.gossip_round().await;
        }
    }

    /// One outbound round: pick a random healthy peer of our service and
    /// exchange tables with it. Failures are logged and left to the next
    /// round.
    pub async fn gossip_round(&self) -> Option<MergeReport> {
        let candidates = self.table.peer_candidates(&self.config.service);
        if candidates.is_empty() {
            tracing::info!("No known {} peers, skipping gossip", self.config.service);
            return None;
        }

        let idx = rand::thread_rng().gen_range(0..candidates.len());
        let peer = &candidates[idx];

        match self.gossip_with(peer).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Could not gossip with {}: {}", peer, e);
                None
            }
        }
    }

    /// Sends the whole table to `peer` and merges what it answers.
    pub async fn gossip_with(&self, peer: &str) -> Result<MergeReport> {
        tracing::debug!("Gossiping with {}", peer);

        let records = self.table.get();
        let reply = self.client.gossip(peer, records).await?;
        let report = self.table.merge(reply);

        tracing::debug!(
            "Gossip with {}: learned {}, refreshed {}, rejected {}",
            peer,
            report.learned.len(),
            report.refreshed.len(),
            report.rejected
        );

        Ok(report)
    }

    /// One exchange with each seed, skipping ourselves. Unreachable seeds are
    /// logged; returns how many seeds answered.
    pub(crate) async fn bootstrap(&self, seeds: &[String]) -> usize {
        if seeds.is_empty() {
            return 0;
        }
        tracing::info!("Joining via {} seed node(s)", seeds.len());

        let mut reached = 0;
        for seed in seeds {
            if seed == self.self_endpoint() {
                continue;
            }
            match self.gossip_with(seed).await {
                Ok(report) => {
                    reached += 1;
                    tracing::info!(
                        "Seed {} gave us {} new record(s)",
                        seed,
                        report.learned.len()
                    );
                }
                Err(e) => tracing::warn!("Seed {} unreachable: {}", seed, e),
            }
        }

        reached
    }
}
