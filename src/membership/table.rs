//! Membership Table
//!
//! Node-local mapping `endpoint -> HealthRecord`, the only shared mutable state
//! in the agent. Every logical operation (a sweep pass, a merged batch, a
//! gossip exchange, a heartbeat, a snapshot) runs inside one critical section,
//! so a demotion and a promotion on the same record can never interleave.
//! Nothing awaits or does I/O while the lock is held.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;

use super::merge::{MergeReport, merge_records};
use super::sweeper::{SweepReport, Thresholds, sweep_records};
use super::types::{HealthRecord, HealthState, Record};
use crate::error::{Error, Result};

/// Result of serving an inbound gossip exchange.
#[derive(Debug, Default)]
pub struct Exchange {
    /// The table as it stood after the sweep and before the merge.
    pub response: Vec<Record>,
    pub sweep: SweepReport,
    pub merge: MergeReport,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub healthy: usize,
    pub unhealthy: usize,
}

pub struct MembershipTable {
    self_endpoint: String,
    thresholds: Thresholds,
    records: RwLock<HashMap<String, HealthRecord>>,
}

impl MembershipTable {
    /// Creates a table already holding the node's own record.
    pub fn new(local: Record, thresholds: Thresholds) -> Self {
        let self_endpoint = local.endpoint.clone();
        let mut records = HashMap::new();
        records.insert(
            self_endpoint.clone(),
            HealthRecord::new(
                Record {
                    state: HealthState::Healthy,
                    ..local
                },
                Instant::now(),
            ),
        );

        Self {
            self_endpoint,
            thresholds,
            records: RwLock::new(records),
        }
    }

    pub fn self_endpoint(&self) -> &str {
        &self.self_endpoint
    }

    /// Snapshot of every advertised record. The lock is released before the
    /// caller sees the data.
    pub fn get(&self) -> Vec<Record> {
        self.records
            .read()
            .values()
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn get_entry(&self, endpoint: &str) -> Option<HealthRecord> {
        self.records.read().get(endpoint).cloned()
    }

    /// Inserts or replaces a peer entry keyed by its endpoint. The self entry
    /// is only ever refreshed through `heartbeat`, so it is refused here.
    pub fn upsert(&self, entry: HealthRecord) -> bool {
        if entry.endpoint() == self.self_endpoint {
            return false;
        }
        self.records
            .write()
            .insert(entry.record.endpoint.clone(), entry);
        true
    }

    /// Removes a peer entry. The self entry cannot be removed.
    pub fn remove(&self, endpoint: &str) -> Option<HealthRecord> {
        if endpoint == self.self_endpoint {
            return None;
        }
        self.records.write().remove(endpoint)
    }

    /// Visits every entry under a single read lock.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&HealthRecord),
    {
        for entry in self.records.read().values() {
            f(entry);
        }
    }

    pub fn counts(&self) -> TableCounts {
        let mut counts = TableCounts::default();
        self.for_each(|entry| match entry.state() {
            HealthState::Healthy => counts.healthy += 1,
            _ => counts.unhealthy += 1,
        });
        counts
    }

    /// Endpoints eligible as gossip targets: same service, HEALTHY, not self.
    pub fn peer_candidates(&self, service: &str) -> Vec<String> {
        self.records
            .read()
            .values()
            .filter(|entry| {
                entry.endpoint() != self.self_endpoint
                    && entry.record.service == service
                    && entry.state() == HealthState::Healthy
            })
            .map(|entry| entry.record.endpoint.clone())
            .collect()
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> SweepReport {
        let mut records = self.records.write();
        sweep_records(&mut records, &self.self_endpoint, self.thresholds, now)
    }

    pub fn merge(&self, incoming: Vec<Record>) -> MergeReport {
        self.merge_at(incoming, Instant::now())
    }

    pub fn merge_at(&self, incoming: Vec<Record>, now: Instant) -> MergeReport {
        let mut records = self.records.write();
        merge_records(&mut records, &self.self_endpoint, incoming, now)
    }

    /// Serves an inbound gossip: sweep, capture the response, then merge.
    ///
    /// The caller's records are not visible in its own response; the next
    /// caller sees them.
    pub fn exchange(&self, incoming: Vec<Record>) -> Exchange {
        self.exchange_at(incoming, Instant::now())
    }

    pub fn exchange_at(&self, incoming: Vec<Record>, now: Instant) -> Exchange {
        let mut records = self.records.write();
        let sweep = sweep_records(&mut records, &self.self_endpoint, self.thresholds, now);
        let response = records.values().map(|entry| entry.record.clone()).collect();
        let merge = merge_records(&mut records, &self.self_endpoint, incoming, now);

        Exchange {
            response,
            sweep,
            merge,
        }
    }

    /// Applies a heartbeat for exactly the named endpoint: an existing entry
    /// is promoted and refreshed, an unknown one is created HEALTHY.
    pub fn heartbeat(&self, record: Record) -> Result<()> {
        self.heartbeat_at(record, Instant::now())
    }

    pub fn heartbeat_at(&self, record: Record, now: Instant) -> Result<()> {
        if record.endpoint.trim().is_empty() {
            return Err(Error::InvalidRecord("heartbeat endpoint is empty".into()));
        }

        let mut records = self.records.write();
        match records.get_mut(&record.endpoint) {
            Some(existing) => {
                if existing.state() == HealthState::Unhealthy {
                    tracing::info!("Heartbeat revived {}", record.endpoint);
                }
                existing.promote(now);
            }
            None => {
                tracing::info!("Heartbeat from new endpoint {}", record.endpoint);
                let record = Record {
                    state: HealthState::Healthy,
                    ..record
                };
                records.insert(record.endpoint.clone(), HealthRecord::new(record, now));
            }
        }

        Ok(())
    }
}
