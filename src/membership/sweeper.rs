//! Staleness Sweeper
//!
//! Ages every non-self record against the local clock. A HEALTHY record that
//! has been silent longer than the unhealthy threshold is demoted; an UNHEALTHY
//! record silent longer than the dead threshold is evicted. Demotion keeps
//! `last_updated` as is, so the dead check measures total silence.
//!
//! This is the only place a record is ever demoted or removed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::types::{HealthRecord, HealthState};

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub unhealthy: Duration,
    pub dead: Duration,
}

/// What a single sweep pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub demoted: Vec<String>,
    pub evicted: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.demoted.is_empty() && self.evicted.is_empty()
    }
}

pub(crate) fn sweep_records(
    records: &mut HashMap<String, HealthRecord>,
    self_endpoint: &str,
    thresholds: Thresholds,
    now: Instant,
) -> SweepReport {
    let mut report = SweepReport::default();

    for (endpoint, entry) in records.iter_mut() {
        if endpoint == self_endpoint {
            continue;
        }

        let elapsed = now.saturating_duration_since(entry.last_updated);

        if entry.state() == HealthState::Healthy && elapsed > thresholds.unhealthy {
            tracing::warn!(
                "Marking {} unhealthy (no confirmation for {:?})",
                endpoint,
                elapsed
            );
            entry.record.state = HealthState::Unhealthy;
            report.demoted.push(endpoint.clone());
        }

        if entry.state() == HealthState::Unhealthy && elapsed > thresholds.dead {
            report.evicted.push(endpoint.clone());
        }
    }

    for endpoint in &report.evicted {
        tracing::info!("Evicting dead endpoint {}", endpoint);
        records.remove(endpoint);
    }

    report
}
