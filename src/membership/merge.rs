//! Anti-Entropy Merge
//!
//! Reconciles a batch of peer-supplied records with the local table. Trust is
//! asymmetric: a HEALTHY claim promotes and refreshes a known record, while an
//! UNHEALTHY claim about a known record is ignored. Demotion only ever comes
//! from this node's own sweep, so a lying or stale peer can extend an
//! endpoint's apparent liveness but never shorten it. The cost is slower
//! network-wide convergence on real failures.
//!
//! Claims about `self` are always skipped.

use std::collections::HashMap;
use std::time::Instant;

use super::types::{HealthRecord, HealthState, Record};
use crate::error::{Error, Result};

/// What a merge changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub learned: Vec<String>,
    pub refreshed: Vec<String>,
    pub ignored: usize,
    pub rejected: usize,
}

/// Minimal acceptance rules for a record arriving from the network.
pub fn validate_record(record: &Record) -> Result<()> {
    if record.endpoint.trim().is_empty() {
        return Err(Error::InvalidRecord("endpoint is empty".into()));
    }
    if !record.state.is_known() {
        return Err(Error::InvalidRecord(format!(
            "{} has no recognized state",
            record.endpoint
        )));
    }
    Ok(())
}

pub(crate) fn merge_records(
    records: &mut HashMap<String, HealthRecord>,
    self_endpoint: &str,
    incoming: Vec<Record>,
    now: Instant,
) -> MergeReport {
    let mut report = MergeReport::default();

    for record in incoming {
        if let Err(e) = validate_record(&record) {
            tracing::warn!("Rejecting gossiped record: {}", e);
            report.rejected += 1;
            continue;
        }

        if record.endpoint == self_endpoint {
            report.ignored += 1;
            continue;
        }

        match records.get_mut(&record.endpoint) {
            Some(existing) => {
                if record.state == HealthState::Healthy {
                    if existing.state() == HealthState::Unhealthy {
                        tracing::info!("Heard {} is healthy again", record.endpoint);
                    } else {
                        tracing::debug!("Heard {} is healthy", record.endpoint);
                    }
                    existing.promote(now);
                    report.refreshed.push(record.endpoint);
                } else {
                    report.ignored += 1;
                }
            }
            None => {
                tracing::info!("Learned {} ({})", record.endpoint, record.state);
                report.learned.push(record.endpoint.clone());
                records.insert(record.endpoint.clone(), HealthRecord::new(record, now));
            }
        }
    }

    report
}
