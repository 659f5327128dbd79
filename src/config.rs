//! Node Configuration
//!
//! Timing constants and identity labels shared by every membership component.
//! The defaults match the protocol's reference cadence: unhealthy after 30s of
//! silence, evictable after 60s, sweep+gossip and heartbeat every 5s, and a 1s
//! deadline on outbound gossip.

use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_SERVICE: &str = "fdna";
pub const DEFAULT_ZONE: &str = "us-west";
pub const DEFAULT_PORT: u16 = 50051;

const UNHEALTHY_THRESHOLD: Duration = Duration::from_secs(30);
const DEAD_THRESHOLD: Duration = Duration::from_secs(60);
const GOSSIP_INTERVAL: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const GOSSIP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Service name this node announces itself under. Only peers of the same
    /// service are gossip candidates.
    pub service: String,
    pub zone: String,
    /// Silence after which a HEALTHY record is demoted.
    pub unhealthy_threshold: Duration,
    /// Silence, measured from the same `last_updated`, after which an
    /// UNHEALTHY record is evicted.
    pub dead_threshold: Duration,
    /// Cadence of the sweep+gossip loop.
    pub gossip_interval: Duration,
    pub heartbeat_interval: Duration,
    /// Deadline of a single outbound gossip call.
    pub gossip_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            zone: DEFAULT_ZONE.to_string(),
            unhealthy_threshold: UNHEALTHY_THRESHOLD,
            dead_threshold: DEAD_THRESHOLD,
            gossip_interval: GOSSIP_INTERVAL,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            gossip_timeout: GOSSIP_TIMEOUT,
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(Error::Config("service name must not be empty".into()));
        }

        let periods = [
            ("gossip interval", self.gossip_interval),
            ("heartbeat interval", self.heartbeat_interval),
            ("gossip timeout", self.gossip_timeout),
        ];
        for (name, value) in periods {
            if value.is_zero() {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.dead_threshold < self.unhealthy_threshold {
            return Err(Error::Config(format!(
                "dead threshold ({:?}) must not be shorter than unhealthy threshold ({:?})",
                self.dead_threshold, self.unhealthy_threshold
            )));
        }

        Ok(())
    }
}
