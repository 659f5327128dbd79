//! Membership Network Protocol
//!
//! Endpoints and DTOs for the three calls a node answers: Get, Gossip and
//! Heartbeat. Bodies are JSON over HTTP.

use serde::{Deserialize, Serialize};

use super::types::{Record, lenient_records};

// --- API Endpoints ---

/// Read-only snapshot of the table.
pub const ENDPOINT_GET: &str = "/get";
/// Anti-entropy exchange: the caller sends its table and gets ours back.
pub const ENDPOINT_GOSSIP: &str = "/gossip";
/// Liveness signal for a single endpoint.
pub const ENDPOINT_HEARTBEAT: &str = "/heartbeat";

/// Acknowledgment text of an applied heartbeat.
pub const HEARTBEAT_OK: &str = "Success";

// --- Data Transfer Objects ---

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetResponse {
    pub records: Vec<Record>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GossipRequest {
    #[serde(default, deserialize_with = "lenient_records")]
    pub records: Vec<Record>,
}

/// The responder's table as it stood before merging the request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GossipResponse {
    #[serde(default, deserialize_with = "lenient_records")]
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub record: Record,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub result: String,
}
