//! Membership & Failure Detection Module
//!
//! Keeps the node-local view of which service endpoints exist and whether
//! they are healthy, and spreads that view by periodic pairwise gossip.
//!
//! ## Core Mechanisms
//! - **Membership Table**: One guarded `endpoint -> HealthRecord` map. Every
//!   logical operation is a single critical section.
//! - **Sweeper**: HEALTHY -> UNHEALTHY after 30s of silence, eviction after 60s. Self is exempt.
//! - **Anti-Entropy Merge**: Peer claims can promote and refresh, never demote.
//!   Claims about self are dropped.
//! - **Gossip Driver**: Every round, one uniformly random healthy peer of the
//!   same service receives the full table and its reply is merged.
//! - **Heartbeats**: Explicit liveness signals, emitted locally for self and
//!   accepted from clients for any endpoint.

pub mod client;
pub mod handlers;
pub mod merge;
pub mod protocol;
pub mod service;
pub mod sweeper;
pub mod table;
pub mod types;

#[cfg(test)]
mod tests;
