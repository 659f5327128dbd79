//! Gossip-based Service Membership Library
//!
//! This library crate holds the membership protocol used by the `fdna-agent`
//! binary (`main.rs`) and the `fdna-client` command-line tool.
//!
//! ## Modules
//! - **`membership`**: The membership table, staleness sweeper, anti-entropy merge,
//!   gossip driver and the Get/Gossip/Heartbeat surface.
//! - **`config`**: Timing thresholds and node identity labels.
//! - **`address`**: Discovery of the address this node advertises to peers.
//! - **`error`**: The crate-wide error type.

pub mod address;
pub mod config;
pub mod error;
pub mod membership;

pub use error::{Error, Result};
