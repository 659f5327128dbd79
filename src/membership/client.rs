use std::time::Duration;

use super::protocol::{
    ENDPOINT_GET, ENDPOINT_GOSSIP, ENDPOINT_HEARTBEAT, GetResponse, GossipRequest, GossipResponse,
    HeartbeatRequest, HeartbeatResponse,
};
use super::types::Record;
use crate::error::{Error, Result};

/// Outbound side of the membership protocol, shared by the agent's gossip
/// driver and the command-line client.
#[derive(Clone)]
pub struct PeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl PeerClient {
    /// `timeout` bounds every call made through this client.
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn get(&self, peer: &str) -> Result<Vec<Record>> {
        let resp = self
            .http_client
            .get(url(peer, ENDPOINT_GET))
            .timeout(self.timeout)
            .send()
            .await?;
        let body: GetResponse = check_status(peer, resp)?.json().await?;
        Ok(body.records)
    }

    /// Sends our records and returns the peer's pre-merge table.
    pub async fn gossip(&self, peer: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        let resp = self
            .http_client
            .post(url(peer, ENDPOINT_GOSSIP))
            .timeout(self.timeout)
            .json(&GossipRequest { records })
            .send()
            .await?;
        let body: GossipResponse = check_status(peer, resp)?.json().await?;
        Ok(body.records)
    }

    pub async fn heartbeat(&self, peer: &str, record: Record) -> Result<String> {
        let resp = self
            .http_client
            .post(url(peer, ENDPOINT_HEARTBEAT))
            .timeout(self.timeout)
            .json(&HeartbeatRequest { record })
            .send()
            .await?;
        let body: HeartbeatResponse = check_status(peer, resp)?.json().await?;
        Ok(body.result)
    }
}

fn url(peer: &str, path: &str) -> String {
    if peer.starts_with("http://") || peer.starts_with("https://") {
        format!("{}{}", peer.trim_end_matches('/'), path)
    } else {
        format!("http://{}{}", peer, path)
    }
}

fn check_status(peer: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(Error::PeerStatus {
            peer: peer.to_string(),
            status: resp.status(),
        })
    }
}
