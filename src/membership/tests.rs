//! Membership Module Tests
//!
//! Exercises the protocol end to end on top of the unit tests that live next
//! to the sweeper, merge and table code.
//!
//! ## Test Scopes
//! - **Wire Format**: JSON shape of records and per-record decoding of malformed fields.
//! - **Exchange Semantics**: Exchange-then-merge ordering of an inbound Gossip.
//! - **Transport**: Real HTTP servers on ephemeral ports for Get/Gossip/Heartbeat,
//!   seed bootstrap and the gossip driver.
//! - **Concurrency**: Parallel exchanges, heartbeats and sweeps leave a valid table.

#[cfg(test)]
mod tests {
    use crate::config::NodeConfig;
    use crate::error::Error;
    use crate::membership::client::PeerClient;
    use crate::membership::handlers::router;
    use crate::membership::protocol::{GossipRequest, HEARTBEAT_OK};
    use crate::membership::service::MembershipService;
    use crate::membership::sweeper::Thresholds;
    use crate::membership::table::MembershipTable;
    use crate::membership::types::{HealthRecord, HealthState, Record};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn thresholds() -> Thresholds {
        Thresholds {
            unhealthy: Duration::from_secs(30),
            dead: Duration::from_secs(60),
        }
    }

    fn fast_config() -> NodeConfig {
        NodeConfig {
            gossip_timeout: Duration::from_millis(300),
            ..NodeConfig::default()
        }
    }

    /// Binds an ephemeral port, builds a node advertising it and serves it.
    async fn spawn_node() -> Arc<MembershipService> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let service = MembershipService::new(endpoint, fast_config()).unwrap();

        let app = router(service.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        service
    }

    // ============================================================
    // WIRE FORMAT TESTS
    // ============================================================

    #[test]
    fn test_record_json_shape() {
        let record = Record::healthy("fdna", "B:1", "us-west");

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "service": "fdna",
                "endpoint": "B:1",
                "zone": "us-west",
                "state": "HEALTHY"
            })
        );
    }

    #[test]
    fn test_unknown_state_decodes_as_unspecified() {
        let json = r#"{"records": [
            {"service": "fdna", "endpoint": "B:1", "zone": "z", "state": "ZOMBIE"},
            {"service": "fdna", "endpoint": "C:1", "zone": "z", "state": "STATE_UNHEALTHY"},
            {"endpoint": "D:1"}
        ]}"#;

        let req: GossipRequest = serde_json::from_str(json).expect("batch should decode");

        assert_eq!(req.records[0].state, HealthState::Unspecified);
        assert_eq!(req.records[1].state, HealthState::Unhealthy);
        assert_eq!(req.records[2].state, HealthState::Unspecified);
        assert_eq!(req.records[2].service, "");
    }

    const MIXED_BATCH: &str = r#"{"records": [
        {"service": "fdna", "endpoint": "B:1", "zone": "z", "state": null},
        {"service": "fdna", "endpoint": "C:1", "zone": "z", "state": "HEALTHY"},
        {"service": "fdna", "endpoint": "E:1", "zone": "z", "state": 1},
        {"service": "fdna", "endpoint": null, "zone": "z", "state": "HEALTHY"},
        {"service": "fdna", "endpoint": "F:1", "zone": "z", "state": 7},
        42
    ]}"#;

    #[test]
    fn test_malformed_fields_reject_only_their_record() {
        let req: GossipRequest = serde_json::from_str(MIXED_BATCH).expect("batch should decode");
        assert_eq!(req.records.len(), 6);
        assert_eq!(req.records[2].state, HealthState::Healthy);
        assert_eq!(req.records[3].endpoint, "");

        let table = MembershipTable::new(Record::healthy("fdna", "A:1", "us-west"), thresholds());
        let exchange = table.exchange(req.records);

        assert_eq!(exchange.merge.rejected, 4);
        assert_eq!(
            exchange.merge.learned,
            vec!["C:1".to_string(), "E:1".to_string()]
        );
        assert!(table.get_entry("B:1").is_none());
        assert!(table.get_entry("F:1").is_none());
    }

    // ============================================================
    // EXCHANGE SEMANTICS
    // ============================================================

    #[test]
    fn test_exchange_responds_with_pre_merge_table() {
        let table = MembershipTable::new(Record::healthy("fdna", "A:1", "us-west"), thresholds());
        let before = Instant::now();

        let exchange = table.exchange(vec![Record::healthy("fdna", "B:1", "us-west")]);

        assert_eq!(exchange.response, vec![Record::healthy("fdna", "A:1", "us-west")]);
        assert_eq!(exchange.merge.learned, vec!["B:1".to_string()]);

        let learned = table.get_entry("B:1").expect("B:1 should be learned");
        assert_eq!(learned.state(), HealthState::Healthy);
        assert!(learned.last_updated >= before);
    }

    #[test]
    fn test_exchange_sweeps_before_responding() {
        let table = MembershipTable::new(Record::healthy("fdna", "A:1", "us-west"), thresholds());
        let t0 = Instant::now();
        table.upsert(HealthRecord::new(Record::healthy("fdna", "Y:1", "z"), t0));
        table.upsert(HealthRecord::new(Record::healthy("fdna", "W:1", "z"), t0));

        let exchange = table.exchange_at(
            vec![Record::healthy("fdna", "W:1", "z")],
            t0 + Duration::from_secs(31),
        );

        let y = exchange.response.iter().find(|r| r.endpoint == "Y:1").unwrap();
        assert_eq!(y.state, HealthState::Unhealthy);
        let w = exchange.response.iter().find(|r| r.endpoint == "W:1").unwrap();
        assert_eq!(w.state, HealthState::Unhealthy, "merge happens after the response");

        assert_eq!(table.get_entry("W:1").unwrap().state(), HealthState::Healthy);
        assert_eq!(table.get_entry("Y:1").unwrap().state(), HealthState::Unhealthy);
    }

    #[test]
    fn test_evicted_endpoint_is_relearned_fresh() {
        let table = MembershipTable::new(Record::healthy("fdna", "A:1", "us-west"), thresholds());
        let t0 = Instant::now();
        table.upsert(HealthRecord::new(Record::healthy("fdna", "Y:1", "old"), t0));

        table.sweep_at(t0 + Duration::from_secs(91));
        assert!(table.get_entry("Y:1").is_none());

        let t1 = t0 + Duration::from_secs(95);
        table.merge_at(vec![Record::healthy("fdna", "Y:1", "new")], t1);

        let entry = table.get_entry("Y:1").unwrap();
        assert_eq!(entry.record.zone, "new");
        assert_eq!(entry.last_updated, t1);
    }

    // ============================================================
    // TRANSPORT TESTS
    // ============================================================

    #[tokio::test]
    async fn test_get_over_http() {
        let node = spawn_node().await;
        let client = PeerClient::new(Duration::from_secs(1));

        let records = client.get(node.self_endpoint()).await.unwrap();

        assert_eq!(records, vec![node.local.clone()]);
    }

    #[tokio::test]
    async fn test_gossip_over_http() {
        let node = spawn_node().await;
        let client = PeerClient::new(Duration::from_secs(1));

        let reply = client
            .gossip(
                node.self_endpoint(),
                vec![Record::healthy("fdna", "B:1", "us-west")],
            )
            .await
            .unwrap();

        assert_eq!(reply, vec![node.local.clone()]);
        assert_eq!(
            node.table.get_entry("B:1").map(|e| e.state()),
            Some(HealthState::Healthy)
        );
    }

    #[tokio::test]
    async fn test_heartbeat_over_http() {
        let node = spawn_node().await;
        let client = PeerClient::new(Duration::from_secs(1));

        let result = client
            .heartbeat(node.self_endpoint(), Record::healthy("fdna", "X:1", "us-east"))
            .await
            .unwrap();
        assert_eq!(result, HEARTBEAT_OK);
        assert!(node.table.get_entry("X:1").is_some());

        let rejected = client
            .heartbeat(node.self_endpoint(), Record::healthy("fdna", "", "us-east"))
            .await;
        assert!(matches!(rejected, Err(Error::PeerStatus { .. })));
    }

    #[tokio::test]
    async fn test_mixed_batch_over_http_keeps_valid_records() {
        let node = spawn_node().await;

        let resp = reqwest::Client::new()
            .post(format!("http://{}/gossip", node.self_endpoint()))
            .header("content-type", "application/json")
            .body(MIXED_BATCH)
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert!(node.table.get_entry("C:1").is_some());
        assert!(node.table.get_entry("E:1").is_some());
        assert!(node.table.get_entry("B:1").is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_joins_through_seeds() {
        let a = spawn_node().await;
        let b = spawn_node().await;
        let seeds = vec![
            "127.0.0.1:1".to_string(),
            a.self_endpoint().to_string(),
            b.self_endpoint().to_string(),
        ];

        let reached = a.bootstrap(&seeds).await;

        assert_eq!(reached, 1, "only B answers; self is skipped");
        assert!(a.table.get_entry(b.self_endpoint()).is_some());
        assert!(b.table.get_entry(a.self_endpoint()).is_some());
        assert!(a.table.get_entry("127.0.0.1:1").is_none());
    }

    #[tokio::test]
    async fn test_start_joins_seed_in_background() {
        let a = spawn_node().await;
        let b = spawn_node().await;

        let handles = a.clone().start(vec![b.self_endpoint().to_string()]);

        let joined = tokio::time::timeout(Duration::from_secs(3), async {
            while b.table.get_entry(a.self_endpoint()).is_none() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;

        for handle in handles {
            handle.abort();
        }
        assert!(joined.is_ok(), "B should learn A from the seed exchange");
        assert!(a.table.get_entry(b.self_endpoint()).is_some());
    }

    #[tokio::test]
    async fn test_gossip_round_converges_two_nodes() {
        let a = spawn_node().await;
        let b = spawn_node().await;
        b.table
            .heartbeat(Record::healthy("other-service", "S:1", "us-east"))
            .unwrap();

        // A only knows B after an external heartbeat.
        a.table.heartbeat(b.local.clone()).unwrap();

        let report = a.gossip_round().await.expect("A should reach B");

        assert!(report.learned.contains(&"S:1".to_string()));
        assert_eq!(
            b.table.get_entry(a.self_endpoint()).map(|e| e.state()),
            Some(HealthState::Healthy),
            "B learns A from the request"
        );
        assert_eq!(a.table.get().len(), 3);
        assert_eq!(b.table.get().len(), 3);
    }

    #[tokio::test]
    async fn test_gossip_round_without_peers_is_skipped() {
        let node = MembershipService::new("127.0.0.1:7".to_string(), fast_config()).unwrap();
        node.table
            .heartbeat(Record::healthy("not-fdna", "S:1", "z"))
            .unwrap();

        assert!(node.gossip_round().await.is_none());
        assert_eq!(node.table.get().len(), 2);
    }

    #[tokio::test]
    async fn test_gossip_round_survives_unreachable_peer() {
        let node = MembershipService::new("127.0.0.1:7".to_string(), fast_config()).unwrap();
        // Bound but never accepted: the request hangs until the deadline.
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent_endpoint = silent.local_addr().unwrap().to_string();
        node.table
            .heartbeat(Record::healthy("fdna", &silent_endpoint, "z"))
            .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(3), node.gossip_round())
            .await
            .expect("gossip deadline should cut the call short");

        assert!(outcome.is_none());
        assert_eq!(
            node.table.get_entry(&silent_endpoint).map(|e| e.state()),
            Some(HealthState::Healthy),
            "a failed round changes nothing"
        );
        drop(silent);
    }

    #[tokio::test]
    async fn test_self_heartbeat_refreshes_self() {
        let node = MembershipService::new("127.0.0.1:7".to_string(), fast_config()).unwrap();
        let before = node.table.get_entry("127.0.0.1:7").unwrap().last_updated;

        tokio::time::sleep(Duration::from_millis(5)).await;
        node.heartbeat_once();

        let after = node.table.get_entry("127.0.0.1:7").unwrap();
        assert_eq!(after.state(), HealthState::Healthy);
        assert!(after.last_updated > before);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NodeConfig {
            dead_threshold: Duration::from_secs(1),
            ..NodeConfig::default()
        };

        assert!(MembershipService::new("A:1".to_string(), config).is_err());
    }

    // ============================================================
    // CONCURRENCY TESTS
    // ============================================================

    #[test]
    fn test_concurrent_operations_keep_table_valid() {
        let table = Arc::new(MembershipTable::new(
            Record::healthy("fdna", "A:1", "us-west"),
            thresholds(),
        ));
        let t0 = Instant::now();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let table = table.clone();
                scope.spawn(move || {
                    for i in 0..200 {
                        let endpoint = format!("N{}:{}", worker % 4, i % 20);
                        let mut claim = Record::healthy("fdna", &endpoint, "z");
                        if i % 3 == 0 {
                            claim.state = HealthState::Unhealthy;
                        }
                        let own = Record {
                            state: HealthState::Unhealthy,
                            ..Record::healthy("fdna", "A:1", "us-west")
                        };
                        table.exchange(vec![claim.clone(), own]);
                        if i % 5 == 0 {
                            table.heartbeat(claim).unwrap();
                        }
                    }
                });
            }
            for round in 0..4u64 {
                let table = table.clone();
                scope.spawn(move || {
                    for step in 0..100u64 {
                        table.sweep_at(t0 + Duration::from_secs(round * 20 + step));
                    }
                });
            }
        });

        let records = table.get();
        let mut endpoints: Vec<&str> = records.iter().map(|r| r.endpoint.as_str()).collect();
        endpoints.sort();
        endpoints.dedup();
        assert_eq!(endpoints.len(), records.len(), "no duplicate endpoints");

        assert!(records.iter().all(|r| r.state.is_known()));
        let own = table.get_entry("A:1").expect("self is never evicted");
        assert_eq!(own.state(), HealthState::Healthy);
    }
}
