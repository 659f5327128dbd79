use axum::{
    Extension, Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use super::protocol::{
    ENDPOINT_GET, ENDPOINT_GOSSIP, ENDPOINT_HEARTBEAT, GetResponse, GossipRequest, GossipResponse,
    HEARTBEAT_OK, HeartbeatRequest, HeartbeatResponse,
};
use super::service::MembershipService;

pub fn router(service: Arc<MembershipService>) -> Router {
    Router::new()
        .route(ENDPOINT_GET, get(handle_get))
        .route(ENDPOINT_GOSSIP, post(handle_gossip))
        .route(ENDPOINT_HEARTBEAT, post(handle_heartbeat))
        .layer(Extension(service))
}

pub async fn handle_get(
    Extension(service): Extension<Arc<MembershipService>>,
) -> (StatusCode, Json<GetResponse>) {
    let records = service.table.get();
    (StatusCode::OK, Json(GetResponse { records }))
}

pub async fn handle_gossip(
    Extension(service): Extension<Arc<MembershipService>>,
    Json(req): Json<GossipRequest>,
) -> (StatusCode, Json<GossipResponse>) {
    tracing::debug!("Gossip() with {} record(s)", req.records.len());

    let exchange = service.table.exchange(req.records);
    if exchange.merge.rejected > 0 {
        tracing::warn!(
            "Gossip() rejected {} malformed record(s)",
            exchange.merge.rejected
        );
    }

    (
        StatusCode::OK,
        Json(GossipResponse {
            records: exchange.response,
        }),
    )
}

pub async fn handle_heartbeat(
    Extension(service): Extension<Arc<MembershipService>>,
    Json(req): Json<HeartbeatRequest>,
) -> (StatusCode, Json<HeartbeatResponse>) {
    tracing::debug!("Heartbeat() for {}", req.record.endpoint);

    match service.table.heartbeat(req.record) {
        Ok(()) => (
            StatusCode::OK,
            Json(HeartbeatResponse {
                result: HEARTBEAT_OK.to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!("Rejected heartbeat: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(HeartbeatResponse {
                    result: e.to_string(),
                }),
            )
        }
    }
}
