use clap::Parser;
use fdna::address::discover_self_endpoint;
use fdna::config::{DEFAULT_PORT, DEFAULT_SERVICE, DEFAULT_ZONE, NodeConfig};
use fdna::membership::handlers::router;
use fdna::membership::service::MembershipService;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Gossip-based service membership agent")]
struct Args {
    #[arg(long, env = "FDNA_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "FDNA_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Endpoint advertised to peers. Defaults to the first non-loopback
    /// interface address and the listening port.
    #[arg(long, env = "FDNA_ADVERTISE")]
    advertise: Option<String>,
    #[arg(long, env = "FDNA_SERVICE", default_value = DEFAULT_SERVICE)]
    service: String,
    #[arg(long, env = "FDNA_ZONE", default_value = DEFAULT_ZONE)]
    zone: String,
    /// Peer to exchange tables with at startup (repeatable)
    #[arg(long = "seed", env = "FDNA_SEEDS", value_delimiter = ',')]
    seeds: Vec<String>,
    #[arg(long, default_value_t = 30)]
    unhealthy_threshold_secs: u64,
    #[arg(long, default_value_t = 60)]
    dead_threshold_secs: u64,
    #[arg(long, default_value_t = 5)]
    gossip_interval_secs: u64,
    #[arg(long, default_value_t = 5)]
    heartbeat_interval_secs: u64,
    #[arg(long, default_value_t = 1000)]
    gossip_timeout_ms: u64,
}

impl Args {
    fn node_config(&self) -> NodeConfig {
        NodeConfig {
            service: self.service.clone(),
            zone: self.zone.clone(),
            unhealthy_threshold: Duration::from_secs(self.unhealthy_threshold_secs),
            dead_threshold: Duration::from_secs(self.dead_threshold_secs),
            gossip_interval: Duration::from_secs(self.gossip_interval_secs),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            gossip_timeout: Duration::from_millis(self.gossip_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let self_endpoint = match &args.advertise {
        Some(endpoint) => endpoint.clone(),
        None => discover_self_endpoint(args.port)?,
    };

    let service = MembershipService::new(self_endpoint, args.node_config())?;
    tracing::info!(
        "Node {} (service={}, zone={})",
        service.self_endpoint(),
        service.config.service,
        service.config.zone
    );

    let bind_addr = SocketAddr::new(args.host.parse::<IpAddr>()?, args.port);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening at {}", listener.local_addr()?);

    let background = service.clone().start(args.seeds.clone());

    let app = router(service);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in background {
        handle.abort();
    }
    tracing::info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
