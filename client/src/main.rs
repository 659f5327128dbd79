use anyhow::Context;
use clap::{Parser, Subcommand};
use fdna::membership::client::PeerClient;
use fdna::membership::types::Record;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Issue Get/Gossip/Heartbeat calls against an fdna agent")]
struct Args {
    /// Agent to talk to
    #[arg(long, env = "FDNA_ADDR", default_value = "localhost:50051")]
    addr: String,
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gossip a canned record to the agent and print its table
    Init,
    /// Send a heartbeat for an endpoint
    Heartbeat { endpoint: String },
    /// Print the agent's table
    Get,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = PeerClient::new(Duration::from_millis(args.timeout_ms));

    match args.command {
        Command::Init => {
            let records = vec![Record::healthy("my-service", "127.0.0.1:8008", "us-west")];
            tracing::info!("Will send records: {:?}", records);

            let reply = client
                .gossip(&args.addr, records)
                .await
                .with_context(|| format!("could not gossip with {}", args.addr))?;
            for record in reply {
                tracing::info!("Record: {}", record);
            }
        }
        Command::Heartbeat { endpoint } => {
            let record = Record::healthy("fdna", &endpoint, "us-east");
            let result = client
                .heartbeat(&args.addr, record)
                .await
                .with_context(|| format!("could not heartbeat {} via {}", endpoint, args.addr))?;
            tracing::info!("Heartbeat result: {}", result);
        }
        Command::Get => {
            let records = client
                .get(&args.addr)
                .await
                .with_context(|| format!("could not get records from {}", args.addr))?;
            if records.is_empty() {
                tracing::info!("No records");
            }
            for record in records {
                tracing::info!("Record: {}", record);
            }
        }
    }

    Ok(())
}
