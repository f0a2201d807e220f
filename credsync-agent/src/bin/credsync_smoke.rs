use anyhow::Result;
use clap::Parser;
use credsync_agent::memory::MemoryCluster;
use credsync_agent::{telemetry, CredentialSynchronizer, SyncConfig};
use credsync_core::Partition;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run one credential synchronization pass against an in-memory cluster.
#[derive(Parser, Debug)]
#[command(name = "credsync-smoke", about = "credsync end-to-end smoke harness")]
struct Cli {
    /// Active partitions present in the simulated cluster.
    #[arg(long = "partition", value_name = "NAME", default_values_t = [String::from("default")])]
    partitions: Vec<String>,
    /// Partitions marked as terminating.
    #[arg(long = "terminating", value_name = "NAME")]
    terminating: Vec<String>,
    /// Access token the simulated token source mints.
    #[arg(long, default_value = "smoke-token")]
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;
    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    let cluster = Arc::new(MemoryCluster::new(&cli.token));
    for name in &cli.partitions {
        cluster.add_partition(Partition::active(name)?);
        cluster.seed_service_account(name, &config.service_account);
    }
    for name in &cli.terminating {
        cluster.add_partition(Partition::terminating(name)?);
    }

    let synchronizer = CredentialSynchronizer::new(
        config,
        cluster.clone(),
        cluster.clone(),
        cluster.clone(),
        cluster.clone(),
    );
    let report = synchronizer.synchronize(&CancellationToken::new()).await?;

    info!(
        updated = report.updated,
        skipped = report.skipped,
        "smoke pass completed"
    );
    Ok(())
}
