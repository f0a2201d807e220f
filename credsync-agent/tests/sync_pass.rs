#[path = "support/mod.rs"]
mod support;

use credsync_agent::cluster::{AccessToken, ClusterError, SecretClass, SecretData};
use credsync_agent::dockercfg;
use credsync_agent::memory::MemoryCluster;
use credsync_agent::{SyncConfig, SyncError};
use credsync_core::Partition;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SECRET_NAME: &str = "gcr-json-key";

fn expected_data(token: &str) -> SecretData {
    dockercfg::pull_secret_data(
        &AccessToken::new(token),
        &SyncConfig::default().registry_hosts,
    )
    .expect("document encodes")
}

#[tokio::test]
async fn default_partition_is_provisioned_from_scratch() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");

    let report = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await?;

    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 0);

    let secret = cluster.secret("default", SECRET_NAME).expect("secret created");
    assert_eq!(secret.class, SecretClass::Dockercfg);
    assert_eq!(secret.data, expected_data("tok-1"));
    assert_eq!(
        cluster.image_pull_secrets("default", "default").unwrap(),
        vec![SECRET_NAME]
    );
    Ok(())
}

#[tokio::test]
async fn terminating_partition_is_never_touched() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");
    cluster.add_partition(Partition::terminating("drained")?);
    cluster.seed_service_account("drained", "default");

    let report = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await?;

    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 1);
    assert!(cluster.secret("drained", SECRET_NAME).is_none());
    assert_eq!(
        cluster.image_pull_secrets("drained", "default").unwrap(),
        Vec::<String>::new()
    );
    Ok(())
}

#[tokio::test]
async fn unprovisioned_non_default_partition_is_skipped() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("team-a")?);
    cluster.seed_service_account("team-a", "default");

    let report = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await?;

    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 1);
    assert!(cluster.secret("team-a", SECRET_NAME).is_none());
    assert_eq!(
        cluster.image_pull_secrets("team-a", "default").unwrap(),
        Vec::<String>::new()
    );
    Ok(())
}

#[tokio::test]
async fn provisioned_non_default_partition_is_refreshed() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-2"));
    cluster.add_partition(Partition::active("team-a")?);
    cluster.seed_service_account("team-a", "default");
    cluster.seed_secret(
        "team-a",
        SECRET_NAME,
        SecretClass::Dockercfg,
        expected_data("stale-token"),
    );

    let report = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await?;

    assert_eq!(report.updated, 1);
    let secret = cluster.secret("team-a", SECRET_NAME).unwrap();
    assert_eq!(secret.data, expected_data("tok-2"));
    assert_eq!(
        cluster.image_pull_secrets("team-a", "default").unwrap(),
        vec![SECRET_NAME]
    );
    Ok(())
}

#[tokio::test]
async fn missing_service_account_is_benign() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    // No service account seeded: the patch target does not exist yet.

    let report = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await?;

    assert_eq!(report.updated, 1);
    assert!(cluster.secret("default", SECRET_NAME).is_some());
    assert!(cluster.image_pull_secrets("default", "default").is_none());
    Ok(())
}

#[tokio::test]
async fn partition_failure_is_isolated_and_aggregated() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-3"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");
    cluster.add_partition(Partition::active("team-a")?);
    cluster.seed_service_account("team-a", "default");
    cluster.seed_secret(
        "team-a",
        SECRET_NAME,
        SecretClass::Dockercfg,
        expected_data("stale-token"),
    );

    // First create-or-update call (partition "default" in listing order)
    // fails permanently.
    cluster.inject_secret_fault(ClusterError::Rejected("quota exceeded".into()));

    let result = support::synchronizer(&cluster, support::sequential_config())
        .synchronize(&CancellationToken::new())
        .await;

    match result {
        Err(SyncError::Aggregate { failed, total }) => {
            assert_eq!(failed, 1);
            assert_eq!(total, 2);
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }

    // The failing partition saw no update, the healthy one did.
    assert!(cluster.secret("default", SECRET_NAME).is_none());
    let secret = cluster.secret("team-a", SECRET_NAME).unwrap();
    assert_eq!(secret.data, expected_data("tok-3"));
    assert_eq!(
        cluster.image_pull_secrets("team-a", "default").unwrap(),
        vec![SECRET_NAME]
    );
    Ok(())
}

#[tokio::test]
async fn token_fetch_failure_short_circuits_the_pass() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");
    cluster.inject_token_fault(ClusterError::Rejected("invalid grant".into()));

    let result = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::TokenFetch { .. })));
    assert!(cluster.secret("default", SECRET_NAME).is_none());
    Ok(())
}

#[tokio::test]
async fn partition_list_failure_short_circuits_the_pass() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");
    cluster.inject_partition_fault(ClusterError::Unavailable("apiserver down".into()));

    let result = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::PartitionList { .. })));
    assert!(cluster.secret("default", SECRET_NAME).is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn transient_secret_fault_is_retried() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");
    cluster.inject_secret_fault(ClusterError::Unavailable("etcd leader change".into()));

    let report = support::synchronizer(&cluster, SyncConfig::default())
        .synchronize(&CancellationToken::new())
        .await?;

    assert_eq!(report.updated, 1);
    assert!(cluster.secret("default", SECRET_NAME).is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_reported_instead_of_aggregate() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");
    for _ in 0..100 {
        cluster.inject_secret_fault(ClusterError::Unavailable("still down".into()));
    }

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            cancel.cancel();
        })
    };

    let result = support::synchronizer(&cluster, support::sequential_config())
        .synchronize(&cancel)
        .await;
    canceller.await?;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(cluster.secret("default", SECRET_NAME).is_none());
    Ok(())
}

#[tokio::test]
async fn repeated_passes_are_idempotent() -> anyhow::Result<()> {
    let cluster = Arc::new(MemoryCluster::new("tok-1"));
    cluster.add_partition(Partition::active("default")?);
    cluster.seed_service_account("default", "default");

    let synchronizer = support::synchronizer(&cluster, SyncConfig::default());
    synchronizer.synchronize(&CancellationToken::new()).await?;

    // A rotated token replaces the secret wholesale on the next pass.
    cluster.set_token("tok-2");
    let report = synchronizer.synchronize(&CancellationToken::new()).await?;

    assert_eq!(report.updated, 1);
    let secret = cluster.secret("default", SECRET_NAME).unwrap();
    assert_eq!(secret.data, expected_data("tok-2"));
    assert_eq!(
        cluster.image_pull_secrets("default", "default").unwrap(),
        vec![SECRET_NAME]
    );
    Ok(())
}
