use credsync_agent::memory::MemoryCluster;
use credsync_agent::{CredentialSynchronizer, SyncConfig};
use std::sync::Arc;

pub fn synchronizer(cluster: &Arc<MemoryCluster>, config: SyncConfig) -> CredentialSynchronizer {
    CredentialSynchronizer::new(
        config,
        cluster.clone(),
        cluster.clone(),
        cluster.clone(),
        cluster.clone(),
    )
}

/// Config with fan-out of one so partitions are processed in listing order.
pub fn sequential_config() -> SyncConfig {
    SyncConfig {
        fan_out: 1,
        ..SyncConfig::default()
    }
}
