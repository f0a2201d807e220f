use crate::cluster::ClusterError;
use thiserror::Error;

/// Faults surfaced by a synchronization pass.
///
/// Token and partition-list failures abort the pass before any partition is
/// touched. Per-partition failures are recorded and logged while the pass
/// continues; they surface collectively as [`SyncError::Aggregate`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch access token: {source}")]
    TokenFetch { source: ClusterError },
    #[error("failed to list partitions: {source}")]
    PartitionList { source: ClusterError },
    #[error("failed to encode pull-secret document: {0}")]
    Encode(#[from] serde_json::Error),
    /// Recorded against one partition; the pass continues.
    #[error("failed to update pull secret in partition \"{partition}\": {source}")]
    SecretUpdate {
        partition: String,
        source: ClusterError,
    },
    /// Recorded against one partition; the pass continues.
    #[error("failed to patch service account in partition \"{partition}\": {source}")]
    ServiceAccountPatch {
        partition: String,
        source: ClusterError,
    },
    /// The externally supplied cancellation signal fired mid-pass.
    #[error("synchronization cancelled")]
    Cancelled,
    /// One or more partitions failed; successful updates are kept.
    /// The failing partitions are named in the logs, not here.
    #[error("failed to update {failed} of {total} partitions")]
    Aggregate { failed: usize, total: usize },
}
