//! The credential synchronization pass.

use crate::cluster::{
    PartitionDirectory, SecretClass, SecretData, SecretStore, ServiceAccountPatch,
    ServiceAccountPatcher, TokenSource,
};
use crate::config::SyncConfig;
use crate::dockercfg;
use crate::errors::SyncError;
use crate::retry::{self, RetryError};
use credsync_core::Partition;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counters of a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Partitions whose pull secret and service account were refreshed.
    pub updated: usize,
    /// Partitions left untouched (terminating or not provisioned).
    pub skipped: usize,
}

enum PartitionOutcome {
    Updated,
    Skipped,
}

enum PatchOutcome {
    Applied,
    TargetMissing,
}

/// Pushes a freshly minted pull secret to every eligible partition and wires
/// the partition's default identity to it.
///
/// The synchronizer owns no state between passes; each pass derives the
/// secret content from a fresh token and replaces stored secrets wholesale.
pub struct CredentialSynchronizer {
    config: SyncConfig,
    tokens: Arc<dyn TokenSource>,
    partitions: Arc<dyn PartitionDirectory>,
    secrets: Arc<dyn SecretStore>,
    accounts: Arc<dyn ServiceAccountPatcher>,
}

impl CredentialSynchronizer {
    pub fn new(
        config: SyncConfig,
        tokens: Arc<dyn TokenSource>,
        partitions: Arc<dyn PartitionDirectory>,
        secrets: Arc<dyn SecretStore>,
        accounts: Arc<dyn ServiceAccountPatcher>,
    ) -> Self {
        Self {
            config,
            tokens,
            partitions,
            secrets,
            accounts,
        }
    }

    /// Run one synchronization pass.
    ///
    /// Partition failures are isolated: every eligible partition is attempted
    /// and independently-successful updates are kept even when the pass
    /// returns [`SyncError::Aggregate`]. Cancellation is honored at every
    /// retry boundary and reported as [`SyncError::Cancelled`].
    pub async fn synchronize(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let token = self
            .tokens
            .fetch_token()
            .await
            .map_err(|source| SyncError::TokenFetch { source })?;
        let partitions = self
            .partitions
            .list_partitions()
            .await
            .map_err(|source| SyncError::PartitionList { source })?;

        // Fixed for the whole pass: one document, one patch, every partition.
        let data = dockercfg::pull_secret_data(&token, &self.config.registry_hosts)?;
        let patch = ServiceAccountPatch::image_pull_secret(&self.config.secret_name);

        let total = partitions.len();
        info!(
            target = "audit",
            action = "credsync.start",
            total,
            secret = %self.config.secret_name,
            "credential sync starting"
        );

        let data = &data;
        let patch = &patch;
        let results: Vec<_> = stream::iter(partitions)
            .map(|partition| async move {
                self.process_partition(cancel, &partition, data, patch).await
            })
            .buffer_unordered(self.config.fan_out.max(1))
            .collect()
            .await;

        let mut updated = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;
        let mut cancelled = false;
        for result in results {
            match result {
                Ok(PartitionOutcome::Updated) => updated += 1,
                Ok(PartitionOutcome::Skipped) => skipped += 1,
                Err(SyncError::Cancelled) => cancelled = true,
                Err(err) => {
                    failed += 1;
                    error!(error = %err, "recording partition failure");
                }
            }
        }

        info!(
            target = "audit",
            action = "credsync.finish",
            updated,
            skipped,
            failed,
            cancelled,
            "credential sync completed"
        );

        if cancelled {
            return Err(SyncError::Cancelled);
        }
        if failed > 0 {
            return Err(SyncError::Aggregate { failed, total });
        }
        Ok(SyncReport { updated, skipped })
    }

    async fn process_partition(
        &self,
        cancel: &CancellationToken,
        partition: &Partition,
        data: &SecretData,
        patch: &ServiceAccountPatch,
    ) -> Result<PartitionOutcome, SyncError> {
        let name = partition.name();

        if partition.is_terminating() {
            info!(partition = %name, "partition is marked for deletion, skipping");
            return Ok(PartitionOutcome::Skipped);
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Only the default partition may originate a new pull secret; other
        // partitions are provisioned by their own controllers and are only
        // refreshed here once a secret exists.
        match self.secrets.get(name, &self.config.secret_name).await {
            Ok(None) if name != self.config.default_partition => {
                debug!(partition = %name, "no pull secret provisioned, skipping");
                return Ok(PartitionOutcome::Skipped);
            }
            Ok(_) => {}
            Err(err) => {
                // Not a definitive absence: let the update step surface it.
                debug!(
                    partition = %name,
                    error = %err,
                    "pull secret probe failed, proceeding with update"
                );
            }
        }

        self.update_secret(cancel, name, data).await?;
        self.patch_service_account(cancel, name, patch).await?;

        debug!(
            target = "metrics",
            action = "credsync.progress",
            partition = %name,
            "partition updated"
        );
        Ok(PartitionOutcome::Updated)
    }

    async fn update_secret(
        &self,
        cancel: &CancellationToken,
        partition: &str,
        data: &SecretData,
    ) -> Result<(), SyncError> {
        retry::constant(cancel, self.config.retry_interval, || async move {
            self.secrets
                .create_or_update(
                    partition,
                    &self.config.secret_name,
                    SecretClass::Dockercfg,
                    data,
                )
                .await
        })
        .await
        .map_err(|err| match err {
            RetryError::Cancelled => SyncError::Cancelled,
            RetryError::Terminal(source) => SyncError::SecretUpdate {
                partition: partition.to_string(),
                source,
            },
        })
    }

    async fn patch_service_account(
        &self,
        cancel: &CancellationToken,
        partition: &str,
        patch: &ServiceAccountPatch,
    ) -> Result<(), SyncError> {
        let outcome = retry::constant(cancel, self.config.retry_interval, || async move {
            match self
                .accounts
                .patch(partition, &self.config.service_account, patch)
                .await
            {
                Ok(()) => Ok(PatchOutcome::Applied),
                // The account may not exist yet; a benign race with the
                // partition's own controller, resolved on a later pass.
                Err(err) if err.is_not_found() => Ok(PatchOutcome::TargetMissing),
                Err(err) => Err(err),
            }
        })
        .await;

        match outcome {
            Ok(PatchOutcome::Applied) => Ok(()),
            Ok(PatchOutcome::TargetMissing) => {
                debug!(
                    partition = %partition,
                    account = %self.config.service_account,
                    "service account not found, leaving it to the partition's controller"
                );
                Ok(())
            }
            Err(RetryError::Cancelled) => Err(SyncError::Cancelled),
            Err(RetryError::Terminal(source)) => Err(SyncError::ServiceAccountPatch {
                partition: partition.to_string(),
                source,
            }),
        }
    }
}
