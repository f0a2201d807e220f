//! In-memory cluster used by tests and the smoke binary.

use crate::cluster::{
    AccessToken, ClusterError, PartitionDirectory, SecretClass, SecretData, SecretStore,
    ServiceAccountPatch, ServiceAccountPatcher, TokenSource,
};
use async_trait::async_trait;
use credsync_core::Partition;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Secret as held by the memory cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub class: SecretClass,
    pub data: SecretData,
}

#[derive(Debug, Default)]
struct ServiceAccount {
    image_pull_secrets: Vec<String>,
}

#[derive(Default)]
struct Inner {
    token: String,
    partitions: Vec<Partition>,
    secrets: HashMap<(String, String), StoredSecret>,
    accounts: HashMap<(String, String), ServiceAccount>,
    token_faults: VecDeque<ClusterError>,
    partition_faults: VecDeque<ClusterError>,
    secret_faults: VecDeque<ClusterError>,
    patch_faults: VecDeque<ClusterError>,
}

/// In-process implementation of every cluster collaborator.
///
/// Fault queues allow scripting one fault per upcoming call of the matching
/// operation, which is how tests drive retry and partial-failure paths.
#[derive(Default)]
pub struct MemoryCluster {
    inner: Mutex<Inner>,
}

impl MemoryCluster {
    pub fn new(token: impl Into<String>) -> Self {
        let cluster = Self::default();
        cluster.set_token(token);
        cluster
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.inner.lock().unwrap().token = token.into();
    }

    pub fn add_partition(&self, partition: Partition) {
        self.inner.lock().unwrap().partitions.push(partition);
    }

    pub fn seed_secret(
        &self,
        partition: &str,
        name: &str,
        class: SecretClass,
        data: SecretData,
    ) {
        self.inner.lock().unwrap().secrets.insert(
            (partition.to_string(), name.to_string()),
            StoredSecret { class, data },
        );
    }

    pub fn seed_service_account(&self, partition: &str, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(
                (partition.to_string(), name.to_string()),
                ServiceAccount::default(),
            );
    }

    /// Queue a fault for the next token fetch.
    pub fn inject_token_fault(&self, fault: ClusterError) {
        self.inner.lock().unwrap().token_faults.push_back(fault);
    }

    /// Queue a fault for the next partition listing.
    pub fn inject_partition_fault(&self, fault: ClusterError) {
        self.inner.lock().unwrap().partition_faults.push_back(fault);
    }

    /// Queue a fault for the next secret create-or-update.
    pub fn inject_secret_fault(&self, fault: ClusterError) {
        self.inner.lock().unwrap().secret_faults.push_back(fault);
    }

    /// Queue a fault for the next service-account patch.
    pub fn inject_patch_fault(&self, fault: ClusterError) {
        self.inner.lock().unwrap().patch_faults.push_back(fault);
    }

    pub fn secret(&self, partition: &str, name: &str) -> Option<StoredSecret> {
        self.inner
            .lock()
            .unwrap()
            .secrets
            .get(&(partition.to_string(), name.to_string()))
            .cloned()
    }

    pub fn image_pull_secrets(&self, partition: &str, account: &str) -> Option<Vec<String>> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .get(&(partition.to_string(), account.to_string()))
            .map(|sa| sa.image_pull_secrets.clone())
    }
}

#[async_trait]
impl TokenSource for MemoryCluster {
    async fn fetch_token(&self) -> Result<AccessToken, ClusterError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = inner.token_faults.pop_front() {
            return Err(fault);
        }
        Ok(AccessToken::new(inner.token.clone()))
    }
}

#[async_trait]
impl PartitionDirectory for MemoryCluster {
    async fn list_partitions(&self) -> Result<Vec<Partition>, ClusterError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = inner.partition_faults.pop_front() {
            return Err(fault);
        }
        Ok(inner.partitions.clone())
    }
}

#[async_trait]
impl SecretStore for MemoryCluster {
    async fn get(&self, partition: &str, name: &str) -> Result<Option<SecretData>, ClusterError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .secrets
            .get(&(partition.to_string(), name.to_string()))
            .map(|secret| secret.data.clone()))
    }

    async fn create_or_update(
        &self,
        partition: &str,
        name: &str,
        class: SecretClass,
        data: &SecretData,
    ) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = inner.secret_faults.pop_front() {
            return Err(fault);
        }
        inner.secrets.insert(
            (partition.to_string(), name.to_string()),
            StoredSecret {
                class,
                data: data.clone(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ServiceAccountPatcher for MemoryCluster {
    async fn patch(
        &self,
        partition: &str,
        name: &str,
        patch: &ServiceAccountPatch,
    ) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = inner.patch_faults.pop_front() {
            return Err(fault);
        }
        let account = inner
            .accounts
            .get_mut(&(partition.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::not_found("serviceaccount", name))?;
        for reference in &patch.image_pull_secrets {
            if !account.image_pull_secrets.contains(&reference.name) {
                account.image_pull_secrets.push(reference.name.clone());
            }
        }
        Ok(())
    }
}
