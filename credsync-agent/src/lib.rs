//! Credential propagation agent.
//!
//! Keeps every eligible partition of the cluster supplied with a current
//! registry pull secret and a default service account that references it.

pub mod cluster;
pub mod config;
pub mod dockercfg;
pub mod errors;
pub mod memory;
pub mod retry;
pub mod sync;
pub mod telemetry;

pub use cluster::{
    AccessToken, ClusterError, PartitionDirectory, SecretClass, SecretData, SecretRef,
    SecretStore, ServiceAccountPatch, ServiceAccountPatcher, TokenSource,
};
pub use config::SyncConfig;
pub use errors::SyncError;
pub use memory::MemoryCluster;
pub use sync::{CredentialSynchronizer, SyncReport};
