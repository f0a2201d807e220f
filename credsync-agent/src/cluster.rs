//! Seams to the surrounding cluster.
//!
//! The synchronizer talks to the cluster exclusively through these traits;
//! production wiring binds them to the real control plane, tests and the
//! smoke binary bind them to [`crate::memory::MemoryCluster`].

use async_trait::async_trait;
use credsync_core::Partition;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Faults surfaced by cluster collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: &'static str, name: String },
    /// Transient fault; the operation may succeed when repeated.
    #[error("cluster temporarily unavailable: {0}")]
    Unavailable(String),
    /// Definitive rejection; repeating the operation will not help.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ClusterError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        ClusterError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ClusterError::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

/// Access token minted by the external token source.
///
/// The secret value is redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Mints fresh access tokens for the registry account.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, ClusterError>;
}

/// Enumerates the cluster's partitions.
#[async_trait]
pub trait PartitionDirectory: Send + Sync {
    async fn list_partitions(&self) -> Result<Vec<Partition>, ClusterError>;
}

/// Payload class of a stored secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretClass {
    /// Registry configuration document under the `.dockercfg` key.
    Dockercfg,
    Opaque,
}

/// Secret payload keyed by data entry name.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Reads and writes named secrets within a partition.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Current data of the named secret, `None` when absent.
    async fn get(&self, partition: &str, name: &str) -> Result<Option<SecretData>, ClusterError>;

    /// Create the secret or replace its content wholesale.
    async fn create_or_update(
        &self,
        partition: &str,
        name: &str,
        class: SecretClass,
        data: &SecretData,
    ) -> Result<(), ClusterError>;
}

/// Reference to a secret by name, as embedded in a service account.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
}

/// Merge-style partial update for a partition's execution identity.
///
/// Applying the same patch twice is a no-op once the reference is present;
/// the patch target owns the merge semantics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountPatch {
    pub image_pull_secrets: Vec<SecretRef>,
}

impl ServiceAccountPatch {
    /// Patch ensuring `secret_name` is listed among the image-pull secrets.
    pub fn image_pull_secret(secret_name: impl Into<String>) -> Self {
        Self {
            image_pull_secrets: vec![SecretRef {
                name: secret_name.into(),
            }],
        }
    }
}

/// Applies merge-style patches to service accounts.
#[async_trait]
pub trait ServiceAccountPatcher: Send + Sync {
    async fn patch(
        &self,
        partition: &str,
        name: &str,
        patch: &ServiceAccountPatch,
    ) -> Result<(), ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ClusterError::Unavailable("503".into()).is_retryable());
        assert!(!ClusterError::Rejected("denied".into()).is_retryable());
        assert!(!ClusterError::not_found("secret", "gcr-json-key").is_retryable());
        assert!(ClusterError::not_found("secret", "gcr-json-key").is_not_found());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("ya29.something-sensitive");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[test]
    fn patch_document_shape() {
        let patch = ServiceAccountPatch::image_pull_secret("gcr-json-key");
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"imagePullSecrets":[{"name":"gcr-json-key"}]}"#);
    }
}
