use crate::errors::{Error, Result};
use crate::labels::Labels;
use crate::store::StoredObject;
use serde::{Deserialize, Serialize};

/// Validates that the provided value is non-empty and contains only
/// characters accepted for cluster object names.
pub(crate) fn validate_component(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::EmptyComponent { field });
    }

    if !value
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '.'))
    {
        return Err(Error::InvalidCharacters {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Lifecycle state of a partition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PartitionState {
    Active,
    /// Marked for deletion; propagation passes treat it as out of scope.
    Terminating,
}

/// A named subdivision of the cluster's resource space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partition {
    name: String,
    state: PartitionState,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    labels: Labels,
}

impl Partition {
    /// Construct a validated partition.
    pub fn new(name: impl Into<String>, state: PartitionState) -> Result<Self> {
        let name = name.into();
        validate_component(&name, "partition name")?;
        Ok(Self {
            name,
            state,
            labels: Labels::new(),
        })
    }

    pub fn active(name: impl Into<String>) -> Result<Self> {
        Self::new(name, PartitionState::Active)
    }

    pub fn terminating(name: impl Into<String>) -> Result<Self> {
        Self::new(name, PartitionState::Terminating)
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PartitionState {
        self.state
    }

    pub fn is_terminating(&self) -> bool {
        self.state == PartitionState::Terminating
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }
}

impl StoredObject for Partition {
    const KIND: &'static str = "partition";

    // Partitions are cluster-scoped.
    fn namespace(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &Labels {
        &self.labels
    }
}
