//! Domain-level error taxonomy for Strata version histories.

use strata_state::{NodeId, StorageError};

/// Errors produced while capturing a frozen snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("state cannot be frozen: {0}")]
    NonCanonical(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Version history errors.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Persisted structure is malformed, or a request references versions
    /// that are not part of the history.
    #[error("repository inconsistency: {0}")]
    Consistency(String),

    #[error("version {name} does not exist")]
    VersionNotFound { name: String },

    #[error("version {name} already exists")]
    VersionExists { name: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("version {name} does not exist in this version history")]
    LabelTarget { name: String },

    #[error("version label {label} already defined for version {holder}")]
    LabelConflict { label: String, holder: String },

    #[error("removal of {name} not allowed")]
    RemovalForbidden { name: String },

    #[error("unable to remove version {name}: still referenced by {referrers:?}")]
    ReferentialIntegrity { name: String, referrers: Vec<NodeId> },

    /// The version handle was dropped from its history by a reload.
    #[error("version {id} is no longer part of its history")]
    StaleVersion { id: NodeId },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl HistoryError {
    pub(crate) fn consistency(msg: impl Into<String>) -> Self {
        HistoryError::Consistency(msg.into())
    }
}

/// Result type for version history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
