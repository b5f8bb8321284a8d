//! Error types for strata-state

use thiserror::Error;

use crate::schema::NodeId;

/// Errors that can occur in the persisted-node layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// No node with this id exists in the tree
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// Named child is absent under the given parent
    #[error("Child '{name}' not found under node {parent}")]
    ChildNotFound { parent: NodeId, name: String },

    /// A sibling with the same name already exists
    #[error("Child '{name}' already exists under node {parent}")]
    ChildExists { parent: NodeId, name: String },

    /// An explicit node id collided with an existing node
    #[error("Node id already in use: {id}")]
    DuplicateId { id: NodeId },

    /// The root node cannot be removed or re-parented
    #[error("Operation not permitted on the root node")]
    RootNode,

    /// Invalid node id format
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    /// Commit failed; uncommitted changes remain in the working copy
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Store configuration error
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            StorageError::Deserialization(err.to_string())
        } else {
            StorageError::Serialization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_exists_names_parent_and_child() {
        let parent = NodeId::new();
        let err = StorageError::ChildExists {
            parent,
            name: "1.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.0"));
        assert!(msg.contains(&parent.to_string()));
    }

    #[test]
    fn malformed_json_maps_to_deserialization() {
        let err: StorageError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, StorageError::Deserialization(_)));
    }
}
