//! Storage trait definitions for Strata
//!
//! `NodeStore` is the persisted-node adapter the version history talks to:
//! a tree of typed nodes carrying named properties, with explicit commit.
//!
//! Mutations are staged in a working copy and become durable (and visible to
//! other sessions) on `commit`. `refresh` discards staged changes and re-reads
//! the committed state. In-memory fakes are provided for testing via the
//! `fakes` module.

use std::sync::Arc;

use crate::error::StorageError;
use crate::schema::{ChildNode, NodeId, NodeType, PropertyValue};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Name and type of a stored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub parent: Option<NodeId>,
}

/// Persisted-node adapter.
///
/// Guarantees:
/// - Node ids are stable for the lifetime of the node.
/// - Sibling names are unique.
/// - `remove_child` removes the whole subtree.
/// - Changes are only visible to other sessions after `commit`.
pub trait NodeStore: Send + Sync {
    /// Id of the tree root.
    fn root_id(&self) -> NodeId;

    /// Name, type and parent of a node. `StorageError::NodeNotFound` if absent.
    fn node(&self, id: &NodeId) -> StorageResult<NodeInfo>;

    /// Read a single property; `None` if unset.
    fn property(&self, id: &NodeId, name: &str) -> StorageResult<Option<PropertyValue>>;

    /// All properties of a node, ordered by name.
    fn properties(&self, id: &NodeId) -> StorageResult<Vec<(String, PropertyValue)>>;

    /// Children of a node in insertion order.
    fn child_nodes(&self, id: &NodeId) -> StorageResult<Vec<ChildNode>>;

    /// Look up a child by name.
    fn child(&self, id: &NodeId, name: &str) -> StorageResult<Option<ChildNode>>;

    /// Add a child node. Uses `explicit_id` when given, otherwise a fresh id.
    fn add_child(
        &self,
        parent: &NodeId,
        name: &str,
        node_type: NodeType,
        explicit_id: Option<NodeId>,
    ) -> StorageResult<NodeId>;

    /// Remove a child node and its subtree.
    fn remove_child(&self, parent: &NodeId, name: &str) -> StorageResult<()>;

    /// Set (create or replace) a property.
    fn set_property(&self, id: &NodeId, name: &str, value: PropertyValue) -> StorageResult<()>;

    /// Remove a property, returning whether it existed.
    fn remove_property(&self, id: &NodeId, name: &str) -> StorageResult<bool>;

    /// Make all staged changes durable.
    fn commit(&self) -> StorageResult<()>;

    /// Discard staged changes and re-read committed state.
    fn refresh(&self) -> StorageResult<()>;
}

impl<T: NodeStore + ?Sized> NodeStore for Arc<T> {
    fn root_id(&self) -> NodeId {
        (**self).root_id()
    }

    fn node(&self, id: &NodeId) -> StorageResult<NodeInfo> {
        (**self).node(id)
    }

    fn property(&self, id: &NodeId, name: &str) -> StorageResult<Option<PropertyValue>> {
        (**self).property(id, name)
    }

    fn properties(&self, id: &NodeId) -> StorageResult<Vec<(String, PropertyValue)>> {
        (**self).properties(id)
    }

    fn child_nodes(&self, id: &NodeId) -> StorageResult<Vec<ChildNode>> {
        (**self).child_nodes(id)
    }

    fn child(&self, id: &NodeId, name: &str) -> StorageResult<Option<ChildNode>> {
        (**self).child(id, name)
    }

    fn add_child(
        &self,
        parent: &NodeId,
        name: &str,
        node_type: NodeType,
        explicit_id: Option<NodeId>,
    ) -> StorageResult<NodeId> {
        (**self).add_child(parent, name, node_type, explicit_id)
    }

    fn remove_child(&self, parent: &NodeId, name: &str) -> StorageResult<()> {
        (**self).remove_child(parent, name)
    }

    fn set_property(&self, id: &NodeId, name: &str, value: PropertyValue) -> StorageResult<()> {
        (**self).set_property(id, name, value)
    }

    fn remove_property(&self, id: &NodeId, name: &str) -> StorageResult<bool> {
        (**self).remove_property(id, name)
    }

    fn commit(&self) -> StorageResult<()> {
        (**self).commit()
    }

    fn refresh(&self) -> StorageResult<()> {
        (**self).refresh()
    }
}
