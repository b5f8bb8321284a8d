//! In-memory node tree shared by the store implementations.
//!
//! A `NodeTree` is a flat arena of `NodeRecord`s keyed by id, with parent and
//! child links kept on the records. It is the unit that gets committed,
//! refreshed and (for the filesystem store) serialized.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::schema::{ChildNode, NodeId, NodeRecord, NodeType, PropertyValue};
use crate::storage_traits::StorageResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    root: NodeId,
    nodes: HashMap<NodeId, NodeRecord>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree holding only a root node.
    pub fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeRecord::new(root, "", NodeType::Root, None));
        Self { root, nodes }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> StorageResult<&NodeRecord> {
        self.nodes
            .get(id)
            .ok_or(StorageError::NodeNotFound { id: *id })
    }

    fn get_mut(&mut self, id: &NodeId) -> StorageResult<&mut NodeRecord> {
        self.nodes
            .get_mut(id)
            .ok_or(StorageError::NodeNotFound { id: *id })
    }

    pub fn child_nodes(&self, parent: &NodeId) -> StorageResult<Vec<ChildNode>> {
        let record = self.get(parent)?;
        record
            .children
            .iter()
            .map(|id| {
                let child = self.get(id)?;
                Ok(ChildNode {
                    id: child.id,
                    name: child.name.clone(),
                    node_type: child.node_type,
                })
            })
            .collect()
    }

    pub fn child(&self, parent: &NodeId, name: &str) -> StorageResult<Option<ChildNode>> {
        Ok(self
            .child_nodes(parent)?
            .into_iter()
            .find(|c| c.name == name))
    }

    pub fn add_child(
        &mut self,
        parent: &NodeId,
        name: &str,
        node_type: NodeType,
        explicit_id: Option<NodeId>,
    ) -> StorageResult<NodeId> {
        if self.child(parent, name)?.is_some() {
            return Err(StorageError::ChildExists {
                parent: *parent,
                name: name.to_string(),
            });
        }
        let id = explicit_id.unwrap_or_default();
        if self.nodes.contains_key(&id) {
            return Err(StorageError::DuplicateId { id });
        }

        self.nodes
            .insert(id, NodeRecord::new(id, name, node_type, Some(*parent)));
        self.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove the named child and its entire subtree.
    pub fn remove_child(&mut self, parent: &NodeId, name: &str) -> StorageResult<()> {
        let child = self
            .child(parent, name)?
            .ok_or_else(|| StorageError::ChildNotFound {
                parent: *parent,
                name: name.to_string(),
            })?;

        self.get_mut(parent)?.children.retain(|c| *c != child.id);

        let mut stack = vec![child.id];
        while let Some(id) = stack.pop() {
            if let Some(record) = self.nodes.remove(&id) {
                stack.extend(record.children);
            }
        }
        Ok(())
    }

    pub fn property(&self, id: &NodeId, name: &str) -> StorageResult<Option<PropertyValue>> {
        Ok(self.get(id)?.properties.get(name).cloned())
    }

    pub fn properties(&self, id: &NodeId) -> StorageResult<Vec<(String, PropertyValue)>> {
        Ok(self
            .get(id)?
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn set_property(
        &mut self,
        id: &NodeId,
        name: &str,
        value: PropertyValue,
    ) -> StorageResult<()> {
        self.get_mut(id)?
            .properties
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Returns whether the property existed.
    pub fn remove_property(&mut self, id: &NodeId, name: &str) -> StorageResult<bool> {
        Ok(self.get_mut(id)?.properties.remove(name).is_some())
    }
}
