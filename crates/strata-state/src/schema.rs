//! Schema definitions for the persisted node tree
//!
//! - `NodeId`: stable identity of a persisted node
//! - `NodeType`: the primary type a node was created with
//! - `PropertyValue`: typed property payloads
//! - `NodeRecord`: one node of the tree as it is persisted

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Stable identity of a persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a new random NodeId
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        NodeId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short form (first 8 hex chars), for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(NodeId)
            .map_err(|_| StorageError::InvalidNodeId(s.to_string()))
    }
}

/// Primary type of a persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// The tree root; exactly one per store
    Root,
    /// Container holding histories or arbitrary content
    Unstructured,
    /// A version history container
    VersionHistory,
    /// A single version container
    Version,
    /// The label table of a version history
    VersionLabels,
    /// Frozen snapshot content below a version
    FrozenNode,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Root => "root",
            NodeType::Unstructured => "unstructured",
            NodeType::VersionHistory => "version_history",
            NodeType::Version => "version",
            NodeType::VersionLabels => "version_labels",
            NodeType::FrozenNode => "frozen_node",
        };
        f.write_str(s)
    }
}

/// Typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    String(String),
    Strings(Vec<String>),
    Reference(NodeId),
    References(Vec<NodeId>),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Single reference target. Multi-valued references yield `None`.
    pub fn as_reference(&self) -> Option<NodeId> {
        match self {
            PropertyValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Reference targets; a single reference is returned as a one-element list.
    pub fn as_references(&self) -> Option<Vec<NodeId>> {
        match self {
            PropertyValue::Reference(id) => Some(vec![*id]),
            PropertyValue::References(ids) => Some(ids.clone()),
            _ => None,
        }
    }

    /// Whether this property is reference-typed (single or multi-valued).
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            PropertyValue::Reference(_) | PropertyValue::References(_)
        )
    }
}

/// One node of the persisted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Child ids in insertion order
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl NodeRecord {
    pub fn new(id: NodeId, name: impl Into<String>, node_type: NodeType, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name: name.into(),
            node_type,
            parent,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// A child entry as returned by child enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildNode {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
}
