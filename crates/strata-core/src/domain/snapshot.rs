//! Frozen snapshots: the opaque payload captured at checkin.
//!
//! The history never interprets frozen content. It asks a `SnapshotWriter`
//! to capture a `SourceItem` and stores whatever payload comes back.

use serde::{Deserialize, Serialize};
use strata_state::NodeId;

use crate::domain::digest::{canonical_json, content_digest};
use crate::domain::error::SnapshotError;

/// Immutable snapshot content attached to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenPayload {
    /// Id of the versionable item the snapshot was taken from.
    pub source_id: NodeId,
    /// Primary type of the item at capture time.
    pub primary_type: String,
    /// Captured content; empty for root versions.
    pub content: Vec<u8>,
    /// SHA-256 hex digest of `content`.
    pub digest: String,
}

impl FrozenPayload {
    pub fn new(source_id: NodeId, primary_type: impl Into<String>, content: Vec<u8>) -> Self {
        let digest = content_digest(&content);
        Self {
            source_id,
            primary_type: primary_type.into(),
            content,
            digest,
        }
    }

    /// Payload of a root version: identifies the item, carries no content.
    pub fn empty(source_id: NodeId, primary_type: impl Into<String>) -> Self {
        Self::new(source_id, primary_type, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Check the stored digest against the content.
    pub fn verify(&self) -> bool {
        content_digest(&self.content) == self.digest
    }
}

/// An item whose current state can be checked in.
pub trait SourceItem {
    /// Identity of the versionable item.
    fn id(&self) -> NodeId;

    fn primary_type(&self) -> &str;

    /// Version ids the next checkin descends from.
    fn predecessors(&self) -> Vec<NodeId>;

    /// Current state to freeze.
    fn state(&self) -> serde_json::Value;
}

/// Captures a source item's state into a frozen payload.
pub trait SnapshotWriter: Send + Sync {
    fn capture(&self, item: &dyn SourceItem) -> Result<FrozenPayload, SnapshotError>;
}

/// Freezes state as canonical JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSnapshotWriter;

impl SnapshotWriter for JsonSnapshotWriter {
    fn capture(&self, item: &dyn SourceItem) -> Result<FrozenPayload, SnapshotError> {
        let canonical = canonical_json(&item.state())?;
        Ok(FrozenPayload::new(
            item.id(),
            item.primary_type(),
            canonical.into_bytes(),
        ))
    }
}

/// Plain in-memory versionable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: NodeId,
    pub primary_type: String,
    pub predecessors: Vec<NodeId>,
    pub state: serde_json::Value,
}

impl WorkItem {
    pub fn new(id: NodeId, primary_type: impl Into<String>) -> Self {
        Self {
            id,
            primary_type: primary_type.into(),
            predecessors: Vec::new(),
            state: serde_json::Value::Null,
        }
    }

    pub fn with_predecessors(mut self, predecessors: impl IntoIterator<Item = NodeId>) -> Self {
        self.predecessors = predecessors.into_iter().collect();
        self
    }

    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.state = state;
        self
    }
}

impl SourceItem for WorkItem {
    fn id(&self) -> NodeId {
        self.id
    }

    fn primary_type(&self) -> &str {
        &self.primary_type
    }

    fn predecessors(&self) -> Vec<NodeId> {
        self.predecessors.clone()
    }

    fn state(&self) -> serde_json::Value {
        self.state.clone()
    }
}
