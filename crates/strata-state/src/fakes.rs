//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryNodeStore`, which satisfies the `NodeStore` contract
//! without touching the filesystem. Several sessions can be opened over the
//! same committed tree to model independent writers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::schema::{ChildNode, NodeId, NodeType, PropertyValue};
use crate::storage_traits::*;
use crate::tree::NodeTree;

// ---------------------------------------------------------------------------
// MemoryNodeStore
// ---------------------------------------------------------------------------

/// In-memory node store: a shared committed `NodeTree` plus a private
/// working copy per session.
#[derive(Debug)]
pub struct MemoryNodeStore {
    committed: Arc<Mutex<NodeTree>>,
    working: Mutex<NodeTree>,
    fail_next_commit: AtomicBool,
    commits: AtomicU64,
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        let tree = NodeTree::new();
        Self {
            committed: Arc::new(Mutex::new(tree.clone())),
            working: Mutex::new(tree),
            fail_next_commit: AtomicBool::new(false),
            commits: AtomicU64::new(0),
        }
    }

    /// Open another session over the same committed tree.
    pub fn session(&self) -> Self {
        let tree = self.committed.lock().clone();
        Self {
            committed: Arc::clone(&self.committed),
            working: Mutex::new(tree),
            fail_next_commit: AtomicBool::new(false),
            commits: AtomicU64::new(0),
        }
    }

    /// Make the next `commit` on this session fail, leaving the working copy staged.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits made through this session.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Whether this session has staged, uncommitted changes.
    pub fn has_pending_changes(&self) -> bool {
        *self.working.lock() != *self.committed.lock()
    }
}

impl NodeStore for MemoryNodeStore {
    fn root_id(&self) -> NodeId {
        self.working.lock().root_id()
    }

    fn node(&self, id: &NodeId) -> StorageResult<NodeInfo> {
        let tree = self.working.lock();
        let record = tree.get(id)?;
        Ok(NodeInfo {
            id: record.id,
            name: record.name.clone(),
            node_type: record.node_type,
            parent: record.parent,
        })
    }

    fn property(&self, id: &NodeId, name: &str) -> StorageResult<Option<PropertyValue>> {
        self.working.lock().property(id, name)
    }

    fn properties(&self, id: &NodeId) -> StorageResult<Vec<(String, PropertyValue)>> {
        self.working.lock().properties(id)
    }

    fn child_nodes(&self, id: &NodeId) -> StorageResult<Vec<ChildNode>> {
        self.working.lock().child_nodes(id)
    }

    fn child(&self, id: &NodeId, name: &str) -> StorageResult<Option<ChildNode>> {
        self.working.lock().child(id, name)
    }

    fn add_child(
        &self,
        parent: &NodeId,
        name: &str,
        node_type: NodeType,
        explicit_id: Option<NodeId>,
    ) -> StorageResult<NodeId> {
        self.working
            .lock()
            .add_child(parent, name, node_type, explicit_id)
    }

    fn remove_child(&self, parent: &NodeId, name: &str) -> StorageResult<()> {
        self.working.lock().remove_child(parent, name)
    }

    fn set_property(&self, id: &NodeId, name: &str, value: PropertyValue) -> StorageResult<()> {
        self.working.lock().set_property(id, name, value)
    }

    fn remove_property(&self, id: &NodeId, name: &str) -> StorageResult<bool> {
        self.working.lock().remove_property(id, name)
    }

    fn commit(&self) -> StorageResult<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Commit("injected commit failure".to_string()));
        }
        let working = self.working.lock();
        *self.committed.lock() = working.clone();
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn refresh(&self) -> StorageResult<()> {
        let committed = self.committed.lock().clone();
        *self.working.lock() = committed;
        Ok(())
    }
}
