//! Version handles.
//!
//! A `Version` is a cheap, cloneable, read-only handle onto one vertex of a
//! version graph. Its history owns the underlying state and is the only
//! writer. Handles survive reloads: a vertex that is still persisted keeps
//! the same handle identity with refreshed fields, a vertex that vanished is
//! marked invalid and every further read fails with
//! [`HistoryError::StaleVersion`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use strata_state::NodeId;

use crate::domain::error::{HistoryError, Result};
use crate::domain::snapshot::FrozenPayload;

/// Version data as read from the persisted container.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VersionRecord {
    pub id: NodeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
    pub frozen: FrozenPayload,
    pub is_root: bool,
}

#[derive(Debug)]
pub(super) struct VersionState {
    pub(super) name: String,
    pub(super) created_at: DateTime<Utc>,
    pub(super) predecessors: BTreeSet<NodeId>,
    pub(super) successors: BTreeSet<NodeId>,
    pub(super) labels: BTreeSet<String>,
    pub(super) frozen: FrozenPayload,
    pub(super) is_root: bool,
    valid: bool,
}

impl VersionState {
    fn from_record(record: VersionRecord) -> Self {
        Self {
            name: record.name,
            created_at: record.created_at,
            predecessors: record.predecessors.into_iter().collect(),
            successors: record.successors.into_iter().collect(),
            labels: BTreeSet::new(),
            frozen: record.frozen,
            is_root: record.is_root,
            valid: true,
        }
    }
}

/// Shared read-only handle onto a version.
#[derive(Clone)]
pub struct Version {
    id: NodeId,
    state: Arc<RwLock<VersionState>>,
}

impl Version {
    pub(super) fn from_record(record: VersionRecord) -> Self {
        Self {
            id: record.id,
            state: Arc::new(RwLock::new(VersionState::from_record(record))),
        }
    }

    /// Stable identity. Readable even after invalidation.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.state.read().valid
    }

    /// Whether both handles refer to the same in-memory vertex.
    pub fn is_same(&self, other: &Version) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn read<T>(&self, f: impl FnOnce(&VersionState) -> T) -> Result<T> {
        let state = self.state.read();
        if !state.valid {
            return Err(HistoryError::StaleVersion { id: self.id });
        }
        Ok(f(&state))
    }

    pub fn name(&self) -> Result<String> {
        self.read(|s| s.name.clone())
    }

    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        self.read(|s| s.created_at)
    }

    pub fn is_root(&self) -> Result<bool> {
        self.read(|s| s.is_root)
    }

    pub fn predecessors(&self) -> Result<Vec<NodeId>> {
        self.read(|s| s.predecessors.iter().copied().collect())
    }

    pub fn successors(&self) -> Result<Vec<NodeId>> {
        self.read(|s| s.successors.iter().copied().collect())
    }

    pub fn labels(&self) -> Result<Vec<String>> {
        self.read(|s| s.labels.iter().cloned().collect())
    }

    pub fn has_label(&self, label: &str) -> Result<bool> {
        self.read(|s| s.labels.contains(label))
    }

    pub fn frozen(&self) -> Result<FrozenPayload> {
        self.read(|s| s.frozen.clone())
    }

    /// Unchecked read access for the owning history, which only holds valid versions.
    pub(super) fn state(&self) -> RwLockReadGuard<'_, VersionState> {
        self.state.read()
    }

    pub(super) fn state_mut(&self) -> RwLockWriteGuard<'_, VersionState> {
        self.state.write()
    }

    /// Reset all mutable fields from a fresh read, keeping the handle identity.
    pub(super) fn refresh(&self, record: VersionRecord) {
        debug_assert_eq!(record.id, self.id);
        *self.state.write() = VersionState::from_record(record);
    }

    pub(super) fn invalidate(&self) {
        self.state.write().valid = false;
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Version {}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Version")
            .field("id", &self.id)
            .field("name", &state.name)
            .field("valid", &state.valid)
            .finish()
    }
}
