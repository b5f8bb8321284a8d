//! In-memory fakes for history collaborators (testing only)
//!
//! `RecordingLifecycle` remembers every notification and lets tests plant
//! external references. `FailingWriter` makes snapshot capture fail.

use std::collections::HashMap;

use parking_lot::Mutex;
use strata_state::NodeId;

use crate::domain::error::SnapshotError;
use crate::domain::snapshot::{FrozenPayload, SnapshotWriter, SourceItem};
use crate::history::Version;
use crate::lifecycle::VersionLifecycle;

/// Lifecycle that records notifications.
#[derive(Debug, Default)]
pub struct RecordingLifecycle {
    created: Mutex<Vec<NodeId>>,
    destroyed: Mutex<Vec<NodeId>>,
    references: Mutex<HashMap<NodeId, Vec<NodeId>>>,
}

impl RecordingLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `referrer` references `version`.
    pub fn add_reference(&self, version: NodeId, referrer: NodeId) {
        self.references
            .lock()
            .entry(version)
            .or_default()
            .push(referrer);
    }

    pub fn clear_references(&self, version: &NodeId) {
        self.references.lock().remove(version);
    }

    /// Ids announced through `version_created`, in order.
    pub fn created(&self) -> Vec<NodeId> {
        self.created.lock().clone()
    }

    /// Ids announced through `version_destroyed`, in order.
    pub fn destroyed(&self) -> Vec<NodeId> {
        self.destroyed.lock().clone()
    }

    pub fn reset(&self) {
        self.created.lock().clear();
        self.destroyed.lock().clear();
    }
}

impl VersionLifecycle for RecordingLifecycle {
    fn version_created(&self, version: &Version) {
        self.created.lock().push(version.id());
    }

    fn version_destroyed(&self, version: &Version) {
        self.destroyed.lock().push(version.id());
    }

    fn external_references(&self, version: &Version) -> Vec<NodeId> {
        self.references
            .lock()
            .get(&version.id())
            .cloned()
            .unwrap_or_default()
    }
}

/// Snapshot writer that always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingWriter;

impl SnapshotWriter for FailingWriter {
    fn capture(&self, item: &dyn SourceItem) -> Result<FrozenPayload, SnapshotError> {
        Err(SnapshotError::NonCanonical(format!(
            "refusing to capture {}",
            item.id()
        )))
    }
}
