//! Version lifecycle notifications.

use strata_state::NodeId;

use crate::history::Version;

/// Observer of version creation and destruction.
///
/// Also answers whether anything outside version storage still references a
/// version; a version with external references cannot be removed.
pub trait VersionLifecycle: Send + Sync {
    /// A version entered the history cache, by checkin or by load.
    fn version_created(&self, version: &Version);

    /// A version was removed from the history.
    fn version_destroyed(&self, version: &Version);

    /// Ids of items outside version storage that reference `version`.
    fn external_references(&self, version: &Version) -> Vec<NodeId>;
}

/// Lifecycle that ignores notifications and reports no references.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycle;

impl VersionLifecycle for NoopLifecycle {
    fn version_created(&self, _version: &Version) {}

    fn version_destroyed(&self, _version: &Version) {}

    fn external_references(&self, _version: &Version) -> Vec<NodeId> {
        Vec::new()
    }
}
