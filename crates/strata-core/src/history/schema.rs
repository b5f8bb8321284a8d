//! Names used in the persisted layout of a version history.
//!
//! ```text
//! <history>                 VersionHistory   versionableId
//!   versionLabels           VersionLabels    <label> -> Reference(version)
//!   rootVersion             Version          created, predecessors, successors
//!     frozenNode            FrozenNode       frozenId, frozenPrimaryType, content, digest
//!   <version name>          Version          ...
//! ```

/// History property: id of the versioned item.
pub const VERSIONABLE_ID: &str = "versionableId";

/// Child holding the label table.
pub const LABELS_NODE: &str = "versionLabels";

/// Child name reserved for the root version.
pub const ROOT_VERSION: &str = "rootVersion";

/// Version properties.
pub const CREATED: &str = "created";
pub const PREDECESSORS: &str = "predecessors";
pub const SUCCESSORS: &str = "successors";

/// Child of a version holding its frozen payload.
pub const FROZEN_NODE: &str = "frozenNode";

/// Frozen node properties.
pub const FROZEN_ID: &str = "frozenId";
pub const FROZEN_PRIMARY_TYPE: &str = "frozenPrimaryType";
pub const FROZEN_CONTENT: &str = "content";
pub const FROZEN_DIGEST: &str = "digest";

/// Names a version may not take.
pub fn is_reserved(name: &str) -> bool {
    name == LABELS_NODE || name == ROOT_VERSION
}
