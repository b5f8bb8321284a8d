//! Domain models for Strata version histories.
//!
//! - `FrozenPayload`: immutable snapshot content of a version
//! - `SourceItem` / `SnapshotWriter`: how content gets frozen at checkin
//! - `HistoryError`: the error taxonomy shared by all history operations

pub mod digest;
pub mod error;
pub mod snapshot;

// Re-export main types and errors
pub use error::{HistoryError, Result, SnapshotError};
pub use snapshot::{FrozenPayload, JsonSnapshotWriter, SnapshotWriter, SourceItem, WorkItem};
