//! Strata Core Library
//!
//! Version histories for a hierarchical content repository: a DAG of
//! immutable versions per versionable item, with checkin, labels,
//! graph-preserving removal and identity-preserving reload.

pub mod config;
pub mod domain;
pub mod fakes;
pub mod history;
pub mod lifecycle;
pub mod obs;
pub mod telemetry;

pub use config::HistoryConfig;

pub use domain::{
    FrozenPayload, HistoryError, JsonSnapshotWriter, Result, SnapshotError, SnapshotWriter,
    SourceItem, WorkItem,
};

pub use history::{HistoryContext, ReloadStats, SharedHistory, Version, VersionHistory};

pub use lifecycle::{NoopLifecycle, VersionLifecycle};

pub use obs::{
    emit_history_loaded, emit_history_reloaded, emit_label_set, emit_label_unresolved,
    emit_legacy_successors_derived, emit_persist_failed, emit_version_created,
    emit_version_removed, HistorySpan,
};
pub use telemetry::init_tracing;

pub use strata_state::{NodeId, NodeStore};

/// Strata version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
