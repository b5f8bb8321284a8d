//! Version histories.
//!
//! A `VersionHistory` owns the version graph of one versionable item: the
//! versions, the root version and the label table. It is the only writer of
//! that state. Every mutation follows the same order:
//!
//! 1. validate against the cache (nothing changes on failure),
//! 2. stage and commit the change through the `NodeStore`,
//! 3. apply it to the cache and notify the lifecycle.
//!
//! If step 2 fails the staged changes are discarded with `refresh` and the
//! cache is left untouched. A failing commit may still have reached storage
//! on some adapters, so the boundary is at-least-once; `reload` brings the
//! cache back in line with whatever was persisted.

mod checkin;
mod graph;
mod labels;
mod loader;
mod persist;
mod removal;
pub mod schema;
mod version;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use strata_state::{NodeId, NodeStore, NodeType, PropertyValue};
use tracing::{debug, warn};

pub use version::Version;

use self::graph::VersionGraph;
use self::labels::LabelTable;
use self::loader::HistoryImage;
use self::persist::NewVersion;
use crate::config::HistoryConfig;
use crate::domain::error::{HistoryError, Result};
use crate::domain::snapshot::{FrozenPayload, JsonSnapshotWriter, SnapshotWriter, SourceItem};
use crate::lifecycle::{NoopLifecycle, VersionLifecycle};
use crate::obs::{self, HistorySpan};

/// A history behind a lock, for sharing across threads.
///
/// Readers take the read guard; checkin, labelling, removal and reload need
/// the write guard.
pub type SharedHistory<S> = Arc<RwLock<VersionHistory<S>>>;

/// Collaborators and options a history is opened with.
#[derive(Clone)]
pub struct HistoryContext {
    pub lifecycle: Arc<dyn VersionLifecycle>,
    pub writer: Arc<dyn SnapshotWriter>,
    pub config: HistoryConfig,
}

impl Default for HistoryContext {
    fn default() -> Self {
        Self::new(Arc::new(NoopLifecycle))
    }
}

impl HistoryContext {
    pub fn new(lifecycle: Arc<dyn VersionLifecycle>) -> Self {
        Self {
            lifecycle,
            writer: Arc::new(JsonSnapshotWriter),
            config: HistoryConfig::default(),
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn SnapshotWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_config(mut self, config: HistoryConfig) -> Self {
        self.config = config;
        self
    }
}

/// How a reload reconciled the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    /// Handles kept across the reload.
    pub reused: usize,
    /// Versions seen for the first time.
    pub created: usize,
    /// Handles whose version is gone.
    pub invalidated: usize,
}

pub struct VersionHistory<S: NodeStore> {
    store: S,
    ctx: HistoryContext,
    history_id: NodeId,
    versionable_id: NodeId,
    labels_node_id: NodeId,
    root_id: NodeId,
    graph: VersionGraph,
    labels: LabelTable,
}

impl<S: NodeStore> VersionHistory<S> {
    /// Create a new history for `versionable` under `parent`, holding only
    /// a root version, and load it.
    pub fn create(
        store: S,
        parent: &NodeId,
        name: &str,
        versionable: &dyn SourceItem,
        ctx: HistoryContext,
    ) -> Result<Self> {
        let history_id = NodeId::new();
        let _span = HistorySpan::enter(&history_id, "create");

        let root = FrozenPayload::empty(versionable.id(), versionable.primary_type());
        guarded(&store, &history_id, "create", |store| {
            store.add_child(parent, name, NodeType::VersionHistory, Some(history_id))?;
            store.set_property(
                &history_id,
                schema::VERSIONABLE_ID,
                PropertyValue::String(versionable.id().to_string()),
            )?;
            store.add_child(&history_id, schema::LABELS_NODE, NodeType::VersionLabels, None)?;
            persist::write_version(
                store,
                &history_id,
                &NewVersion {
                    id: NodeId::new(),
                    name: schema::ROOT_VERSION,
                    created_at: Utc::now(),
                    predecessors: &[],
                    frozen: &root,
                },
            )?;
            store.commit()?;
            Ok(())
        })?;
        debug!(history = %history_id, versionable = %versionable.id(), "Created version history");

        Self::load(store, &history_id, ctx)
    }

    /// Load the history stored at `history_id`.
    pub fn load(store: S, history_id: &NodeId, ctx: HistoryContext) -> Result<Self> {
        let _span = HistorySpan::enter(history_id, "load");
        let image = loader::read_history(&store, history_id)?;

        let mut history = Self {
            store,
            ctx,
            history_id: *history_id,
            versionable_id: image.versionable_id,
            labels_node_id: image.labels_node_id,
            root_id: image.root_id,
            graph: VersionGraph::new(),
            labels: LabelTable::new(),
        };
        history.install(image, HashMap::new());
        obs::emit_history_loaded(history_id, history.graph.len(), history.labels.len());
        Ok(history)
    }

    /// Re-synchronise the cache with committed storage.
    ///
    /// Versions still persisted keep their handles, with fields re-read.
    /// Handles of versions that disappeared are invalidated. If reading
    /// fails the cache is left as it was.
    pub fn reload(&mut self) -> Result<ReloadStats> {
        let _span = HistorySpan::enter(&self.history_id, "reload");
        self.store.refresh()?;
        let image = loader::read_history(&self.store, &self.history_id)?;

        let salvage = self.graph.take_all();
        let stats = self.install(image, salvage);
        obs::emit_history_reloaded(
            &self.history_id,
            stats.reused,
            stats.created,
            stats.invalidated,
        );
        Ok(stats)
    }

    /// Replace the cache with `image`, reusing handles from `salvage` by id.
    fn install(&mut self, image: HistoryImage, mut salvage: HashMap<NodeId, Version>) -> ReloadStats {
        let mut stats = ReloadStats::default();
        self.versionable_id = image.versionable_id;
        self.labels_node_id = image.labels_node_id;
        self.root_id = image.root_id;

        let mut graph = VersionGraph::new();
        for record in image.versions {
            let version = match salvage.remove(&record.id) {
                Some(existing) => {
                    existing.refresh(record);
                    stats.reused += 1;
                    existing
                }
                None => {
                    stats.created += 1;
                    Version::from_record(record)
                }
            };
            graph.insert_loaded(version);
        }

        // Fills in the successor side of every one-sided predecessor edge.
        // Storage keeps the legacy links until a mutation rewrites them.
        if self.ctx.config.migrate_legacy_successors {
            let edges = graph.derive_successors();
            if edges > 0 {
                obs::emit_legacy_successors_derived(&self.history_id, edges);
            }
        }

        let mut labels = LabelTable::new();
        for (label, target) in image.labels {
            match graph.get(&target) {
                Some(version) => labels.bind(&label, version),
                None => obs::emit_label_unresolved(&self.history_id, &label, &target),
            }
        }

        stats.invalidated = salvage.len();
        for stale in salvage.into_values() {
            stale.invalidate();
        }

        self.graph = graph;
        self.labels = labels;
        for version in self.graph.versions() {
            self.ctx.lifecycle.version_created(version);
        }
        stats
    }

    /// Run `f` against the store; on failure discard whatever it staged.
    fn persist<T>(&self, op: &'static str, f: impl FnOnce(&S) -> Result<T>) -> Result<T> {
        guarded(&self.store, &self.history_id, op, f)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn history_id(&self) -> NodeId {
        self.history_id
    }

    pub fn versionable_id(&self) -> NodeId {
        self.versionable_id
    }

    pub fn labels_node_id(&self) -> NodeId {
        self.labels_node_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.ctx.config
    }

    pub fn version(&self, name: &str) -> Result<Version> {
        self.graph
            .by_name(name)
            .cloned()
            .ok_or_else(|| HistoryError::VersionNotFound {
                name: name.to_string(),
            })
    }

    pub fn version_by_id(&self, id: &NodeId) -> Result<Version> {
        self.graph
            .get(id)
            .cloned()
            .ok_or_else(|| HistoryError::VersionNotFound {
                name: id.to_string(),
            })
    }

    pub fn has_version(&self, name: &str) -> bool {
        self.graph.by_name(name).is_some()
    }

    pub fn has_version_id(&self, id: &NodeId) -> bool {
        self.graph.contains(id)
    }

    pub fn version_by_label(&self, label: &str) -> Option<Version> {
        self.labels
            .get(label)
            .and_then(|id| self.graph.get(&id))
            .cloned()
    }

    /// All label names, sorted.
    pub fn version_labels(&self) -> Vec<String> {
        self.labels.labels()
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self.graph.versions().cloned().collect();
        versions.sort_by_cached_key(|v| {
            let state = v.state();
            (!state.is_root, state.created_at, state.name.clone())
        });
        versions
    }

    pub fn num_versions(&self) -> usize {
        self.graph.len()
    }

    pub fn root_version(&self) -> Result<Version> {
        self.graph.get(&self.root_id).cloned().ok_or_else(|| {
            HistoryError::consistency(format!("root version {} not cached", self.root_id))
        })
    }

    /// Versions without successors.
    pub fn heads(&self) -> Vec<Version> {
        let mut heads = self.graph.heads();
        heads.sort_by_cached_key(|v| {
            let state = v.state();
            (state.created_at, state.name.clone())
        });
        heads
    }

    /// Check graph and label-table invariants.
    pub fn check_invariants(&self) -> Result<()> {
        self.graph
            .verify(&self.root_id)
            .and_then(|_| self.labels.verify(&self.graph))
            .map_err(HistoryError::Consistency)
    }

    pub fn into_shared(self) -> SharedHistory<S> {
        Arc::new(RwLock::new(self))
    }
}

fn guarded<S, T>(
    store: &S,
    history_id: &NodeId,
    op: &'static str,
    f: impl FnOnce(&S) -> Result<T>,
) -> Result<T>
where
    S: NodeStore + ?Sized,
{
    f(store).map_err(|err| {
        obs::emit_persist_failed(history_id, op, &err);
        if let Err(refresh_err) = store.refresh() {
            warn!(error = %refresh_err, "Discarding staged changes failed");
        }
        err
    })
}
