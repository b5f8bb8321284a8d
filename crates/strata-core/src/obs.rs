//! Structured observability hooks for version history events.
//!
//! This module provides:
//! - History-scoped tracing spans via the `HistorySpan` RAII guard
//! - Emission functions for history lifecycle events
//!
//! Events are emitted at `info!` level, failures and repairs at `warn!`
//! (configurable via `STRATA_LOG`). For JSON output, set `STRATA_LOG_FORMAT=json`.

use strata_state::NodeId;
use tracing::{info, warn};

/// RAII guard that enters a history-scoped span for the duration of an operation.
///
/// # Example
///
/// ```ignore
/// let _span = HistorySpan::enter(&history_id, "checkin");
/// // tracing calls below carry history_id and op
/// ```
pub struct HistorySpan {
    _span: tracing::span::EnteredSpan,
}

impl HistorySpan {
    pub fn enter(history_id: &NodeId, op: &'static str) -> Self {
        let span = tracing::info_span!("strata.history", history_id = %history_id, op = op);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: history loaded into a fresh cache.
pub fn emit_history_loaded(history_id: &NodeId, versions: usize, labels: usize) {
    info!(
        event = "history.loaded",
        history_id = %history_id,
        versions = versions,
        labels = labels,
    );
}

/// Emit event: cache re-synchronised with persisted state.
pub fn emit_history_reloaded(
    history_id: &NodeId,
    reused: usize,
    created: usize,
    invalidated: usize,
) {
    info!(
        event = "history.reloaded",
        history_id = %history_id,
        reused = reused,
        created = created,
        invalidated = invalidated,
    );
}

/// Emit event: new version checked in.
pub fn emit_version_created(history_id: &NodeId, name: &str, predecessors: usize) {
    info!(
        event = "version.created",
        history_id = %history_id,
        name = %name,
        predecessors = predecessors,
    );
}

/// Emit event: version removed and its neighbours reconnected.
pub fn emit_version_removed(history_id: &NodeId, name: &str, rewired: usize) {
    info!(
        event = "version.removed",
        history_id = %history_id,
        name = %name,
        rewired = rewired,
    );
}

/// Emit event: label assigned, moved or removed.
pub fn emit_label_set(history_id: &NodeId, label: &str, from: Option<&str>, to: Option<&str>) {
    info!(
        event = "label.moved",
        history_id = %history_id,
        label = %label,
        from = from.unwrap_or("-"),
        to = to.unwrap_or("-"),
    );
}

/// Emit event: successor links derived for a legacy history (warn level).
pub fn emit_legacy_successors_derived(history_id: &NodeId, edges: usize) {
    warn!(
        event = "legacy.successors_derived",
        history_id = %history_id,
        edges = edges,
    );
}

/// Emit event: persisted label points at a version that does not exist (warn level).
pub fn emit_label_unresolved(history_id: &NodeId, label: &str, target: &NodeId) {
    warn!(
        event = "label.unresolved",
        history_id = %history_id,
        label = %label,
        target = %target,
    );
}

/// Emit event: a mutation failed after persistence began (warn level).
pub fn emit_persist_failed(history_id: &NodeId, op: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "history.persist_failed",
        history_id = %history_id,
        op = %op,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_span_enter() {
        let _span = HistorySpan::enter(&NodeId::new(), "test");
    }
}
