use std::collections::BTreeSet;

use chrono::Utc;
use strata_state::{NodeId, NodeStore};

use super::persist::{self, NewVersion};
use super::schema;
use super::version::{Version, VersionRecord};
use super::VersionHistory;
use crate::domain::error::{HistoryError, Result};
use crate::domain::snapshot::SourceItem;
use crate::obs::{self, HistorySpan};

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "version name must not be empty"
    } else if schema::is_reserved(name) {
        "name is reserved"
    } else if name.contains('/') {
        "version name must not contain '/'"
    } else {
        return Ok(());
    };
    Err(HistoryError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

impl<S: NodeStore> VersionHistory<S> {
    /// Check in the current state of `item` as a new version called `name`.
    ///
    /// The new version descends from the item's declared predecessors, all
    /// of which must be versions of this history.
    pub fn checkin(&mut self, name: &str, item: &dyn SourceItem) -> Result<Version> {
        let _span = HistorySpan::enter(&self.history_id, "checkin");

        validate_name(name)?;
        if self.graph.by_name(name).is_some() {
            return Err(HistoryError::VersionExists {
                name: name.to_string(),
            });
        }
        if item.id() != self.versionable_id {
            return Err(HistoryError::consistency(format!(
                "item {} is not versioned by history {}",
                item.id(),
                self.history_id
            )));
        }

        let predecessors: Vec<NodeId> = item
            .predecessors()
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if predecessors.is_empty() {
            return Err(HistoryError::consistency(
                "invalid predecessor: none declared",
            ));
        }
        if let Some(missing) = predecessors.iter().find(|p| !self.graph.contains(p)) {
            return Err(HistoryError::consistency(format!(
                "invalid predecessor {}",
                missing
            )));
        }

        let frozen = self.ctx.writer.capture(item)?;
        let id = NodeId::new();
        let created_at = Utc::now();

        // Predecessor links as they will be persisted, with the new successor added.
        let neighbours: Vec<(NodeId, Vec<NodeId>, Vec<NodeId>)> = predecessors
            .iter()
            .filter_map(|p| self.graph.get(p))
            .map(|p| {
                let state = p.state();
                let mut successors = state.successors.clone();
                successors.insert(id);
                (
                    p.id(),
                    state.predecessors.iter().copied().collect(),
                    successors.into_iter().collect(),
                )
            })
            .collect();

        let history_id = self.history_id;
        self.persist("checkin", |store| {
            persist::write_version(
                store,
                &history_id,
                &NewVersion {
                    id,
                    name,
                    created_at,
                    predecessors: &predecessors,
                    frozen: &frozen,
                },
            )?;
            for (pred, pred_preds, pred_succs) in &neighbours {
                persist::write_links(store, pred, pred_preds, pred_succs)?;
            }
            store.commit()?;
            Ok(())
        })?;

        let version = Version::from_record(VersionRecord {
            id,
            name: name.to_string(),
            created_at,
            predecessors: Vec::new(),
            successors: Vec::new(),
            frozen,
            is_root: false,
        });
        self.graph.attach(version.clone(), &predecessors);
        self.ctx.lifecycle.version_created(&version);
        obs::emit_version_created(&self.history_id, name, predecessors.len());
        Ok(version)
    }
}
