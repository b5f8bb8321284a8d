use strata_state::NodeStore;
use tracing::debug;

use super::persist;
use super::VersionHistory;
use crate::domain::error::{HistoryError, Result};
use crate::obs::{self, HistorySpan};

impl<S: NodeStore> VersionHistory<S> {
    /// Remove the version called `name`.
    ///
    /// Its labels are dropped and every predecessor is linked to every
    /// successor, so ancestry through the removed version is kept. The root
    /// version and versions referenced from outside version storage cannot
    /// be removed. The removed handle becomes invalid.
    pub fn remove_version(&mut self, name: &str) -> Result<()> {
        let _span = HistorySpan::enter(&self.history_id, "remove_version");

        let version = self.version(name)?;
        if version.id() == self.root_id {
            return Err(HistoryError::RemovalForbidden {
                name: name.to_string(),
            });
        }
        let referrers = self.ctx.lifecycle.external_references(&version);
        if !referrers.is_empty() {
            return Err(HistoryError::ReferentialIntegrity {
                name: name.to_string(),
                referrers,
            });
        }

        let labels: Vec<String> = version.state().labels.iter().cloned().collect();
        let plan = self.graph.excise_plan(&version.id());

        let history_id = self.history_id;
        let labels_node = self.labels_node_id;
        self.persist("remove_version", |store| {
            for label in &labels {
                store.remove_property(&labels_node, label)?;
            }
            for links in &plan {
                persist::write_links(store, &links.id, &links.predecessors, &links.successors)?;
            }
            store.remove_child(&history_id, name)?;
            store.commit()?;
            Ok(())
        })?;

        for label in &labels {
            self.labels.unbind(label, &version);
        }
        self.graph.excise(&version.id());
        debug!(name, labels = labels.len(), neighbours = plan.len(), "Excised version");

        self.ctx.lifecycle.version_destroyed(&version);
        version.invalidate();
        obs::emit_version_removed(&self.history_id, name, plan.len());
        Ok(())
    }
}
