//! Version labels.
//!
//! A label names exactly one version at a time. The table and the labelled
//! version's own label set are always updated together.

use std::collections::BTreeMap;

use strata_state::{NodeId, NodeStore, PropertyValue};
use tracing::debug;

use super::graph::VersionGraph;
use super::version::Version;
use super::VersionHistory;
use crate::domain::error::{HistoryError, Result};
use crate::obs;

#[derive(Debug, Default)]
pub(crate) struct LabelTable {
    by_label: BTreeMap<String, NodeId>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<NodeId> {
        self.by_label.get(label).copied()
    }

    pub fn labels(&self) -> Vec<String> {
        self.by_label.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Bind an unbound label to `version`.
    pub fn bind(&mut self, label: &str, version: &Version) {
        debug_assert!(!self.by_label.contains_key(label));
        self.by_label.insert(label.to_string(), version.id());
        version.state_mut().labels.insert(label.to_string());
    }

    /// Unbind `label` from `version`.
    pub fn unbind(&mut self, label: &str, version: &Version) {
        self.by_label.remove(label);
        version.state_mut().labels.remove(label);
    }

    pub fn verify(&self, graph: &VersionGraph) -> std::result::Result<(), String> {
        for (label, id) in &self.by_label {
            let version = graph
                .get(id)
                .ok_or_else(|| format!("label {} points at unknown version {}", label, id))?;
            if !version.state().labels.contains(label) {
                return Err(format!("label {} missing on version {}", label, id));
            }
        }
        for version in graph.versions() {
            for label in &version.state().labels {
                if self.by_label.get(label) != Some(&version.id()) {
                    return Err(format!(
                        "version {} carries label {} not in table",
                        version.id(),
                        label
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<S: NodeStore> VersionHistory<S> {
    /// Assign `label` to the version named `version_name`, or remove it when
    /// `version_name` is `None`.
    ///
    /// A label held by a different version (including removal with `None`)
    /// is only taken over when `move_label` is set. Returns the version that
    /// previously held the label.
    pub fn set_label(
        &mut self,
        version_name: Option<&str>,
        label: &str,
        move_label: bool,
    ) -> Result<Option<Version>> {
        if label.is_empty() {
            return Err(HistoryError::InvalidName {
                name: label.to_string(),
                reason: "label must not be empty".to_string(),
            });
        }

        let target = match version_name {
            Some(name) => Some(self.graph.by_name(name).cloned().ok_or_else(|| {
                HistoryError::LabelTarget {
                    name: name.to_string(),
                }
            })?),
            None => None,
        };
        let prev = self
            .labels
            .get(label)
            .and_then(|id| self.graph.get(&id))
            .cloned();

        match (&prev, &target) {
            (None, None) => return Ok(None),
            (Some(p), Some(t)) if p.id() == t.id() => return Ok(Some(t.clone())),
            (Some(p), _) if !move_label => {
                return Err(HistoryError::LabelConflict {
                    label: label.to_string(),
                    holder: p.state().name.clone(),
                })
            }
            _ => {}
        }

        let labels_node = self.labels_node_id;
        let target_id = target.as_ref().map(Version::id);
        self.persist("set_label", |store| {
            match target_id {
                Some(id) => store.set_property(&labels_node, label, PropertyValue::Reference(id))?,
                None => {
                    store.remove_property(&labels_node, label)?;
                }
            }
            store.commit()?;
            Ok(())
        })?;

        if let Some(p) = &prev {
            self.labels.unbind(label, p);
        }
        if let Some(t) = &target {
            self.labels.bind(label, t);
        }
        debug!(label, moved = prev.is_some(), "Label table updated");
        obs::emit_label_set(
            &self.history_id,
            label,
            prev.as_ref().map(|p| p.state().name.clone()).as_deref(),
            version_name,
        );
        Ok(prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::FrozenPayload;
    use crate::history::version::VersionRecord;
    use chrono::Utc;

    fn version(name: &str) -> Version {
        Version::from_record(VersionRecord {
            id: NodeId::new(),
            name: name.to_string(),
            created_at: Utc::now(),
            predecessors: vec![],
            successors: vec![],
            frozen: FrozenPayload::empty(NodeId::new(), "doc"),
            is_root: true,
        })
    }

    #[test]
    fn bind_and_unbind_update_both_sides() {
        let mut graph = VersionGraph::new();
        let v = version("root");
        graph.insert_loaded(v.clone());
        let mut table = LabelTable::new();

        table.bind("stable", &v);
        assert_eq!(table.get("stable"), Some(v.id()));
        assert!(v.has_label("stable").unwrap());
        assert!(table.verify(&graph).is_ok());

        table.unbind("stable", &v);
        assert_eq!(table.get("stable"), None);
        assert!(v.labels().unwrap().is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn verify_flags_one_sided_label() {
        let mut graph = VersionGraph::new();
        let v = version("root");
        graph.insert_loaded(v.clone());
        v.state_mut().labels.insert("orphan".to_string());

        let table = LabelTable::new();
        assert!(table.verify(&graph).is_err());
    }
}
