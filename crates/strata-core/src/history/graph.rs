//! Version graph arena.
//!
//! Versions are stored by id. Every edge operation updates both endpoints in
//! the same call, so `s ∈ successors(p) ⟺ p ∈ predecessors(s)` holds after
//! each public method returns.

use std::collections::{BTreeSet, HashMap};

use strata_state::NodeId;

use super::version::Version;

/// Rewired predecessor/successor sets of a version adjacent to one being excised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NeighbourLinks {
    pub id: NodeId,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct VersionGraph {
    nodes: HashMap<NodeId, Version>,
    by_name: HashMap<String, NodeId>,
}

impl VersionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Version> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Version> {
        self.by_name.get(name).and_then(|id| self.nodes.get(id))
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.nodes.values()
    }

    /// Insert a version whose links were read from storage as-is.
    pub fn insert_loaded(&mut self, version: Version) {
        let name = version.state().name.clone();
        self.by_name.insert(name, version.id());
        self.nodes.insert(version.id(), version);
    }

    /// Hand all versions over to the caller, leaving the graph empty.
    pub fn take_all(&mut self) -> HashMap<NodeId, Version> {
        self.by_name.clear();
        std::mem::take(&mut self.nodes)
    }

    /// Add `succ` as a successor of `pred`, and `pred` as a predecessor of `succ`.
    pub fn link(&self, pred: &NodeId, succ: &NodeId) {
        if let (Some(p), Some(s)) = (self.nodes.get(pred), self.nodes.get(succ)) {
            p.state_mut().successors.insert(*succ);
            s.state_mut().predecessors.insert(*pred);
        }
    }

    /// Remove the edge `pred -> succ` from both endpoints.
    pub fn unlink(&self, pred: &NodeId, succ: &NodeId) {
        if let Some(p) = self.nodes.get(pred) {
            p.state_mut().successors.remove(succ);
        }
        if let Some(s) = self.nodes.get(succ) {
            s.state_mut().predecessors.remove(pred);
        }
    }

    /// Insert a new version below `predecessors`.
    ///
    /// All predecessors must already be in the graph.
    pub fn attach(&mut self, version: Version, predecessors: &[NodeId]) {
        {
            let mut state = version.state_mut();
            state.predecessors.clear();
            state.successors.clear();
        }
        let id = version.id();
        self.insert_loaded(version);
        for pred in predecessors {
            self.link(pred, &id);
        }
    }

    /// Compute the link sets every neighbour of `id` ends up with once `id`
    /// is excised: predecessors adopt its successors and vice versa.
    pub fn excise_plan(&self, id: &NodeId) -> Vec<NeighbourLinks> {
        let Some(version) = self.nodes.get(id) else {
            return Vec::new();
        };
        let (preds, succs) = {
            let state = version.state();
            (state.predecessors.clone(), state.successors.clone())
        };

        let mut plan = Vec::new();
        for neighbour in preds.union(&succs) {
            let Some(n) = self.nodes.get(neighbour) else {
                continue;
            };
            let state = n.state();
            let mut predecessors: BTreeSet<NodeId> = state.predecessors.clone();
            let mut successors: BTreeSet<NodeId> = state.successors.clone();
            if preds.contains(neighbour) {
                successors.remove(id);
                successors.extend(succs.iter().copied());
            }
            if succs.contains(neighbour) {
                predecessors.remove(id);
                predecessors.extend(preds.iter().copied());
            }
            plan.push(NeighbourLinks {
                id: *neighbour,
                predecessors: predecessors.into_iter().collect(),
                successors: successors.into_iter().collect(),
            });
        }
        plan
    }

    /// Remove `id` from the graph, reconnecting each of its predecessors to
    /// each of its successors.
    pub fn excise(&mut self, id: &NodeId) -> Option<Version> {
        let (preds, succs) = {
            let version = self.nodes.get(id)?;
            let state = version.state();
            (state.predecessors.clone(), state.successors.clone())
        };

        for p in &preds {
            for s in &succs {
                self.link(p, s);
            }
        }
        for p in &preds {
            self.unlink(p, id);
        }
        for s in &succs {
            self.unlink(id, s);
        }

        let version = self.nodes.remove(id)?;
        self.by_name.retain(|_, v| *v != *id);
        Some(version)
    }

    /// Rebuild successor sets from predecessor sets.
    ///
    /// Repairs histories persisted before successors were recorded. Returns
    /// the number of edges that were missing. Running it on a consistent
    /// graph changes nothing.
    pub fn derive_successors(&self) -> usize {
        let mut added = 0;
        for version in self.nodes.values() {
            let preds: Vec<NodeId> = version.state().predecessors.iter().copied().collect();
            for pred in preds {
                if let Some(p) = self.nodes.get(&pred) {
                    if p.state_mut().successors.insert(version.id()) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    /// Versions without successors.
    pub fn heads(&self) -> Vec<Version> {
        self.nodes
            .values()
            .filter(|v| v.state().successors.is_empty())
            .cloned()
            .collect()
    }

    /// Check edge symmetry, dangling references and acyclicity.
    pub fn verify(&self, root: &NodeId) -> std::result::Result<(), String> {
        let root_version = self
            .nodes
            .get(root)
            .ok_or_else(|| format!("root version {} not cached", root))?;
        if !root_version.state().predecessors.is_empty() {
            return Err("root version has predecessors".to_string());
        }

        for (id, version) in &self.nodes {
            let state = version.state();
            if id != root && state.predecessors.is_empty() {
                return Err(format!("version {} has no predecessors", state.name));
            }
            for pred in &state.predecessors {
                let p = self
                    .nodes
                    .get(pred)
                    .ok_or_else(|| format!("{} has unknown predecessor {}", state.name, pred))?;
                if !p.state().successors.contains(id) {
                    return Err(format!("edge {} -> {} missing successor side", pred, id));
                }
            }
            for succ in &state.successors {
                let s = self
                    .nodes
                    .get(succ)
                    .ok_or_else(|| format!("{} has unknown successor {}", state.name, succ))?;
                if !s.state().predecessors.contains(id) {
                    return Err(format!("edge {} -> {} missing predecessor side", id, succ));
                }
            }
        }

        self.check_acyclic()
    }

    /// Kahn's algorithm over successor edges.
    fn check_acyclic(&self) -> std::result::Result<(), String> {
        let mut in_degree: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .map(|(id, v)| (*id, v.state().predecessors.len()))
            .collect();
        let mut ready: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut visited = 0;
        while let Some(id) = ready.pop() {
            visited += 1;
            let succs: Vec<NodeId> = self.nodes[&id].state().successors.iter().copied().collect();
            for succ in succs {
                if let Some(d) = in_degree.get_mut(&succ) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(succ);
                    }
                }
            }
        }

        if visited == self.nodes.len() {
            Ok(())
        } else {
            Err("version graph contains a cycle".to_string())
        }
    }
}
