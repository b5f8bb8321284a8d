//! Reading a version history from the persisted-node adapter.
//!
//! Loading never touches the in-memory cache: it produces a `HistoryImage`
//! which the history then installs. A failed read therefore leaves the
//! current cache as it was.

use std::collections::HashSet;

use strata_state::{NodeId, NodeStore, NodeType, PropertyValue};
use tracing::{debug, warn};

use super::schema;
use super::version::VersionRecord;
use crate::domain::error::{HistoryError, Result};
use crate::domain::snapshot::FrozenPayload;

/// Everything read from one history container.
#[derive(Debug, Clone)]
pub(crate) struct HistoryImage {
    pub versionable_id: NodeId,
    pub labels_node_id: NodeId,
    pub root_id: NodeId,
    pub versions: Vec<VersionRecord>,
    /// Label name and referenced version id, unresolved.
    pub labels: Vec<(String, NodeId)>,
}

pub(crate) fn read_history<S: NodeStore + ?Sized>(
    store: &S,
    history_id: &NodeId,
) -> Result<HistoryImage> {
    let info = store.node(history_id)?;
    if info.node_type != NodeType::VersionHistory {
        return Err(HistoryError::consistency(format!(
            "node {} is a {}, not a version history",
            history_id, info.node_type
        )));
    }

    let versionable_id = read_versionable_id(store, history_id)?;

    let mut labels_node_id = None;
    let mut root_id = None;
    let mut versions = Vec::new();
    for child in store.child_nodes(history_id)? {
        if child.name == schema::LABELS_NODE {
            labels_node_id = Some(child.id);
            continue;
        }
        if child.node_type != NodeType::Version {
            return Err(HistoryError::consistency(format!(
                "unexpected {} child '{}' in version history {}",
                child.node_type, child.name, history_id
            )));
        }
        let is_root = child.name == schema::ROOT_VERSION;
        if is_root {
            root_id = Some(child.id);
        }
        versions.push(read_version(store, &child.id, child.name, is_root)?);
    }

    let labels_node_id = labels_node_id.ok_or_else(|| {
        HistoryError::consistency(format!(
            "version history {} has no label container",
            history_id
        ))
    })?;
    let root_id = root_id.ok_or_else(|| {
        HistoryError::consistency(format!("version history {} has no root version", history_id))
    })?;

    check_references(&versions, &root_id)?;
    let labels = read_labels(store, &labels_node_id)?;

    debug!(
        history = %history_id,
        versions = versions.len(),
        labels = labels.len(),
        "Read version history image"
    );

    Ok(HistoryImage {
        versionable_id,
        labels_node_id,
        root_id,
        versions,
        labels,
    })
}

fn read_versionable_id<S: NodeStore + ?Sized>(store: &S, history_id: &NodeId) -> Result<NodeId> {
    let value = store
        .property(history_id, schema::VERSIONABLE_ID)?
        .ok_or_else(|| {
            HistoryError::consistency(format!(
                "version history {} has no {} property",
                history_id,
                schema::VERSIONABLE_ID
            ))
        })?;
    let raw = value.as_str().ok_or_else(|| {
        HistoryError::consistency(format!("{} must be a string", schema::VERSIONABLE_ID))
    })?;
    raw.parse().map_err(|_| {
        HistoryError::consistency(format!(
            "{} '{}' is not a valid id",
            schema::VERSIONABLE_ID,
            raw
        ))
    })
}

fn read_version<S: NodeStore + ?Sized>(
    store: &S,
    id: &NodeId,
    name: String,
    is_root: bool,
) -> Result<VersionRecord> {
    let created_at = store
        .property(id, schema::CREATED)?
        .and_then(|v| v.as_date())
        .ok_or_else(|| {
            HistoryError::consistency(format!("version {} has no creation date", name))
        })?;

    let predecessors = read_ids(store, id, schema::PREDECESSORS)?;
    let successors = read_ids(store, id, schema::SUCCESSORS)?;
    let frozen = read_frozen(store, id, &name)?;

    Ok(VersionRecord {
        id: *id,
        name,
        created_at,
        predecessors,
        successors,
        frozen,
        is_root,
    })
}

/// Absent link properties read as empty; histories written before successor
/// tracking carry no successor property at all.
fn read_ids<S: NodeStore + ?Sized>(store: &S, id: &NodeId, prop: &str) -> Result<Vec<NodeId>> {
    match store.property(id, prop)? {
        None => Ok(Vec::new()),
        Some(value) => value.as_references().ok_or_else(|| {
            HistoryError::consistency(format!("{} of {} must be references", prop, id))
        }),
    }
}

fn read_frozen<S: NodeStore + ?Sized>(
    store: &S,
    version_id: &NodeId,
    name: &str,
) -> Result<FrozenPayload> {
    let node = store
        .child(version_id, schema::FROZEN_NODE)?
        .ok_or_else(|| HistoryError::consistency(format!("version {} has no frozen node", name)))?;

    let string_prop = |prop: &str| -> Result<String> {
        store
            .property(&node.id, prop)?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| {
                HistoryError::consistency(format!("frozen node of {} lacks {}", name, prop))
            })
    };

    let source_raw = string_prop(schema::FROZEN_ID)?;
    let source_id = source_raw.parse().map_err(|_| {
        HistoryError::consistency(format!("frozen id '{}' of {} is invalid", source_raw, name))
    })?;
    let primary_type = string_prop(schema::FROZEN_PRIMARY_TYPE)?;
    let digest = string_prop(schema::FROZEN_DIGEST)?;
    let content = store
        .property(&node.id, schema::FROZEN_CONTENT)?
        .and_then(|v| v.as_binary().map(<[u8]>::to_vec))
        .unwrap_or_default();

    Ok(FrozenPayload {
        source_id,
        primary_type,
        content,
        digest,
    })
}

fn check_references(versions: &[VersionRecord], root_id: &NodeId) -> Result<()> {
    let known: HashSet<NodeId> = versions.iter().map(|v| v.id).collect();
    for version in versions {
        if version.is_root && !version.predecessors.is_empty() {
            return Err(HistoryError::consistency("root version has predecessors"));
        }
        if version.id != *root_id && version.predecessors.is_empty() {
            return Err(HistoryError::consistency(format!(
                "version {} has no predecessors",
                version.name
            )));
        }
        if let Some(missing) = version.predecessors.iter().find(|p| !known.contains(*p)) {
            return Err(HistoryError::consistency(format!(
                "version {} references unknown predecessor {}",
                version.name, missing
            )));
        }
        if let Some(missing) = version.successors.iter().find(|s| !known.contains(*s)) {
            return Err(HistoryError::consistency(format!(
                "version {} references unknown successor {}",
                version.name, missing
            )));
        }
    }
    Ok(())
}

/// Reference-typed properties of the label container. Anything else is ignored.
fn read_labels<S: NodeStore + ?Sized>(
    store: &S,
    labels_node_id: &NodeId,
) -> Result<Vec<(String, NodeId)>> {
    let mut labels = Vec::new();
    for (name, value) in store.properties(labels_node_id)? {
        match value {
            PropertyValue::Reference(target) => labels.push((name, target)),
            PropertyValue::References(targets) => {
                warn!(label = %name, targets = targets.len(), "Skipping multi-valued label");
            }
            _ => {}
        }
    }
    Ok(labels)
}
