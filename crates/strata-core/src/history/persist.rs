//! Writing version containers through the persisted-node adapter.
//!
//! These helpers only stage changes; callers decide when to commit.

use chrono::{DateTime, Utc};
use strata_state::{NodeId, NodeStore, NodeType, PropertyValue, StorageResult};

use super::schema;
use crate::domain::snapshot::FrozenPayload;

/// A version container about to be written.
pub(crate) struct NewVersion<'a> {
    pub id: NodeId,
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
    pub predecessors: &'a [NodeId],
    pub frozen: &'a FrozenPayload,
}

pub(crate) fn write_version<S: NodeStore + ?Sized>(
    store: &S,
    history_id: &NodeId,
    version: &NewVersion<'_>,
) -> StorageResult<()> {
    let id = store.add_child(history_id, version.name, NodeType::Version, Some(version.id))?;
    store.set_property(&id, schema::CREATED, PropertyValue::Date(version.created_at))?;
    write_links(store, &id, version.predecessors, &[])?;

    let frozen = store.add_child(&id, schema::FROZEN_NODE, NodeType::FrozenNode, None)?;
    let payload = version.frozen;
    store.set_property(
        &frozen,
        schema::FROZEN_ID,
        PropertyValue::String(payload.source_id.to_string()),
    )?;
    store.set_property(
        &frozen,
        schema::FROZEN_PRIMARY_TYPE,
        PropertyValue::String(payload.primary_type.clone()),
    )?;
    store.set_property(
        &frozen,
        schema::FROZEN_DIGEST,
        PropertyValue::String(payload.digest.clone()),
    )?;
    if !payload.is_empty() {
        store.set_property(
            &frozen,
            schema::FROZEN_CONTENT,
            PropertyValue::Binary(payload.content.clone()),
        )?;
    }
    Ok(())
}

pub(crate) fn write_links<S: NodeStore + ?Sized>(
    store: &S,
    id: &NodeId,
    predecessors: &[NodeId],
    successors: &[NodeId],
) -> StorageResult<()> {
    store.set_property(
        id,
        schema::PREDECESSORS,
        PropertyValue::References(predecessors.to_vec()),
    )?;
    store.set_property(
        id,
        schema::SUCCESSORS,
        PropertyValue::References(successors.to_vec()),
    )
}
