//! Integration tests for identity-preserving reload.
//!
//! A second session over the same committed tree plays the concurrent actor.

use std::sync::Arc;

use serde_json::json;
use strata_core::fakes::RecordingLifecycle;
use strata_core::history::schema;
use strata_core::{
    HistoryContext, HistoryError, ReloadStats, Version, VersionHistory, WorkItem,
};
use strata_state::fakes::MemoryNodeStore;
use strata_state::{NodeId, NodeStore, PropertyValue};

struct Fixture {
    history: VersionHistory<MemoryNodeStore>,
    other: VersionHistory<MemoryNodeStore>,
    lifecycle: Arc<RecordingLifecycle>,
    item: WorkItem,
}

fn fixture() -> Fixture {
    let store = MemoryNodeStore::new();
    let root_id = store.root_id();
    let lifecycle = Arc::new(RecordingLifecycle::new());
    let item = WorkItem::new(NodeId::new(), "doc");
    let history_store = store.session();
    let history = VersionHistory::create(
        history_store,
        &root_id,
        "h",
        &item,
        HistoryContext::new(lifecycle.clone()),
    )
    .unwrap();
    let other = VersionHistory::load(
        store.session(),
        &history.history_id(),
        HistoryContext::default(),
    )
    .unwrap();
    Fixture {
        history,
        other,
        lifecycle,
        item,
    }
}

fn checkin(
    history: &mut VersionHistory<MemoryNodeStore>,
    item: &WorkItem,
    name: &str,
    preds: &[&Version],
) -> Version {
    let item = item
        .clone()
        .with_predecessors(preds.iter().map(|v| v.id()))
        .with_state(json!(name));
    history.checkin(name, &item).unwrap()
}

#[test]
fn reload_without_changes_keeps_every_handle() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let v1 = checkin(&mut f.history, &f.item, "1.0", &[&root]);

    let stats = f.history.reload().unwrap();

    assert_eq!(
        stats,
        ReloadStats {
            reused: 2,
            created: 0,
            invalidated: 0
        }
    );
    assert!(f.history.version("1.0").unwrap().is_same(&v1));
    assert!(f.history.root_version().unwrap().is_same(&root));
    assert_eq!(root.successors().unwrap(), vec![v1.id()]);
    assert!(f.history.check_invariants().is_ok());
}

#[test]
fn concurrent_removal_invalidates_handle() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let a = checkin(&mut f.history, &f.item, "A", &[&root]);
    let x = checkin(&mut f.history, &f.item, "X", &[&a]);
    let b = checkin(&mut f.history, &f.item, "B", &[&x]);

    f.other.reload().unwrap();
    f.other.remove_version("X").unwrap();

    let stats = f.history.reload().unwrap();
    assert_eq!(stats.reused, 3);
    assert_eq!(stats.invalidated, 1);

    assert!(!x.is_valid());
    assert!(matches!(
        x.predecessors(),
        Err(HistoryError::StaleVersion { id }) if id == x.id()
    ));
    // Stale is distinct from absent.
    assert!(matches!(
        f.history.version("X"),
        Err(HistoryError::VersionNotFound { .. })
    ));

    // Survivors are the same handles with refreshed links.
    assert!(f.history.version("A").unwrap().is_same(&a));
    assert!(f.history.version("B").unwrap().is_same(&b));
    assert_eq!(a.successors().unwrap(), vec![b.id()]);
    assert_eq!(b.predecessors().unwrap(), vec![a.id()]);
    assert!(f.history.check_invariants().is_ok());
}

#[test]
fn concurrent_checkin_appears_after_reload() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();

    f.other.reload().unwrap();
    let other_root = f.other.root_version().unwrap();
    let theirs = checkin(&mut f.other, &f.item, "theirs", &[&other_root]);

    assert!(!f.history.has_version("theirs"));
    let stats = f.history.reload().unwrap();

    assert_eq!(stats.created, 1);
    assert_eq!(stats.reused, 1);
    assert_eq!(f.history.version("theirs").unwrap().id(), theirs.id());
    assert!(f.history.root_version().unwrap().is_same(&root));
    assert_eq!(root.successors().unwrap(), vec![theirs.id()]);
}

#[test]
fn reload_refreshes_labels() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let v1 = checkin(&mut f.history, &f.item, "1.0", &[&root]);
    f.history.set_label(Some("1.0"), "stable", false).unwrap();

    f.other.reload().unwrap();
    f.other.set_label(Some(schema::ROOT_VERSION), "stable", true).unwrap();

    f.history.reload().unwrap();

    assert!(v1.labels().unwrap().is_empty());
    assert!(f.history.version_by_label("stable").unwrap().is_same(&root));
    assert_eq!(root.labels().unwrap(), vec!["stable".to_string()]);
    assert!(f.history.check_invariants().is_ok());
}

#[test]
fn reload_announces_loaded_versions() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let v1 = checkin(&mut f.history, &f.item, "1.0", &[&root]);
    f.lifecycle.reset();

    f.history.reload().unwrap();

    let mut created = f.lifecycle.created();
    created.sort();
    let mut expected = vec![root.id(), v1.id()];
    expected.sort();
    assert_eq!(created, expected);
}

#[test]
fn reload_discards_uncommitted_store_changes() {
    let mut f = fixture();
    let labels_node = f.history.labels_node_id();
    let root = f.history.root_version().unwrap();
    f.history
        .store()
        .set_property(&labels_node, "staged", PropertyValue::Reference(root.id()))
        .unwrap();

    f.history.reload().unwrap();

    assert!(f.history.version_by_label("staged").is_none());
    assert!(!f.history.store().has_pending_changes());
}

#[test]
fn failed_reload_keeps_cache() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let v1 = checkin(&mut f.history, &f.item, "1.0", &[&root]);

    // Break the persisted history from the other session.
    f.other.reload().unwrap();
    let history_id = f.other.history_id();
    f.other
        .store()
        .remove_property(&history_id, schema::VERSIONABLE_ID)
        .unwrap();
    f.other.store().commit().unwrap();

    let err = f.history.reload().unwrap_err();
    assert!(matches!(err, HistoryError::Consistency(_)));
    assert!(v1.is_valid());
    assert!(f.history.version("1.0").unwrap().is_same(&v1));
    assert_eq!(f.history.num_versions(), 2);
}

#[test]
fn shared_history_reloads_under_write_guard() {
    let mut f = fixture();
    let root = f.other.root_version().unwrap();
    checkin(&mut f.other, &f.item, "1.0", &[&root]);

    let shared = f.history.into_shared();
    let reader = {
        let shared = Arc::clone(&shared);
        std::thread::spawn(move || shared.read().num_versions())
    };
    assert!(reader.join().unwrap() >= 1);

    let stats = shared.write().reload().unwrap();
    assert_eq!(stats.created, 1);
    assert!(shared.read().has_version("1.0"));
}
