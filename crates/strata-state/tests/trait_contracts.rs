//! Trait contract tests for NodeStore.
//!
//! These tests verify the behavioral contract of the storage trait against
//! both the in-memory fake and the filesystem store. Any conforming
//! implementation must pass these.

use chrono::Utc;
use strata_state::fakes::MemoryNodeStore;
use strata_state::{FsNodeStore, NodeId, NodeStore, NodeType, PropertyValue, StorageError, StoreConfig};

fn check_add_child_uses_explicit_id(store: &dyn NodeStore) {
    let root = store.root_id();
    let wanted = NodeId::new();
    let id = store
        .add_child(&root, "history", NodeType::VersionHistory, Some(wanted))
        .unwrap();
    assert_eq!(id, wanted);

    let info = store.node(&id).unwrap();
    assert_eq!(info.name, "history");
    assert_eq!(info.node_type, NodeType::VersionHistory);
    assert_eq!(info.parent, Some(root));
}

fn check_sibling_names_unique(store: &dyn NodeStore) {
    let root = store.root_id();
    store
        .add_child(&root, "1.0", NodeType::Version, None)
        .unwrap();
    let err = store
        .add_child(&root, "1.0", NodeType::Version, None)
        .unwrap_err();
    assert!(matches!(err, StorageError::ChildExists { .. }));
}

fn check_remove_child_removes_subtree(store: &dyn NodeStore) {
    let root = store.root_id();
    let v = store.add_child(&root, "1.0", NodeType::Version, None).unwrap();
    let frozen = store
        .add_child(&v, "frozenNode", NodeType::FrozenNode, None)
        .unwrap();

    store.remove_child(&root, "1.0").unwrap();
    assert!(matches!(
        store.node(&frozen),
        Err(StorageError::NodeNotFound { .. })
    ));
    assert!(store.child(&root, "1.0").unwrap().is_none());
}

fn check_remove_missing_child_fails(store: &dyn NodeStore) {
    let root = store.root_id();
    let err = store.remove_child(&root, "ghost").unwrap_err();
    assert!(matches!(err, StorageError::ChildNotFound { .. }));
}

fn check_properties_round_trip(store: &dyn NodeStore) {
    let root = store.root_id();
    let now = Utc::now();
    let target = NodeId::new();
    store
        .set_property(&root, "created", PropertyValue::Date(now))
        .unwrap();
    store
        .set_property(&root, "preds", PropertyValue::References(vec![target]))
        .unwrap();

    assert_eq!(
        store.property(&root, "created").unwrap(),
        Some(PropertyValue::Date(now))
    );
    let names: Vec<_> = store
        .properties(&root)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["created".to_string(), "preds".to_string()]);

    assert!(store.remove_property(&root, "preds").unwrap());
    assert!(!store.remove_property(&root, "preds").unwrap());
    assert_eq!(store.property(&root, "preds").unwrap(), None);
}

fn check_refresh_discards_uncommitted(store: &dyn NodeStore) {
    let root = store.root_id();
    store
        .add_child(&root, "kept", NodeType::Unstructured, None)
        .unwrap();
    store.commit().unwrap();
    store
        .add_child(&root, "dropped", NodeType::Unstructured, None)
        .unwrap();
    store.refresh().unwrap();

    assert!(store.child(&root, "kept").unwrap().is_some());
    assert!(store.child(&root, "dropped").unwrap().is_none());
}

fn run_contract(make: impl Fn() -> Box<dyn NodeStore>) {
    check_add_child_uses_explicit_id(make().as_ref());
    check_sibling_names_unique(make().as_ref());
    check_remove_child_removes_subtree(make().as_ref());
    check_remove_missing_child_fails(make().as_ref());
    check_properties_round_trip(make().as_ref());
    check_refresh_discards_uncommitted(make().as_ref());
}

// ===========================================================================
// MemoryNodeStore
// ===========================================================================

#[test]
fn memory_store_satisfies_contract() {
    run_contract(|| Box::new(MemoryNodeStore::new()));
}

#[test]
fn memory_sessions_share_committed_tree() {
    let first = MemoryNodeStore::new();
    let second = first.session();
    assert_eq!(first.root_id(), second.root_id());

    let root = first.root_id();
    first
        .add_child(&root, "shared", NodeType::Unstructured, None)
        .unwrap();
    first.commit().unwrap();

    assert!(second.child(&root, "shared").unwrap().is_none());
    second.refresh().unwrap();
    assert!(second.child(&root, "shared").unwrap().is_some());
}

// ===========================================================================
// FsNodeStore
// ===========================================================================

#[test]
fn fs_store_satisfies_contract() {
    let dirs = std::cell::RefCell::new(Vec::new());
    run_contract(|| {
        let dir = tempfile::tempdir().unwrap();
        let store = FsNodeStore::open(&StoreConfig::new(dir.path())).unwrap();
        dirs.borrow_mut().push(dir);
        Box::new(store)
    });
}

#[test]
fn fs_store_commit_visible_to_second_handle() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());
    let writer = FsNodeStore::open(&config).unwrap();
    let reader = FsNodeStore::open(&config).unwrap();
    let root = writer.root_id();

    writer
        .set_property(&root, "marker", PropertyValue::String("x".into()))
        .unwrap();
    writer.commit().unwrap();

    assert_eq!(reader.property(&root, "marker").unwrap(), None);
    reader.refresh().unwrap();
    assert_eq!(
        reader.property(&root, "marker").unwrap(),
        Some(PropertyValue::String("x".into()))
    );
}
