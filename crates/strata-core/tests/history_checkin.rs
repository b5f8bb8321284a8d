//! Integration tests for creating, loading and checking in to a version history.

use std::sync::Arc;

use serde_json::json;
use strata_core::fakes::{FailingWriter, RecordingLifecycle};
use strata_core::history::schema;
use strata_core::{
    HistoryConfig, HistoryContext, HistoryError, SourceItem, VersionHistory, WorkItem,
};
use strata_state::fakes::MemoryNodeStore;
use strata_state::{NodeId, NodeStore};

struct Fixture {
    history: VersionHistory<Arc<MemoryNodeStore>>,
    store: Arc<MemoryNodeStore>,
    lifecycle: Arc<RecordingLifecycle>,
    item: WorkItem,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryNodeStore::new());
    let lifecycle = Arc::new(RecordingLifecycle::new());
    let item = WorkItem::new(NodeId::new(), "doc").with_state(json!({"title": "draft"}));
    let history = VersionHistory::create(
        Arc::clone(&store),
        &store.root_id(),
        "doc-history",
        &item,
        HistoryContext::new(lifecycle.clone()),
    )
    .expect("create history");
    Fixture {
        history,
        store,
        lifecycle,
        item,
    }
}

fn item_after(base: &WorkItem, preds: &[NodeId], state: serde_json::Value) -> WorkItem {
    base
        .clone()
        .with_predecessors(preds.iter().copied())
        .with_state(state)
}

#[test]
fn fresh_history_has_only_root() {
    let f = fixture();
    let root = f.history.root_version().unwrap();

    assert_eq!(f.history.num_versions(), 1);
    assert!(root.is_root().unwrap());
    assert!(root.predecessors().unwrap().is_empty());
    assert!(root.successors().unwrap().is_empty());
    assert!(root.frozen().unwrap().is_empty());
    assert_eq!(root.name().unwrap(), schema::ROOT_VERSION);
    assert_eq!(f.history.versionable_id(), f.item.id());
    assert!(f.history.version_labels().is_empty());
    assert!(f.history.check_invariants().is_ok());
    assert_eq!(f.lifecycle.created(), vec![root.id()]);
    assert!(!f.store.has_pending_changes());
}

#[test]
fn checkin_on_root_links_both_sides() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let item = item_after(&f.item, &[root.id()], json!({"title": "first"}));

    let v1 = f.history.checkin("1.0", &item).unwrap();

    assert_eq!(v1.predecessors().unwrap(), vec![root.id()]);
    assert!(v1.successors().unwrap().is_empty());
    assert!(root.successors().unwrap().contains(&v1.id()));
    assert_eq!(f.history.num_versions(), 2);
    assert!(f.history.has_version("1.0"));
    assert!(f.history.has_version_id(&v1.id()));
    assert!(f.history.version("1.0").unwrap().is_same(&v1));
    assert!(f.history.version_by_id(&v1.id()).unwrap().is_same(&v1));
    assert!(f.history.check_invariants().is_ok());

    let frozen = v1.frozen().unwrap();
    assert_eq!(frozen.source_id, f.item.id());
    assert_eq!(frozen.content, br#"{"title":"first"}"#.to_vec());
    assert!(frozen.verify());

    assert_eq!(f.lifecycle.created().last(), Some(&v1.id()));
    assert!(!f.store.has_pending_changes());
}

#[test]
fn checkin_is_persisted() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let v1 = f
        .history
        .checkin("1.0", &item_after(&f.item, &[root.id()], json!(1)))
        .unwrap();

    let reopened = VersionHistory::load(
        f.store.session(),
        &f.history.history_id(),
        HistoryContext::default(),
    )
    .unwrap();

    let loaded = reopened.version("1.0").unwrap();
    assert_eq!(loaded.id(), v1.id());
    assert!(!loaded.is_same(&v1));
    assert_eq!(loaded.predecessors().unwrap(), vec![root.id()]);
    assert_eq!(
        reopened.root_version().unwrap().successors().unwrap(),
        vec![v1.id()]
    );
    assert_eq!(loaded.frozen().unwrap(), v1.frozen().unwrap());
    assert_eq!(loaded.created_at().unwrap(), v1.created_at().unwrap());
    assert!(reopened.check_invariants().is_ok());
}

#[test]
fn merge_checkin_with_two_predecessors() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let a = f
        .history
        .checkin("a", &item_after(&f.item, &[root.id()], json!("a")))
        .unwrap();
    let b = f
        .history
        .checkin("b", &item_after(&f.item, &[root.id()], json!("b")))
        .unwrap();
    let m = f
        .history
        .checkin("m", &item_after(&f.item, &[a.id(), b.id(), a.id()], json!("m")))
        .unwrap();

    let mut preds = m.predecessors().unwrap();
    preds.sort();
    let mut expected = vec![a.id(), b.id()];
    expected.sort();
    assert_eq!(preds, expected);
    assert_eq!(a.successors().unwrap(), vec![m.id()]);
    assert_eq!(b.successors().unwrap(), vec![m.id()]);
    assert_eq!(root.successors().unwrap().len(), 2);

    let heads = f.history.heads();
    assert_eq!(heads.len(), 1);
    assert!(heads[0].is_same(&m));
    assert!(f.history.check_invariants().is_ok());
}

#[test]
fn unknown_predecessor_leaves_cache_unchanged() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let commits = f.store.commit_count();

    let err = f
        .history
        .checkin("1.0", &item_after(&f.item, &[root.id(), NodeId::new()], json!(1)))
        .unwrap_err();

    assert!(matches!(err, HistoryError::Consistency(ref m) if m.contains("invalid predecessor")));
    assert_eq!(f.history.num_versions(), 1);
    assert!(root.successors().unwrap().is_empty());
    assert_eq!(f.store.commit_count(), commits);
    assert!(!f.store.has_pending_changes());
}

#[test]
fn checkin_without_predecessors_fails() {
    let mut f = fixture();
    let err = f
        .history
        .checkin("1.0", &item_after(&f.item, &[], json!(1)))
        .unwrap_err();
    assert!(matches!(err, HistoryError::Consistency(_)));
    assert_eq!(f.history.num_versions(), 1);
}

#[test]
fn duplicate_and_reserved_names_rejected() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let item = item_after(&f.item, &[root.id()], json!(1));
    f.history.checkin("1.0", &item).unwrap();

    assert!(matches!(
        f.history.checkin("1.0", &item),
        Err(HistoryError::VersionExists { ref name }) if name == "1.0"
    ));
    assert!(matches!(
        f.history.checkin(schema::ROOT_VERSION, &item),
        Err(HistoryError::InvalidName { .. })
    ));
    assert!(matches!(
        f.history.checkin("", &item),
        Err(HistoryError::InvalidName { .. })
    ));
    assert_eq!(f.history.num_versions(), 2);
}

#[test]
fn foreign_item_rejected() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let stranger = WorkItem::new(NodeId::new(), "doc").with_predecessors([root.id()]);

    let err = f.history.checkin("1.0", &stranger).unwrap_err();
    assert!(matches!(err, HistoryError::Consistency(_)));
}

#[test]
fn commit_failure_discards_staged_changes() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    f.store.fail_next_commit();

    let err = f
        .history
        .checkin("1.0", &item_after(&f.item, &[root.id()], json!(1)))
        .unwrap_err();

    assert!(matches!(err, HistoryError::Storage(_)));
    assert_eq!(f.history.num_versions(), 1);
    assert!(root.successors().unwrap().is_empty());
    assert!(!f.store.has_pending_changes());
    assert!(f.store.child(&f.history.history_id(), "1.0").unwrap().is_none());

    // The history is still usable afterwards.
    f.history
        .checkin("1.0", &item_after(&f.item, &[root.id()], json!(1)))
        .unwrap();
    assert!(f.history.check_invariants().is_ok());
}

#[test]
fn snapshot_failure_happens_before_persistence() {
    let store = Arc::new(MemoryNodeStore::new());
    let item = WorkItem::new(NodeId::new(), "doc");
    let ctx = HistoryContext::default().with_writer(Arc::new(FailingWriter));
    let mut history =
        VersionHistory::create(Arc::clone(&store), &store.root_id(), "h", &item, ctx).unwrap();
    let root = history.root_version().unwrap();
    let commits = store.commit_count();

    let err = history
        .checkin("1.0", &item.clone().with_predecessors([root.id()]))
        .unwrap_err();

    assert!(matches!(err, HistoryError::Snapshot(_)));
    assert_eq!(store.commit_count(), commits);
    assert_eq!(history.num_versions(), 1);
}

#[test]
fn versions_listed_oldest_first() {
    let mut f = fixture();
    let root = f.history.root_version().unwrap();
    let a = f
        .history
        .checkin("a", &item_after(&f.item, &[root.id()], json!(1)))
        .unwrap();
    f.history
        .checkin("b", &item_after(&f.item, &[a.id()], json!(2)))
        .unwrap();

    let names: Vec<String> = f
        .history
        .versions()
        .iter()
        .map(|v| v.name().unwrap())
        .collect();
    assert_eq!(names, vec![schema::ROOT_VERSION, "a", "b"]);
}

#[test]
fn version_lookup_failures() {
    let f = fixture();
    assert!(matches!(
        f.history.version("nope"),
        Err(HistoryError::VersionNotFound { .. })
    ));
    assert!(f.history.version_by_id(&NodeId::new()).is_err());
    assert!(!f.history.has_version("nope"));
}

#[test]
fn load_rejects_non_history_node() {
    let store = MemoryNodeStore::new();
    let err = VersionHistory::load(store.session(), &store.root_id(), HistoryContext::default())
        .err()
        .unwrap();
    assert!(matches!(err, HistoryError::Consistency(_)));
}

#[test]
fn create_under_taken_name_fails_cleanly() {
    let f = fixture();
    let err = VersionHistory::create(
        Arc::clone(&f.store),
        &f.store.root_id(),
        "doc-history",
        &f.item,
        HistoryContext::default().with_config(HistoryConfig::default()),
    )
    .err()
    .unwrap();
    assert!(matches!(err, HistoryError::Storage(_)));
    assert!(!f.store.has_pending_changes());
}
