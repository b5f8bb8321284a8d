//! Filesystem-backed node store.
//!
//! The committed tree lives in a single JSON document. `commit` writes the
//! working copy atomically (temp file in the same directory, then rename);
//! `refresh` re-reads the document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::schema::{ChildNode, NodeId, NodeType, PropertyValue};
use crate::storage_traits::{NodeInfo, NodeStore, StorageResult};
use crate::tree::NodeTree;

/// Node store persisted as one JSON file.
#[derive(Debug)]
pub struct FsNodeStore {
    path: PathBuf,
    working: Mutex<NodeTree>,
}

impl FsNodeStore {
    /// Open the store described by `config`, creating its directory if needed.
    ///
    /// A missing store file is initialised with a tree holding only the root.
    #[instrument(skip_all, fields(path = %config.store_path().display()))]
    pub fn open(config: &StoreConfig) -> StorageResult<Self> {
        fs::create_dir_all(config.root())?;
        let path = config.store_path();
        let tree = match read_tree(&path)? {
            Some(tree) => tree,
            None => {
                let tree = NodeTree::new();
                write_tree(&path, &tree)?;
                info!("Initialised new node store");
                tree
            }
        };
        info!(nodes = tree.len(), "Opened node store");
        Ok(Self {
            path,
            working: Mutex::new(tree),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_tree(path: &Path) -> StorageResult<Option<NodeTree>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_tree(path: &Path, tree: &NodeTree) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(tree)?;

    // Atomic write: temp file in the same directory, then rename.
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl NodeStore for FsNodeStore {
    fn root_id(&self) -> NodeId {
        self.working.lock().root_id()
    }

    fn node(&self, id: &NodeId) -> StorageResult<NodeInfo> {
        let tree = self.working.lock();
        let record = tree.get(id)?;
        Ok(NodeInfo {
            id: record.id,
            name: record.name.clone(),
            node_type: record.node_type,
            parent: record.parent,
        })
    }

    fn property(&self, id: &NodeId, name: &str) -> StorageResult<Option<PropertyValue>> {
        self.working.lock().property(id, name)
    }

    fn properties(&self, id: &NodeId) -> StorageResult<Vec<(String, PropertyValue)>> {
        self.working.lock().properties(id)
    }

    fn child_nodes(&self, id: &NodeId) -> StorageResult<Vec<ChildNode>> {
        self.working.lock().child_nodes(id)
    }

    fn child(&self, id: &NodeId, name: &str) -> StorageResult<Option<ChildNode>> {
        self.working.lock().child(id, name)
    }

    fn add_child(
        &self,
        parent: &NodeId,
        name: &str,
        node_type: NodeType,
        explicit_id: Option<NodeId>,
    ) -> StorageResult<NodeId> {
        self.working
            .lock()
            .add_child(parent, name, node_type, explicit_id)
    }

    fn remove_child(&self, parent: &NodeId, name: &str) -> StorageResult<()> {
        self.working.lock().remove_child(parent, name)
    }

    fn set_property(&self, id: &NodeId, name: &str, value: PropertyValue) -> StorageResult<()> {
        self.working.lock().set_property(id, name, value)
    }

    fn remove_property(&self, id: &NodeId, name: &str) -> StorageResult<bool> {
        self.working.lock().remove_property(id, name)
    }

    fn commit(&self) -> StorageResult<()> {
        let working = self.working.lock();
        write_tree(&self.path, &working)?;
        debug!(path = %self.path.display(), nodes = working.len(), "Committed node store");
        Ok(())
    }

    fn refresh(&self) -> StorageResult<()> {
        let tree = read_tree(&self.path)?.ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("store file vanished: {}", self.path.display()),
            ))
        })?;
        *self.working.lock() = tree;
        Ok(())
    }
}
