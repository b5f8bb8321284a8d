//! Strata-State: Persisted-Node Storage for Strata
//!
//! This crate provides the persistence layer the version history is built
//! on: a tree of typed nodes carrying named properties, with stable node
//! identity and explicit commit.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: stable identity, atomic commit, subtree removal.
//!
//! ## Key Components
//!
//! - `NodeStore`: the adapter trait the version history talks to
//! - `FsNodeStore`: committed tree stored as one JSON document
//! - `fakes::MemoryNodeStore`: in-memory sessions over a shared tree

mod config;
mod error;
pub mod fakes;
mod fs_store;
mod schema;
pub mod storage_traits;
pub mod tree;

pub use config::{StoreConfig, DEFAULT_STORE_FILE};
pub use error::StorageError;
pub use fs_store::FsNodeStore;
pub use schema::{ChildNode, NodeId, NodeRecord, NodeType, PropertyValue};
pub use storage_traits::{NodeInfo, NodeStore, StorageResult};
