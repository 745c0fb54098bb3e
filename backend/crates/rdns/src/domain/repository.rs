//! Repository Traits
//!
//! The hierarchical key-value store contract. Implementations are in the
//! infrastructure layer (`infra::etcd`, `infra::memory`).
//!
//! The contract follows the etcd v2 keys model: every key is a slash
//! separated path, a node is either a directory or a leaf holding a string,
//! any node may carry a TTL, and writes can be made conditional on the prior
//! existence of the key.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Store-level result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a key-value store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key (or one of its ancestors) does not exist or has expired
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A conditional write expected the key to exist and it did not
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The key already exists
    #[error("Key already exists: {0}")]
    NodeExists(String),

    /// A leaf operation hit a directory
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// A directory operation hit a leaf
    #[error("Not a directory: {0}")]
    NotADir(String),

    /// The store could not be reached or timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something that does not follow the protocol
    #[error("Store protocol error: {0}")]
    Protocol(String),
}

/// A node of the store tree as returned by reads and writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Node {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
    /// Remaining TTL in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Node {
    /// All nodes below this one in pre-order, following the listing order
    ///
    /// Iterative, so the depth of the tree never grows the call stack.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack: Vec<&Node> = self.nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.nodes.iter().rev());
        }
        out
    }

    /// Direct children that are leaves
    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.dir)
    }
}

/// Options for [`KeyValueStore::get`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Return the whole subtree instead of one level of children
    pub recursive: bool,
    /// Order children by key
    pub sorted: bool,
}

impl GetOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            sorted: true,
        }
    }
}

/// Existence precondition for a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrevExist {
    /// Write whether or not the key exists
    #[default]
    Ignore,
    /// Fail with [`StoreError::PreconditionFailed`] when the key is absent
    Exist,
}

/// Options for [`KeyValueStore::set`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// TTL of the written node; `None` clears any TTL
    pub ttl: Option<Duration>,
    /// Write a directory instead of a leaf (the value is ignored)
    pub dir: bool,
    pub prev_exist: PrevExist,
}

impl SetOptions {
    /// A leaf write
    pub fn value() -> Self {
        Self::default()
    }

    /// A directory write
    pub fn dir() -> Self {
        Self {
            dir: true,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Require the key to exist when `must_exist` is set
    pub fn must_exist(mut self, must_exist: bool) -> Self {
        self.prev_exist = if must_exist {
            PrevExist::Exist
        } else {
            PrevExist::Ignore
        };
        self
    }
}

/// Options for [`KeyValueStore::delete`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove a directory together with everything below it
    pub recursive: bool,
}

impl DeleteOptions {
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Hierarchical key-value store with TTLs
///
/// Each call is atomic on its own; nothing spans several calls.
#[trait_variant::make(KeyValueStore: Send)]
pub trait LocalKeyValueStore {
    /// Read a node; [`StoreError::KeyNotFound`] when absent
    async fn get(&self, path: &str, opts: GetOptions) -> StoreResult<Node>;

    /// Write a node and return it with its absolute expiration
    async fn set(&self, path: &str, value: &str, opts: SetOptions) -> StoreResult<Node>;

    /// Remove a node and return what was removed
    async fn delete(&self, path: &str, opts: DeleteOptions) -> StoreResult<Node>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(key: &str) -> Node {
        Node {
            key: key.to_string(),
            value: Some(String::new()),
            ..Node::default()
        }
    }

    fn dir(key: &str, nodes: Vec<Node>) -> Node {
        Node {
            key: key.to_string(),
            dir: true,
            nodes,
            ..Node::default()
        }
    }

    #[test]
    fn test_descendants_pre_order() {
        let tree = dir(
            "/a",
            vec![
                dir("/a/b", vec![leaf("/a/b/c"), dir("/a/b/d", vec![leaf("/a/b/d/e")])]),
                leaf("/a/f"),
            ],
        );

        let keys: Vec<&str> = tree.descendants().iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["/a/b", "/a/b/c", "/a/b/d", "/a/b/d/e", "/a/f"]);
    }

    #[test]
    fn test_descendants_deep_chain() {
        let mut node = leaf("/bottom");
        for i in 0..1_000 {
            node = dir(&format!("/{i}"), vec![node]);
        }
        assert_eq!(node.descendants().len(), 1_000);
    }

    #[test]
    fn test_leaves_skip_directories() {
        let tree = dir("/a", vec![leaf("/a/x"), dir("/a/y", vec![]), leaf("/a/z")]);
        let keys: Vec<&str> = tree.leaves().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["/a/x", "/a/z"]);
    }

    #[test]
    fn test_set_options_builder() {
        let opts = SetOptions::dir()
            .with_ttl(Duration::from_secs(60))
            .must_exist(true);
        assert!(opts.dir);
        assert_eq!(opts.ttl, Some(Duration::from_secs(60)));
        assert_eq!(opts.prev_exist, PrevExist::Exist);

        let opts = SetOptions::value().must_exist(false);
        assert!(!opts.dir);
        assert_eq!(opts.prev_exist, PrevExist::Ignore);
    }

    #[test]
    fn test_node_deserialize_etcd_shape() {
        let json = r#"{
            "key": "/rdns/cloud/rancher/lb/x1",
            "dir": true,
            "expiration": "2026-10-27T10:00:00Z",
            "ttl": 864000,
            "nodes": [
                {"key": "/rdns/cloud/rancher/lb/x1/1_2_3_4", "value": "{\"host\":\"1.2.3.4\"}"}
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(node.dir);
        assert_eq!(node.ttl, Some(864000));
        assert!(node.expiration.is_some());
        assert_eq!(node.nodes.len(), 1);
        assert!(!node.nodes[0].dir);
    }
}
