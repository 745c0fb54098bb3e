//! In-Memory Key-Value Store
//!
//! A process-local tree following the etcd v2 keys semantics closely enough
//! to stand in for a live cluster in tests and local runs.
//!
//! - missing parent directories are created on write
//! - writing over a directory fails with `NotAFile`, writing through a leaf
//!   with `NotADir`
//! - `PrevExist::Exist` turns a write into an update: a missing key fails
//!   with `PreconditionFailed`, a directory keeps its children
//! - TTLs are enforced lazily: expired nodes are dropped on the next access

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::repository::{
    DeleteOptions, GetOptions, KeyValueStore, Node, PrevExist, SetOptions, StoreError,
    StoreResult,
};

#[derive(Debug, Clone, Default)]
struct Entry {
    /// `None` for directories
    value: Option<String>,
    children: BTreeMap<String, Entry>,
    expiration: Option<DateTime<Utc>>,
}

impl Entry {
    fn dir(expiration: Option<DateTime<Utc>>) -> Self {
        Self {
            expiration,
            ..Self::default()
        }
    }

    fn leaf(value: &str, expiration: Option<DateTime<Utc>>) -> Self {
        Self {
            value: Some(value.to_string()),
            expiration,
            ..Self::default()
        }
    }

    fn is_dir(&self) -> bool {
        self.value.is_none()
    }

    fn purge(&mut self, now: DateTime<Utc>) {
        self.children
            .retain(|_, child| child.expiration.is_none_or(|exp| exp > now));
        for child in self.children.values_mut() {
            child.purge(now);
        }
    }

    /// Render as a [`Node`]; `expand` lists children, `recursive` all levels
    fn render(&self, key: &str, expand: bool, recursive: bool, now: DateTime<Utc>) -> Node {
        let nodes = if self.is_dir() && expand {
            self.children
                .iter()
                .map(|(name, child)| child.render(&join(key, name), recursive, recursive, now))
                .collect()
        } else {
            Vec::new()
        };

        Node {
            key: key.to_string(),
            value: self.value.clone(),
            dir: self.is_dir(),
            expiration: self.expiration,
            ttl: self
                .expiration
                .map(|exp| ((exp - now).num_milliseconds() + 999).div_euclid(1000)),
            nodes,
        }
    }
}

/// In-memory store; clones share the same tree
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    root: Arc<Mutex<Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, path: &str, opts: GetOptions) -> StoreResult<Node> {
        let now = Utc::now();
        let mut root = self.root.lock().await;
        root.purge(now);

        let segments = segments(path);
        let entry = walk(&root, &segments)?;
        Ok(entry.render(&canonical(&segments), true, opts.recursive, now))
    }

    async fn set(&self, path: &str, value: &str, opts: SetOptions) -> StoreResult<Node> {
        let now = Utc::now();
        let expiration = match opts.ttl {
            Some(ttl) => Some(
                now + chrono::Duration::from_std(ttl)
                    .map_err(|e| StoreError::Protocol(e.to_string()))?,
            ),
            None => None,
        };

        let mut root = self.root.lock().await;
        root.purge(now);

        let segments = segments(path);
        let key = canonical(&segments);
        let Some((last, parents)) = segments.split_last() else {
            return Err(StoreError::NotAFile(key));
        };

        let mut current: &mut Entry = &mut *root;
        let mut walked = String::new();
        for segment in parents {
            if !current.is_dir() {
                return Err(StoreError::NotADir(walked));
            }
            if opts.prev_exist == PrevExist::Exist && !current.children.contains_key(*segment) {
                return Err(StoreError::PreconditionFailed(key));
            }
            walked = join(&walked, segment);
            current = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| Entry::dir(None));
        }
        if !current.is_dir() {
            return Err(StoreError::NotADir(walked));
        }

        let existing_dir = current.children.get(*last).map(Entry::is_dir);
        match (opts.prev_exist, existing_dir) {
            (PrevExist::Exist, None) => Err(StoreError::PreconditionFailed(key)),
            (PrevExist::Exist, Some(true)) if !opts.dir && !value.is_empty() => {
                Err(StoreError::NotAFile(key))
            }
            (PrevExist::Exist, Some(false)) if opts.dir => Err(StoreError::NotADir(key)),
            (PrevExist::Ignore, Some(true)) => Err(StoreError::NotAFile(key)),
            (PrevExist::Exist, Some(is_dir)) => {
                let entry = current
                    .children
                    .get_mut(*last)
                    .ok_or_else(|| StoreError::KeyNotFound(key.clone()))?;
                if !is_dir {
                    entry.value = Some(value.to_string());
                }
                entry.expiration = expiration;
                Ok(entry.render(&key, false, false, now))
            }
            (PrevExist::Ignore, _) => {
                let fresh = if opts.dir {
                    Entry::dir(expiration)
                } else {
                    Entry::leaf(value, expiration)
                };
                let node = fresh.render(&key, false, false, now);
                current.children.insert(last.to_string(), fresh);
                Ok(node)
            }
        }
    }

    async fn delete(&self, path: &str, opts: DeleteOptions) -> StoreResult<Node> {
        let now = Utc::now();
        let mut root = self.root.lock().await;
        root.purge(now);

        let segments = segments(path);
        let key = canonical(&segments);
        let Some((last, parents)) = segments.split_last() else {
            return Err(StoreError::NotAFile(key));
        };

        let parent = walk_mut(&mut *root, parents)?;
        match parent.children.get(*last) {
            None => return Err(StoreError::KeyNotFound(key)),
            Some(entry) if entry.is_dir() && !opts.recursive => {
                return Err(StoreError::NotAFile(key));
            }
            Some(_) => {}
        }

        let removed = parent
            .children
            .remove(*last)
            .ok_or_else(|| StoreError::KeyNotFound(key.clone()))?;
        Ok(removed.render(&key, false, false, now))
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn canonical(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

fn join(key: &str, name: &str) -> String {
    if key.is_empty() || key == "/" {
        format!("/{name}")
    } else {
        format!("{key}/{name}")
    }
}

fn walk<'a>(root: &'a Entry, segments: &[&str]) -> StoreResult<&'a Entry> {
    let mut current = root;
    let mut walked = String::new();
    for segment in segments {
        if !current.is_dir() {
            return Err(StoreError::NotADir(if walked.is_empty() {
                "/".to_string()
            } else {
                walked
            }));
        }
        walked = join(&walked, segment);
        current = current
            .children
            .get(*segment)
            .ok_or_else(|| StoreError::KeyNotFound(walked.clone()))?;
    }
    Ok(current)
}

fn walk_mut<'a>(root: &'a mut Entry, segments: &[&str]) -> StoreResult<&'a mut Entry> {
    let mut current = root;
    let mut walked = String::new();
    for segment in segments {
        walked = join(&walked, segment);
        current = current
            .children
            .get_mut(*segment)
            .ok_or_else(|| StoreError::KeyNotFound(walked.clone()))?;
        if !current.is_dir() {
            return Err(StoreError::NotADir(walked));
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_creates_parents() {
        let store = MemoryStore::new();
        store
            .set("/a/b/c", "v", SetOptions::value())
            .await
            .unwrap();

        let a = store.get("/a", GetOptions::default()).await.unwrap();
        assert!(a.dir);
        assert_eq!(a.nodes.len(), 1);
        assert_eq!(a.nodes[0].key, "/a/b");
        assert!(a.nodes[0].nodes.is_empty());

        let leaf = store.get("/a/b/c", GetOptions::default()).await.unwrap();
        assert_eq!(leaf.value.as_deref(), Some("v"));
        assert!(leaf.expiration.is_none());
    }

    #[tokio::test]
    async fn test_recursive_get_lists_everything_sorted() {
        let store = MemoryStore::new();
        for key in ["/r/z", "/r/a/2", "/r/a/1"] {
            store.set(key, "v", SetOptions::value()).await.unwrap();
        }

        let root = store.get("/r", GetOptions::recursive()).await.unwrap();
        let keys: Vec<&str> = root.descendants().iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["/r/a", "/r/a/1", "/r/a/2", "/r/z"]);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get("/nope", GetOptions::default()).await,
            Err(StoreError::KeyNotFound("/nope".into()))
        );
        assert_eq!(
            store.delete("/nope", DeleteOptions::default()).await,
            Err(StoreError::KeyNotFound("/nope".into()))
        );
    }

    #[tokio::test]
    async fn test_prev_exist_on_missing_key() {
        let store = MemoryStore::new();
        let result = store
            .set("/a", "", SetOptions::dir().must_exist(true))
            .await;
        assert_eq!(result, Err(StoreError::PreconditionFailed("/a".into())));
    }

    #[tokio::test]
    async fn test_dir_update_keeps_children() {
        let store = MemoryStore::new();
        store.set("/d", "", SetOptions::dir()).await.unwrap();
        store.set("/d/x", "1", SetOptions::value()).await.unwrap();

        let again = store.set("/d", "", SetOptions::dir()).await;
        assert_eq!(again, Err(StoreError::NotAFile("/d".into())));

        let updated = store
            .set(
                "/d",
                "",
                SetOptions::dir()
                    .with_ttl(Duration::from_secs(100))
                    .must_exist(true),
            )
            .await
            .unwrap();
        assert!(updated.dir);
        assert!(updated.expiration.is_some());

        let d = store.get("/d", GetOptions::default()).await.unwrap();
        assert_eq!(d.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_leaf_and_dir_conflicts() {
        let store = MemoryStore::new();
        store.set("/f", "v", SetOptions::value()).await.unwrap();

        assert_eq!(
            store.set("/f/child", "v", SetOptions::value()).await,
            Err(StoreError::NotADir("/f".into()))
        );
        assert_eq!(
            store.get("/f/child", GetOptions::default()).await,
            Err(StoreError::NotADir("/f".into()))
        );

        store.set("/d", "", SetOptions::dir()).await.unwrap();
        assert_eq!(
            store
                .set("/d", "v", SetOptions::value().must_exist(true))
                .await,
            Err(StoreError::NotAFile("/d".into()))
        );
        assert_eq!(
            store.delete("/d", DeleteOptions::default()).await,
            Err(StoreError::NotAFile("/d".into()))
        );
        assert!(store.delete("/d", DeleteOptions::recursive()).await.is_ok());
    }

    #[tokio::test]
    async fn test_leaf_replaced_without_precondition() {
        let store = MemoryStore::new();
        store.set("/k", "old", SetOptions::value()).await.unwrap();
        store.set("/k", "", SetOptions::dir()).await.unwrap();
        assert!(store.get("/k", GetOptions::default()).await.unwrap().dir);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .set("/d", "", SetOptions::dir().with_ttl(Duration::from_secs(1)))
            .await
            .unwrap();
        store.set("/d/h", "v", SetOptions::value()).await.unwrap();

        let node = store.get("/d", GetOptions::default()).await.unwrap();
        assert_eq!(node.ttl, Some(1));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(matches!(
            store.get("/d/h", GetOptions::default()).await,
            Err(StoreError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("/shared", "v", SetOptions::value()).await.unwrap();
        assert!(other.get("/shared", GetOptions::default()).await.is_ok());
    }
}
