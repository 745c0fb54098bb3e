//! Host Reconciler
//!
//! Brings the host entries under a registration directory in line with a
//! desired set using the fewest store writes.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::config::RdnsConfig;
use crate::domain::repository::{DeleteOptions, GetOptions, KeyValueStore, Node, SetOptions};
use crate::domain::services::HostPlan;
use crate::domain::value_objects::RecordValue;
use crate::error::RdnsResult;

/// Host reconciler
pub struct HostReconciler<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
    config: Arc<RdnsConfig>,
}

impl<S> HostReconciler<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>, config: Arc<RdnsConfig>) -> Self {
        Self { store, config }
    }

    /// Hosts currently stored under `dir`
    pub async fn current_hosts(&self, dir: &str) -> RdnsResult<BTreeSet<String>> {
        let node = self.store.get(dir, GetOptions::default()).await?;
        hosts_of(&node)
    }

    /// Delete `current - desired`, then write `desired - current`
    ///
    /// Stops at the first failed write; entries already touched stay as
    /// they are and the error is returned.
    pub async fn reconcile(
        &self,
        dir: &str,
        current: &BTreeSet<String>,
        desired: &BTreeSet<String>,
    ) -> RdnsResult<HostPlan> {
        let plan = HostPlan::compute(current, desired);
        let paths = self.config.paths();

        for host in &plan.to_remove {
            let key = paths.host_key(dir, host);
            tracing::debug!(key = %key, host = %host, "Deleting host entry");
            self.store.delete(&key, DeleteOptions::default()).await?;
        }

        for host in &plan.to_add {
            let key = paths.host_key(dir, host);
            let value = RecordValue::host(host.as_str()).encode()?;
            tracing::debug!(key = %key, host = %host, "Writing host entry");
            self.store.set(&key, &value, SetOptions::value()).await?;
        }

        tracing::debug!(
            dir = %dir,
            added = plan.to_add.len(),
            removed = plan.to_remove.len(),
            "Hosts reconciled"
        );
        Ok(plan)
    }
}

/// Decode the host entries directly under a registration node
///
/// Child directories are skipped; any leaf that is not a host record is a
/// data integrity error.
pub fn hosts_of(node: &Node) -> RdnsResult<BTreeSet<String>> {
    node.leaves()
        .map(|leaf| {
            let raw = leaf.value.as_deref().unwrap_or_default();
            RecordValue::decode(&leaf.key, raw)?.into_host(&leaf.key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RdnsError;
    use crate::infra::memory::MemoryStore;

    const DIR: &str = "/rdns/cloud/rancher/lb/x1";

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn reconciler() -> (Arc<MemoryStore>, HostReconciler<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.set(DIR, "", SetOptions::dir()).await.unwrap();
        let reconciler = HostReconciler::new(store.clone(), Arc::new(RdnsConfig::default()));
        (store, reconciler)
    }

    #[tokio::test]
    async fn test_reconcile_from_empty() {
        let (store, reconciler) = reconciler().await;
        let desired = set(&["1.1.1.1", "2.2.2.2"]);

        let plan = reconciler
            .reconcile(DIR, &BTreeSet::new(), &desired)
            .await
            .unwrap();
        assert_eq!(plan.len(), 2);

        let leaf = store
            .get(&format!("{DIR}/1_1_1_1"), GetOptions::default())
            .await
            .unwrap();
        assert_eq!(leaf.value.as_deref(), Some(r#"{"host":"1.1.1.1"}"#));
        assert_eq!(reconciler.current_hosts(DIR).await.unwrap(), desired);
    }

    #[tokio::test]
    async fn test_reconcile_swaps_hosts() {
        let (_, reconciler) = reconciler().await;
        reconciler
            .reconcile(DIR, &BTreeSet::new(), &set(&["1.1.1.1", "2.2.2.2"]))
            .await
            .unwrap();

        let current = reconciler.current_hosts(DIR).await.unwrap();
        let desired = set(&["2.2.2.2", "3.3.3.3"]);
        let plan = reconciler.reconcile(DIR, &current, &desired).await.unwrap();

        assert_eq!(plan.to_remove, set(&["1.1.1.1"]));
        assert_eq!(plan.to_add, set(&["3.3.3.3"]));
        assert_eq!(reconciler.current_hosts(DIR).await.unwrap(), desired);
    }

    #[tokio::test]
    async fn test_current_hosts_skips_subdirectories() {
        let (store, reconciler) = reconciler().await;
        store
            .set(&format!("{DIR}/sub"), "", SetOptions::dir())
            .await
            .unwrap();
        store
            .set(
                &format!("{DIR}/9_9_9_9"),
                r#"{"host":"9.9.9.9"}"#,
                SetOptions::value(),
            )
            .await
            .unwrap();

        assert_eq!(
            reconciler.current_hosts(DIR).await.unwrap(),
            set(&["9.9.9.9"])
        );
    }

    #[tokio::test]
    async fn test_current_hosts_rejects_malformed_entry() {
        let (store, reconciler) = reconciler().await;
        store
            .set(&format!("{DIR}/bad"), "not json", SetOptions::value())
            .await
            .unwrap();

        assert!(matches!(
            reconciler.current_hosts(DIR).await,
            Err(RdnsError::DataIntegrity { .. })
        ));
    }
}
