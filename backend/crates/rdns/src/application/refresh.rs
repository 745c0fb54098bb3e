//! Expiration Refresher
//!
//! Restarts the TTL of a registration together with its token and every
//! ACME challenge entry that belongs to it.

use std::sync::Arc;

use crate::application::config::RdnsConfig;
use crate::application::reconciler::HostReconciler;
use crate::application::token::TokenManager;
use crate::domain::entities::Domain;
use crate::domain::path::is_acme_entry_for;
use crate::domain::repository::{GetOptions, KeyValueStore, SetOptions, StoreError};
use crate::domain::value_objects::Fqdn;
use crate::error::RdnsResult;

/// Expiration refresher
pub struct ExpirationRefresher<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
    config: Arc<RdnsConfig>,
    tokens: TokenManager<S>,
    reconciler: HostReconciler<S>,
}

impl<S> ExpirationRefresher<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>, config: Arc<RdnsConfig>) -> Self {
        Self {
            tokens: TokenManager::new(store.clone(), config.clone()),
            reconciler: HostReconciler::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    /// Renew an existing registration
    ///
    /// Every write is conditioned on prior existence, so a registration that
    /// expired or was deleted fails with `PreconditionFailed` instead of
    /// being recreated.
    pub async fn renew(&self, fqdn: &Fqdn) -> RdnsResult<Domain> {
        let fqdn = fqdn.registration_name()?;
        self.tokens.ensure(fqdn, true).await?;

        let path = self.config.paths().storage_path(fqdn);
        let opts = SetOptions::dir().with_ttl(self.config.ttl).must_exist(true);
        let dir = self.store.set(&path, "", opts).await?;

        let hosts = self.reconciler.current_hosts(&path).await?;
        let refreshed = self.refresh_acme_entries(fqdn).await?;

        tracing::info!(
            fqdn = %fqdn,
            hosts = hosts.len(),
            acme_entries = refreshed,
            "Registration renewed"
        );
        Ok(Domain::with_hosts(fqdn, hosts, dir.expiration))
    }

    /// Rewrite each ACME entry of `fqdn` with its own value and a new TTL
    ///
    /// Returns the number of entries refreshed. The first failure aborts.
    pub async fn refresh_acme_entries(&self, fqdn: &Fqdn) -> RdnsResult<usize> {
        let root = self.config.paths().acme_root();
        let listing = match self.store.get(&root, GetOptions::recursive()).await {
            Ok(node) => node,
            Err(StoreError::KeyNotFound(_)) => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let keys: Vec<String> = listing
            .descendants()
            .into_iter()
            .filter(|node| !node.dir && is_acme_entry_for(&node.key, fqdn))
            .map(|node| node.key.clone())
            .collect();

        for key in &keys {
            let current = self.store.get(key, GetOptions::default()).await?;
            let value = current.value.unwrap_or_default();
            let opts = SetOptions::value().with_ttl(self.config.ttl).must_exist(true);
            self.store.set(key, &value, opts).await?;
            tracing::debug!(key = %key, "ACME entry refreshed");
        }

        Ok(keys.len())
    }
}
