//! Record Store
//!
//! Create, read, update, renew and delete address registrations.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::config::RdnsConfig;
use crate::application::reconciler::{HostReconciler, hosts_of};
use crate::application::refresh::ExpirationRefresher;
use crate::application::token::TokenManager;
use crate::domain::entities::{Domain, DomainOptions};
use crate::domain::repository::{DeleteOptions, GetOptions, KeyValueStore, SetOptions, StoreError};
use crate::domain::services::generate_slug;
use crate::domain::value_objects::Fqdn;
use crate::error::{RdnsError, RdnsResult};

/// Address registration store
pub struct RecordStore<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
    config: Arc<RdnsConfig>,
    tokens: TokenManager<S>,
    reconciler: HostReconciler<S>,
    refresher: ExpirationRefresher<S>,
}

impl<S> RecordStore<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>, config: Arc<RdnsConfig>) -> Self {
        Self {
            tokens: TokenManager::new(store.clone(), config.clone()),
            reconciler: HostReconciler::new(store.clone(), config.clone()),
            refresher: ExpirationRefresher::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    /// Register a fresh `<slug>.<root>` name for the given hosts
    ///
    /// `opts.fqdn` is ignored.
    pub async fn create(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        let desired = opts.host_set()?;
        let fqdn = self.allocate().await?;

        self.write(&fqdn, &desired, false).await?;
        let domain = self.get(&fqdn).await?;

        tracing::info!(fqdn = %fqdn, hosts = domain.hosts.len(), "Registration created");
        Ok(domain)
    }

    /// Snapshot of a registration
    pub async fn get(&self, fqdn: &Fqdn) -> RdnsResult<Domain> {
        let fqdn = fqdn.registration_name()?;
        let path = self.config.paths().storage_path(fqdn);
        let node = self
            .store
            .get(&path, GetOptions::default())
            .await
            .map_err(|e| not_found_as(e, fqdn))?;

        if !node.dir {
            return Err(RdnsError::NotFound(format!(
                "{fqdn} is not an address registration"
            )));
        }
        Ok(Domain::with_hosts(fqdn, hosts_of(&node)?, node.expiration))
    }

    /// Replace the host set of a registration, creating it if absent
    pub async fn update(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        let fqdn = opts.fqdn()?;
        fqdn.registration_name()?;
        let desired = opts.host_set()?;
        let path = self.config.paths().storage_path(&fqdn);

        let exists = match self.store.get(&path, GetOptions::default()).await {
            Ok(node) => node.dir,
            Err(StoreError::KeyNotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };

        let domain = self.write(&fqdn, &desired, exists).await?;
        tracing::info!(
            fqdn = %fqdn,
            existed = exists,
            hosts = domain.hosts.len(),
            "Registration updated"
        );
        Ok(domain)
    }

    /// Extend the lifetime of a registration and its dependents
    pub async fn renew(&self, fqdn: &Fqdn) -> RdnsResult<Domain> {
        self.refresher.renew(fqdn).await
    }

    /// Remove a registration and all its hosts; the token is left to expire
    pub async fn delete(&self, fqdn: &Fqdn) -> RdnsResult<()> {
        let path = self.config.paths().storage_path(fqdn);
        self.store
            .delete(&path, DeleteOptions::recursive())
            .await
            .map_err(|e| not_found_as(e, fqdn))?;

        tracing::info!(fqdn = %fqdn, "Registration deleted");
        Ok(())
    }

    /// Pick an unused `<slug>.<root>` name
    async fn allocate(&self) -> RdnsResult<Fqdn> {
        let root = self.config.root()?;
        let paths = self.config.paths();

        for attempt in 1..=self.config.max_slug_attempts {
            let slug = generate_slug(self.config.slug_length);
            let candidate = Fqdn::parse(&format!("{slug}.{root}"))?;
            let path = paths.storage_path(&candidate);

            match self.store.get(&path, GetOptions::default()).await {
                Err(StoreError::KeyNotFound(_)) => return Ok(candidate),
                Ok(_) => {
                    tracing::warn!(fqdn = %candidate, attempt = attempt, "Slug already taken");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RdnsError::SlugExhausted {
            attempts: self.config.max_slug_attempts,
        })
    }

    /// Token, directory TTL, then hosts
    async fn write(
        &self,
        fqdn: &Fqdn,
        desired: &BTreeSet<String>,
        exists: bool,
    ) -> RdnsResult<Domain> {
        self.tokens.ensure(fqdn, exists).await?;

        let path = self.config.paths().storage_path(fqdn);
        let opts = SetOptions::dir()
            .with_ttl(self.config.ttl)
            .must_exist(exists);
        let dir = self.store.set(&path, "", opts).await?;
        tracing::debug!(path = %path, must_exist = exists, "Registration directory written");

        let current = self.reconciler.current_hosts(&path).await?;
        let plan = self.reconciler.reconcile(&path, &current, desired).await?;

        Ok(Domain::with_hosts(fqdn, plan.apply(&current), dir.expiration))
    }
}

fn not_found_as(err: StoreError, fqdn: &Fqdn) -> RdnsError {
    match err {
        StoreError::KeyNotFound(_) => RdnsError::NotFound(fqdn.to_string()),
        other => other.into(),
    }
}
