//! Text Record Store
//!
//! Single-value text registrations. Names carrying the `_acme-challenge`
//! label are stored in the forward-ordered ACME namespace, everything else
//! at the reversed registration path.

use std::sync::Arc;

use crate::application::config::RdnsConfig;
use crate::domain::entities::{Domain, DomainOptions};
use crate::domain::repository::{DeleteOptions, GetOptions, KeyValueStore, SetOptions, StoreError};
use crate::domain::value_objects::{Fqdn, RecordValue};
use crate::error::{RdnsError, RdnsResult};

/// Text registration store
pub struct TextRecordStore<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
    config: Arc<RdnsConfig>,
}

impl<S> TextRecordStore<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>, config: Arc<RdnsConfig>) -> Self {
        Self { store, config }
    }

    pub async fn create_text(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        let fqdn = opts.fqdn()?;
        let domain = self.upsert(&fqdn, &opts.text).await?;
        tracing::info!(fqdn = %fqdn, acme = fqdn.is_acme_challenge(), "Text record created");
        Ok(domain)
    }

    pub async fn get_text(&self, fqdn: &Fqdn) -> RdnsResult<Domain> {
        let path = self.config.paths().text_path(fqdn);
        let node = self
            .store
            .get(&path, GetOptions::default())
            .await
            .map_err(|e| match e {
                StoreError::KeyNotFound(_) => RdnsError::NotFound(fqdn.to_string()),
                other => other.into(),
            })?;

        if node.dir {
            return Err(RdnsError::NotFound(format!("{fqdn} is not a text record")));
        }
        let raw = node.value.as_deref().unwrap_or_default();
        let text = RecordValue::decode(&node.key, raw)?.into_text(&node.key)?;
        Ok(Domain::with_text(fqdn, text, node.expiration))
    }

    pub async fn update_text(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        let fqdn = opts.fqdn()?;
        let domain = self.upsert(&fqdn, &opts.text).await?;
        tracing::info!(fqdn = %fqdn, acme = fqdn.is_acme_challenge(), "Text record updated");
        Ok(domain)
    }

    pub async fn delete_text(&self, fqdn: &Fqdn) -> RdnsResult<()> {
        let path = self.config.paths().text_path(fqdn);
        self.store
            .delete(&path, DeleteOptions::recursive())
            .await
            .map_err(|e| match e {
                StoreError::KeyNotFound(_) => RdnsError::NotFound(fqdn.to_string()),
                other => other.into(),
            })?;

        tracing::info!(fqdn = %fqdn, "Text record deleted");
        Ok(())
    }

    /// Probe for presence, then write with the matching precondition
    async fn upsert(&self, fqdn: &Fqdn, text: &str) -> RdnsResult<Domain> {
        let path = self.config.paths().text_path(fqdn);
        let exists = match self.store.get(&path, GetOptions::default()).await {
            Ok(_) => true,
            Err(StoreError::KeyNotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };
        self.set_text(fqdn, &path, text, exists).await
    }

    async fn set_text(
        &self,
        fqdn: &Fqdn,
        path: &str,
        text: &str,
        exists: bool,
    ) -> RdnsResult<Domain> {
        let value = RecordValue::text(text).encode()?;
        let opts = SetOptions::value()
            .with_ttl(self.config.ttl)
            .must_exist(exists);
        let node = self.store.set(path, &value, opts).await?;

        tracing::debug!(path = %path, must_exist = exists, "Text record written");
        Ok(Domain::with_text(fqdn, text.to_string(), node.expiration))
    }
}
