//! Domain Service
//!
//! One explicitly constructed entry point bundling every registration verb
//! over a single shared store.

use std::sync::Arc;

use crate::application::config::RdnsConfig;
use crate::application::record_store::RecordStore;
use crate::application::text_store::TextRecordStore;
use crate::application::token::TokenManager;
use crate::domain::entities::{Domain, DomainOptions};
use crate::domain::repository::KeyValueStore;
use crate::domain::value_objects::Fqdn;
use crate::error::RdnsResult;

/// Registration service
pub struct DomainService<S>
where
    S: KeyValueStore,
{
    config: Arc<RdnsConfig>,
    records: RecordStore<S>,
    texts: TextRecordStore<S>,
    tokens: TokenManager<S>,
}

impl<S> DomainService<S>
where
    S: KeyValueStore,
{
    /// Validate `config` and wire every component to `store`
    pub fn new(store: S, config: RdnsConfig) -> RdnsResult<Self> {
        config.validate()?;
        let store = Arc::new(store);
        let config = Arc::new(config);

        Ok(Self {
            records: RecordStore::new(store.clone(), config.clone()),
            texts: TextRecordStore::new(store.clone(), config.clone()),
            tokens: TokenManager::new(store, config.clone()),
            config,
        })
    }

    pub fn config(&self) -> &RdnsConfig {
        &self.config
    }

    pub async fn create_host(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.records.create(opts).await
    }

    pub async fn get_host(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.records.get(&opts.fqdn()?).await
    }

    pub async fn update_host(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.records.update(opts).await
    }

    pub async fn renew_host(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.records.renew(&opts.fqdn()?).await
    }

    pub async fn delete_host(&self, opts: &DomainOptions) -> RdnsResult<()> {
        self.records.delete(&opts.fqdn()?).await
    }

    pub async fn create_text(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.texts.create_text(opts).await
    }

    pub async fn get_text(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.texts.get_text(&opts.fqdn()?).await
    }

    pub async fn update_text(&self, opts: &DomainOptions) -> RdnsResult<Domain> {
        self.texts.update_text(opts).await
    }

    pub async fn delete_text(&self, opts: &DomainOptions) -> RdnsResult<()> {
        self.texts.delete_text(&opts.fqdn()?).await
    }

    pub async fn get_token_origin(&self, fqdn: &str) -> RdnsResult<String> {
        let fqdn = Fqdn::parse(fqdn)?;
        self.tokens.origin(&fqdn).await
    }

    /// Fail with `TokenMismatch` unless `presented` is the owner's token
    pub async fn authorize(&self, fqdn: &str, presented: &str) -> RdnsResult<()> {
        let fqdn = Fqdn::parse(fqdn)?;
        self.tokens.authorize(&fqdn, presented).await
    }
}
