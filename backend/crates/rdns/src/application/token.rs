//! Token Manager
//!
//! Persists the per-domain ownership token ("token origin") next to the
//! registration, with the same TTL.

use std::sync::Arc;

use platform::crypto::constant_time_eq;

use crate::application::config::RdnsConfig;
use crate::domain::repository::{GetOptions, KeyValueStore, SetOptions, StoreError};
use crate::domain::services::generate_token_origin;
use crate::domain::value_objects::Fqdn;
use crate::error::{RdnsError, RdnsResult};

/// Token manager
pub struct TokenManager<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
    config: Arc<RdnsConfig>,
}

impl<S> TokenManager<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>, config: Arc<RdnsConfig>) -> Self {
        Self { store, config }
    }

    /// Make sure a token exists for `fqdn` and restart its TTL
    ///
    /// An existing token keeps its value; a missing one is generated. With
    /// `must_exist` the write fails with `PreconditionFailed` if the token
    /// vanished between the read and the write.
    pub async fn ensure(&self, fqdn: &Fqdn, must_exist: bool) -> RdnsResult<()> {
        let path = self.config.paths().token_path(fqdn.registration_name()?);

        let token = match self.store.get(&path, GetOptions::default()).await {
            Ok(node) => {
                tracing::debug!(fqdn = %fqdn, "Reusing existing token origin");
                stored_token(&path, node.value)?
            }
            Err(StoreError::KeyNotFound(_)) => {
                tracing::debug!(fqdn = %fqdn, "Generating new token origin");
                generate_token_origin(self.config.token_length)
            }
            Err(e) => return Err(e.into()),
        };

        let opts = SetOptions::value()
            .with_ttl(self.config.ttl)
            .must_exist(must_exist);
        self.store.set(&path, &token, opts).await?;

        tracing::debug!(path = %path, must_exist = must_exist, "Token origin written");
        Ok(())
    }

    /// Read the token origin of `fqdn`
    pub async fn origin(&self, fqdn: &Fqdn) -> RdnsResult<String> {
        let path = self.config.paths().token_path(fqdn.registration_name()?);
        let node = self
            .store
            .get(&path, GetOptions::default())
            .await
            .map_err(|e| match e {
                StoreError::KeyNotFound(_) => {
                    RdnsError::NotFound(format!("token origin of {fqdn}"))
                }
                other => other.into(),
            })?;
        stored_token(&path, node.value)
    }

    /// Check a presented token against the stored one
    pub async fn authorize(&self, fqdn: &Fqdn, presented: &str) -> RdnsResult<()> {
        let origin = self.origin(fqdn).await?;
        if constant_time_eq(origin.as_bytes(), presented.as_bytes()) {
            Ok(())
        } else {
            Err(RdnsError::TokenMismatch(fqdn.to_string()))
        }
    }
}

fn stored_token(path: &str, value: Option<String>) -> RdnsResult<String> {
    match value {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(RdnsError::DataIntegrity {
            key: path.to_string(),
            reason: "token origin is empty".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryStore;

    fn manager() -> (Arc<MemoryStore>, TokenManager<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = TokenManager::new(store.clone(), Arc::new(RdnsConfig::default()));
        (store, manager)
    }

    fn fqdn(s: &str) -> Fqdn {
        Fqdn::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_generates_once() {
        let (_, manager) = manager();
        let name = fqdn("abc123.lb.rancher.cloud");

        manager.ensure(&name, false).await.unwrap();
        let first = manager.origin(&name).await.unwrap();
        assert_eq!(first.len(), 32);
        assert!(first.bytes().all(|b| b.is_ascii_alphanumeric()));

        manager.ensure(&name, true).await.unwrap();
        assert_eq!(manager.origin(&name).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_ensure_sets_ttl() {
        let (store, manager) = manager();
        let name = fqdn("abc123.lb.rancher.cloud");
        manager.ensure(&name, false).await.unwrap();

        let node = store
            .get("/token_origin/abc123_lb_rancher_cloud", GetOptions::default())
            .await
            .unwrap();
        assert!(node.expiration.is_some());
        assert!(node.ttl.unwrap() > 864_000 - 5);
    }

    #[tokio::test]
    async fn test_ensure_must_exist_on_missing_token() {
        let (_, manager) = manager();
        let result = manager.ensure(&fqdn("gone.lb.rancher.cloud"), true).await;
        assert!(matches!(result, Err(RdnsError::PreconditionFailed(_))));
    }

    #[tokio::test]
    async fn test_origin_not_found() {
        let (_, manager) = manager();
        let result = manager.origin(&fqdn("nobody.lb.rancher.cloud")).await;
        assert!(matches!(result, Err(RdnsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_authorize() {
        let (_, manager) = manager();
        let name = fqdn("abc123.lb.rancher.cloud");
        manager.ensure(&name, false).await.unwrap();
        let token = manager.origin(&name).await.unwrap();

        assert!(manager.authorize(&name, &token).await.is_ok());
        assert!(matches!(
            manager.authorize(&name, "wrong").await,
            Err(RdnsError::TokenMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_token_is_integrity_error() {
        let (store, manager) = manager();
        store
            .set(
                "/token_origin/abc123_lb_rancher_cloud",
                "",
                SetOptions::value(),
            )
            .await
            .unwrap();
        let result = manager.origin(&fqdn("abc123.lb.rancher.cloud")).await;
        assert!(matches!(result, Err(RdnsError::DataIntegrity { .. })));
    }
}
