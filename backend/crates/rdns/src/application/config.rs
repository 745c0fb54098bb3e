//! Application Configuration
//!
//! Configuration for the registration application layer.

use std::time::Duration;

use platform::config::{env_or, env_parse_or};

use crate::domain::path::PathEncoder;
use crate::domain::value_objects::Fqdn;
use crate::error::{RdnsError, RdnsResult};

/// Registration configuration
#[derive(Debug, Clone)]
pub struct RdnsConfig {
    /// Domain that generated names are created under
    pub root_domain: String,
    /// Path prefix of registrations and the ACME text namespace
    pub prefix: String,
    /// Flat directory holding one token origin per name
    pub token_root: String,
    /// Lifetime of a registration between renewals (10 days)
    pub ttl: Duration,
    /// Length of generated subdomain slugs
    pub slug_length: usize,
    /// Length of generated token origins
    pub token_length: usize,
    /// Slugs tried before giving up on creation
    pub max_slug_attempts: u32,
}

impl Default for RdnsConfig {
    fn default() -> Self {
        Self {
            root_domain: "lb.rancher.cloud".to_string(),
            prefix: "/rdns".to_string(),
            token_root: "/token_origin".to_string(),
            ttl: Duration::from_secs(240 * 3600), // 240 hours
            slug_length: 6,
            token_length: 32,
            max_slug_attempts: 100,
        }
    }
}

impl RdnsConfig {
    /// Load from `RDNS_*` environment variables, defaulting what is unset
    pub fn from_env() -> RdnsResult<Self> {
        let defaults = Self::default();
        let invalid = |e: platform::config::EnvError| RdnsError::InvalidConfig(e.to_string());

        let config = Self {
            root_domain: env_or("RDNS_ROOT_DOMAIN", &defaults.root_domain),
            prefix: env_or("RDNS_PREFIX", &defaults.prefix),
            token_root: env_or("RDNS_TOKEN_ROOT", &defaults.token_root),
            ttl: Duration::from_secs(
                env_parse_or("RDNS_TTL_SECS", defaults.ttl.as_secs()).map_err(invalid)?,
            ),
            slug_length: defaults.slug_length,
            token_length: defaults.token_length,
            max_slug_attempts: env_parse_or("RDNS_MAX_SLUG_ATTEMPTS", defaults.max_slug_attempts)
                .map_err(invalid)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RdnsResult<()> {
        if self.slug_length == 0 || self.token_length == 0 {
            return Err(RdnsError::InvalidConfig(
                "slug and token lengths must be positive".to_string(),
            ));
        }
        if self.max_slug_attempts == 0 {
            return Err(RdnsError::InvalidConfig(
                "max_slug_attempts must be at least 1".to_string(),
            ));
        }
        if self.ttl.as_secs() == 0 {
            return Err(RdnsError::InvalidConfig("ttl must be at least one second".to_string()));
        }
        Fqdn::parse(&self.root_domain)
            .and_then(|root| root.registration_name().map(|_| ()))
            .map_err(|_| RdnsError::InvalidConfig(format!("root_domain {:?}", self.root_domain)))?;
        let paths = self.paths();
        let prefix = paths.prefix();
        if !prefix.is_empty()
            && (paths.token_root() == prefix
                || paths.token_root().starts_with(&format!("{prefix}/")))
        {
            return Err(RdnsError::InvalidConfig(
                "token_root must not live under prefix".to_string(),
            ));
        }
        Ok(())
    }

    pub fn paths(&self) -> PathEncoder {
        PathEncoder::new(&self.prefix, &self.token_root)
    }

    /// The root domain as a parsed name
    pub fn root(&self) -> RdnsResult<Fqdn> {
        Fqdn::parse(&self.root_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RdnsConfig::default();
        assert_eq!(config.ttl.as_secs(), 864_000);
        assert_eq!(config.slug_length, 6);
        assert_eq!(config.token_length, 32);
        assert_eq!(config.max_slug_attempts, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let config = RdnsConfig {
            max_slug_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RdnsError::InvalidConfig(_))));

        let config = RdnsConfig {
            slug_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RdnsError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_root_domain() {
        let config = RdnsConfig {
            root_domain: "lb..cloud".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RdnsError::InvalidConfig(_))));

        let config = RdnsConfig {
            root_domain: "lb_1.rancher.cloud".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RdnsError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_token_root_under_prefix() {
        let config = RdnsConfig {
            token_root: "/rdns/tokens".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RdnsError::InvalidConfig(_))));
    }

    #[test]
    fn test_paths_use_configured_roots() {
        let config = RdnsConfig {
            prefix: "/custom".to_string(),
            ..Default::default()
        };
        let fqdn = Fqdn::parse("a.b").unwrap();
        assert_eq!(config.paths().storage_path(&fqdn), "/custom/b/a");
    }
}
