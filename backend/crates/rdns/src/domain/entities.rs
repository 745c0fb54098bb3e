//! Domain Entities
//!
//! Input options and output snapshots of the registration domain.

use crate::error::{RdnsError, RdnsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::value_objects::Fqdn;

/// What a caller asks for: a name plus desired hosts or text
///
/// `fqdn` is ignored by host creation, which generates a fresh name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOptions {
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub text: String,
}

impl DomainOptions {
    /// Options for an address registration
    pub fn with_hosts(fqdn: impl Into<String>, hosts: Vec<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            hosts,
            ..Self::default()
        }
    }

    /// Options for a text registration
    pub fn with_text(fqdn: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Options naming a domain only (get, renew, delete)
    pub fn named(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            ..Self::default()
        }
    }

    pub fn fqdn(&self) -> RdnsResult<Fqdn> {
        Fqdn::parse(&self.fqdn)
    }

    /// The desired hosts as a set
    ///
    /// Blank entries are dropped and duplicates collapse. Hosts containing
    /// `_` or `/` are rejected since they cannot be stored as distinct keys.
    pub fn host_set(&self) -> RdnsResult<BTreeSet<String>> {
        let mut set = BTreeSet::new();
        for host in self.hosts.iter().map(|h| h.trim()).filter(|h| !h.is_empty()) {
            if host.contains(['_', '/']) {
                return Err(RdnsError::InvalidHost(host.to_string()));
            }
            set.insert(host.to_string());
        }
        Ok(set)
    }
}

/// Snapshot of a registration, produced fresh by every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub fqdn: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

impl Domain {
    pub fn with_hosts(
        fqdn: &Fqdn,
        hosts: BTreeSet<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            fqdn: fqdn.to_string(),
            hosts: hosts.into_iter().collect(),
            text: None,
            expiration,
        }
    }

    pub fn with_text(fqdn: &Fqdn, text: String, expiration: Option<DateTime<Utc>>) -> Self {
        Self {
            fqdn: fqdn.to_string(),
            hosts: Vec::new(),
            text: Some(text),
            expiration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_set_dedup_and_trim() {
        let opts = DomainOptions::with_hosts(
            "",
            vec![
                "1.2.3.4".into(),
                " 1.2.3.4 ".into(),
                "".into(),
                "5.6.7.8".into(),
            ],
        );
        let set = opts.host_set().unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["1.2.3.4", "5.6.7.8"]);
    }

    #[test]
    fn test_host_set_rejects_structural_characters() {
        let opts = DomainOptions::with_hosts("", vec!["1_2_3_4".into()]);
        assert!(matches!(opts.host_set(), Err(RdnsError::InvalidHost(_))));

        let opts = DomainOptions::with_hosts("", vec!["10.0.0.0/8".into()]);
        assert!(matches!(opts.host_set(), Err(RdnsError::InvalidHost(_))));
    }

    #[test]
    fn test_host_set_accepts_ipv6() {
        let opts = DomainOptions::with_hosts("", vec!["2001:db8::1".into()]);
        assert!(opts.host_set().unwrap().contains("2001:db8::1"));
    }

    #[test]
    fn test_domain_options_deserialization() {
        let json = r#"{"fqdn":"x1.lb.rancher.cloud","hosts":["1.1.1.1"]}"#;
        let opts: DomainOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.fqdn, "x1.lb.rancher.cloud");
        assert_eq!(opts.hosts, vec!["1.1.1.1"]);
        assert!(opts.text.is_empty());
    }

    #[test]
    fn test_domain_serialization() {
        let fqdn = Fqdn::parse("x1.lb.rancher.cloud").unwrap();
        let domain = Domain::with_hosts(&fqdn, BTreeSet::from(["1.1.1.1".to_string()]), None);
        let json = serde_json::to_string(&domain).unwrap();
        assert!(json.contains(r#""hosts":["1.1.1.1"]"#));
        assert!(!json.contains("text"));

        let domain = Domain::with_text(&fqdn, "hello".into(), None);
        let json = serde_json::to_string(&domain).unwrap();
        assert!(json.contains(r#""text":"hello""#));
        assert!(!json.contains("hosts"));
    }
}
