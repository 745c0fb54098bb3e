//! Domain Value Objects
//!
//! Immutable value types for the registration domain.

use crate::error::{RdnsError, RdnsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First label of an ACME DNS-01 challenge name
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// A normalised fully-qualified domain name
///
/// Lowercase, without a trailing dot, with at least one label and no empty
/// labels. Slashes are rejected because labels become storage path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fqdn(String);

impl Fqdn {
    pub fn parse(name: &str) -> RdnsResult<Self> {
        let trimmed = name.trim();
        let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
        let invalid = trimmed.is_empty()
            || trimmed.split('.').any(str::is_empty)
            || trimmed
                .chars()
                .any(|c| c == '/' || c.is_whitespace() || c.is_control());
        if invalid {
            return Err(RdnsError::InvalidDomain(name.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Labels in written order (`x1`, `lb`, `rancher`, `cloud`)
    pub fn labels(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('.')
    }

    /// This name, if it can own an address registration
    ///
    /// Token keys join labels with `_`, so a name that already contains one
    /// would share its token with the dotted spelling (`a_b.x` and `a.b.x`).
    pub fn registration_name(&self) -> RdnsResult<&Self> {
        if self.0.contains('_') {
            return Err(RdnsError::InvalidDomain(format!(
                "{} (underscores are not allowed in registration names)",
                self.0
            )));
        }
        Ok(self)
    }

    /// Whether this name addresses an ACME challenge TXT record
    pub fn is_acme_challenge(&self) -> bool {
        self.labels().any(|label| label == ACME_CHALLENGE_LABEL)
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fqdn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Structured value stored in a leaf of the key-value store
///
/// Host entries hold `{"host": "<addr>"}`, text registrations hold
/// `{"text": "<value>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Host { host: String },
    Text { text: String },
}

impl RecordValue {
    pub fn host(host: impl Into<String>) -> Self {
        RecordValue::Host { host: host.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        RecordValue::Text { text: text.into() }
    }

    /// Serialise for storage
    pub fn encode(&self) -> RdnsResult<String> {
        serde_json::to_string(self).map_err(|e| RdnsError::Internal(e.to_string()))
    }

    /// Parse a raw stored value read from `key`
    pub fn decode(key: &str, raw: &str) -> RdnsResult<Self> {
        serde_json::from_str(raw).map_err(|e| RdnsError::DataIntegrity {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn into_host(self, key: &str) -> RdnsResult<String> {
        match self {
            RecordValue::Host { host } => Ok(host),
            RecordValue::Text { .. } => Err(RdnsError::DataIntegrity {
                key: key.to_string(),
                reason: "expected a host record, found a text record".to_string(),
            }),
        }
    }

    pub fn into_text(self, key: &str) -> RdnsResult<String> {
        match self {
            RecordValue::Text { text } => Ok(text),
            RecordValue::Host { .. } => Err(RdnsError::DataIntegrity {
                key: key.to_string(),
                reason: "expected a text record, found a host record".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqdn_normalisation() {
        let fqdn = Fqdn::parse(" X1.LB.Rancher.Cloud. ").unwrap();
        assert_eq!(fqdn.as_str(), "x1.lb.rancher.cloud");
        assert_eq!(fqdn.labels().collect::<Vec<_>>(), vec!["x1", "lb", "rancher", "cloud"]);
    }

    #[test]
    fn test_fqdn_rejects_malformed() {
        for bad in ["", ".", "a..b", ".a.b", "a/b.c", "a b.c", "a.b.."] {
            assert!(
                matches!(Fqdn::parse(bad), Err(RdnsError::InvalidDomain(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_registration_name_rejects_underscores() {
        let plain = Fqdn::parse("a.b.lb.rancher.cloud").unwrap();
        assert_eq!(plain.registration_name().unwrap(), &plain);

        for name in ["a_b.lb.rancher.cloud", "_acme-challenge.x1.lb.rancher.cloud"] {
            assert!(matches!(
                Fqdn::parse(name).unwrap().registration_name(),
                Err(RdnsError::InvalidDomain(_))
            ));
        }
    }

    #[test]
    fn test_fqdn_acme_detection() {
        assert!(
            Fqdn::parse("_acme-challenge.x1.lb.rancher.cloud")
                .unwrap()
                .is_acme_challenge()
        );
        assert!(!Fqdn::parse("x1.lb.rancher.cloud").unwrap().is_acme_challenge());
        assert!(
            !Fqdn::parse("_acme-challenges.x1.lb.rancher.cloud")
                .unwrap()
                .is_acme_challenge()
        );
    }

    #[test]
    fn test_record_value_wire_format() {
        assert_eq!(
            RecordValue::host("1.1.1.1").encode().unwrap(),
            r#"{"host":"1.1.1.1"}"#
        );
        assert_eq!(
            RecordValue::text("tok123").encode().unwrap(),
            r#"{"text":"tok123"}"#
        );
    }

    #[test]
    fn test_record_value_escapes_text() {
        let raw = RecordValue::text(r#"v="quoted" \ back"#).encode().unwrap();
        let decoded = RecordValue::decode("/k", &raw).unwrap();
        assert_eq!(decoded.into_text("/k").unwrap(), r#"v="quoted" \ back"#);
    }

    #[test]
    fn test_record_value_decode_variants() {
        let host = RecordValue::decode("/k", r#"{"host": "10.0.0.1"}"#).unwrap();
        assert_eq!(host, RecordValue::host("10.0.0.1"));

        let text = RecordValue::decode("/k", r#"{"text": "hello"}"#).unwrap();
        assert_eq!(text, RecordValue::text("hello"));
    }

    #[test]
    fn test_record_value_integrity_errors() {
        assert!(matches!(
            RecordValue::decode("/k", "not json"),
            Err(RdnsError::DataIntegrity { .. })
        ));
        assert!(matches!(
            RecordValue::decode("/k", r#"{"other": "x"}"#),
            Err(RdnsError::DataIntegrity { .. })
        ));
        assert!(matches!(
            RecordValue::text("x").into_host("/k"),
            Err(RdnsError::DataIntegrity { .. })
        ));
        assert!(matches!(
            RecordValue::host("1.1.1.1").into_text("/k"),
            Err(RdnsError::DataIntegrity { .. })
        ));
    }
}
