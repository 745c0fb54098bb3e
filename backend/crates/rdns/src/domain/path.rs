//! Path Encoding
//!
//! Pure mappings from domain names to storage paths.
//!
//! | What | Path for `x1.lb.rancher.cloud` |
//! |------|--------------------------------|
//! | registration | `<prefix>/cloud/rancher/lb/x1` |
//! | token origin | `<token_root>/x1_lb_rancher_cloud` |
//! | ACME entry (`_acme-challenge.x1...`) | `<prefix>/_txt/_acme-challenge/x1/lb/rancher/cloud` |
//!
//! Registrations reverse the labels so sibling subdomains share a directory.
//! ACME entries keep forward order under one `_txt` root so every pending
//! challenge can be found with a single recursive listing.

use super::value_objects::{ACME_CHALLENGE_LABEL, Fqdn};

/// Root label of the ACME text namespace
pub const TXT_NAMESPACE: &str = "_txt";

/// Escape a host for use as a key segment (`1.2.3.4` -> `1_2_3_4`)
pub fn encode_host_key(host: &str) -> String {
    host.replace('.', "_")
}

/// Labels joined with `/` in forward order (`x1/lb/rancher/cloud`)
pub fn forward_label_path(fqdn: &Fqdn) -> String {
    fqdn.labels().collect::<Vec<_>>().join("/")
}

/// Builds every storage path from a fixed prefix and token root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEncoder {
    prefix: String,
    token_root: String,
}

impl PathEncoder {
    /// Both roots are normalised to a leading `/` and no trailing `/`; an
    /// empty prefix stores registrations at the top of the tree.
    pub fn new(prefix: &str, token_root: &str) -> Self {
        Self {
            prefix: normalize_root(prefix),
            token_root: normalize_root(token_root),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn token_root(&self) -> &str {
        &self.token_root
    }

    /// `<prefix>/cloud/rancher/lb/x1`
    pub fn storage_path(&self, fqdn: &Fqdn) -> String {
        let reversed: Vec<&str> = fqdn.labels().rev().collect();
        format!("{}/{}", self.prefix, reversed.join("/"))
    }

    /// Inverse of [`Self::storage_path`]
    pub fn domain_from_storage_path(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        let labels: Vec<&str> = rest.split('/').rev().collect();
        Some(labels.join("."))
    }

    /// `<token_root>/x1_lb_rancher_cloud`
    pub fn token_path(&self, fqdn: &Fqdn) -> String {
        format!("{}/{}", self.token_root, fqdn.as_str().replace('.', "_"))
    }

    /// Inverse of [`Self::token_path`] for names without underscores
    pub fn domain_from_token_path(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(&self.token_root)?.strip_prefix('/')?;
        if rest.is_empty() || rest.contains('/') {
            return None;
        }
        Some(rest.replace('_', "."))
    }

    /// `<prefix>/_txt/_acme-challenge/x1/lb/rancher/cloud`
    pub fn acme_path(&self, fqdn: &Fqdn) -> String {
        format!(
            "{}/{}/{}",
            self.prefix,
            TXT_NAMESPACE,
            forward_label_path(fqdn)
        )
    }

    /// Directory holding every ACME challenge entry
    pub fn acme_root(&self) -> String {
        format!("{}/{}/{}", self.prefix, TXT_NAMESPACE, ACME_CHALLENGE_LABEL)
    }

    /// Where a text registration for `fqdn` lives
    pub fn text_path(&self, fqdn: &Fqdn) -> String {
        if fqdn.is_acme_challenge() {
            self.acme_path(fqdn)
        } else {
            self.storage_path(fqdn)
        }
    }

    /// Key of one host entry under a registration directory
    pub fn host_key(&self, registration: &str, host: &str) -> String {
        format!("{}/{}", registration, encode_host_key(host))
    }
}

/// Whether an ACME entry key belongs to `fqdn` or one of its subdomains
///
/// Matches on whole labels: the key must end with `/` followed by the
/// forward label path of `fqdn`, so `ax1.lb...` is not taken for `x1.lb...`.
/// This is stricter than a plain substring test on purpose.
pub fn is_acme_entry_for(key: &str, fqdn: &Fqdn) -> bool {
    let suffix = forward_label_path(fqdn);
    key.strip_suffix(suffix.as_str())
        .is_some_and(|head| head.ends_with('/'))
}

fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
