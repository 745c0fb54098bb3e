//! Domain Services
//!
//! Pure domain logic: host set reconciliation and random name material.

use platform::crypto::{ALPHANUMERIC, LOWER_ALPHANUMERIC, random_string};
use std::collections::BTreeSet;

/// The minimal set of writes that turns a stored host set into a desired one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPlan {
    /// `desired - current`
    pub to_add: BTreeSet<String>,
    /// `current - desired`
    pub to_remove: BTreeSet<String>,
}

impl HostPlan {
    pub fn compute(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Self {
        Self {
            to_add: desired.difference(current).cloned().collect(),
            to_remove: current.difference(desired).cloned().collect(),
        }
    }

    /// No store operation needed
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of store operations the plan issues
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    /// The host set after the plan has been applied to `current`
    pub fn apply(&self, current: &BTreeSet<String>) -> BTreeSet<String> {
        current
            .difference(&self.to_remove)
            .chain(self.to_add.iter())
            .cloned()
            .collect()
    }
}

/// Random lowercase slug used as the first label of a generated name
pub fn generate_slug(len: usize) -> String {
    random_string(len, LOWER_ALPHANUMERIC)
}

/// Random token origin drawn from the full alphanumeric alphabet
pub fn generate_token_origin(len: usize) -> String {
    random_string(len, ALPHANUMERIC)
}
