//! rdns Registration Core
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, path encoding, store contract
//! - `application/` - Token manager, record stores, expiration refresher
//! - `infra/` - etcd v2 and in-memory store implementations
//!
//! ## Storage Model
//! - A registration is a directory at the reversed label path of its name,
//!   holding one `{"host": ..}` leaf per address
//! - A text registration is a single `{"text": ..}` leaf; ACME challenge
//!   names live in a forward-ordered `_txt` namespace instead
//! - Every registration has an ownership token at a flat path, written with
//!   the same TTL and refreshed with it
//! - Operations are sequences of individually atomic store calls; nothing
//!   locks across them, so concurrent updates of one name are last writer
//!   wins per host key

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::{DomainService, RdnsConfig};
pub use domain::entities::{Domain, DomainOptions};
pub use domain::value_objects::Fqdn;
pub use error::{RdnsError, RdnsResult};
pub use infra::{EtcdConfig, EtcdStore, MemoryStore};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, ResultExt},
    kind::ErrorKind,
};
