//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (DomainOptions, Domain)
//! - Domain value objects (Fqdn, RecordValue)
//! - Path encoding (domain name to storage path)
//! - Domain services (host reconciliation, slug and token generation)
//! - Repository traits (the key-value store contract)

pub mod entities;
pub mod path;
pub mod repository;
pub mod services;
pub mod value_objects;
