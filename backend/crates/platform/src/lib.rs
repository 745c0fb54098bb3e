//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographically secure random identifiers (slugs, tokens)
//! - Constant-time comparison
//! - Environment-variable configuration helpers

pub mod config;
pub mod crypto;
