//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by every
//! crate in the workspace:
//! - Error classification ([`error::kind::ErrorKind`])
//! - The unified error type and result alias ([`error::app_error::AppError`])
//! - Conversions from common library errors
//!
//! Only things that have the same meaning in every layer belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
