//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod reconciler;
pub mod record_store;
pub mod refresh;
pub mod service;
pub mod text_store;
pub mod token;

// Re-exports
pub use config::RdnsConfig;
pub use reconciler::HostReconciler;
pub use record_store::RecordStore;
pub use refresh::ExpirationRefresher;
pub use service::DomainService;
pub use text_store::TextRecordStore;
pub use token::TokenManager;
