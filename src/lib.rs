pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod source;

pub use config::AppConfig;
pub use error::{AuditError, CatalogError, DecodeError};
pub use service::{validate, AuditEngine, EngineOptions};
