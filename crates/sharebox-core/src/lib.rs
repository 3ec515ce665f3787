//! Sharebox Core Library
//!
//! This crate provides core domain models, error types and configuration
//! that are shared across all Sharebox components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, PipelineSettings, ServiceConfig, StorageSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    FileRecord, FileStatus, MediaProbe, QualityTier, RemoteObject, ResourceKind, StreamEntry,
    UploadInput, UploadResult, UploadSource,
};
pub use storage_types::StoreBackend;
