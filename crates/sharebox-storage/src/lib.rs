//! Sharebox Storage Library
//!
//! This crate provides the remote object store abstraction and its backends:
//! a signed REST client for a Cloudinary-style media host and a local
//! filesystem store used for development and tests.
//!
//! # Remote id format
//!
//! Objects are addressed by an opaque remote id. Ids produced by this crate
//! are `{folder}/{name}`; names are either preserved from the local file or
//! generated. Ids must not contain `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-media-host")]
pub mod media_host;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
#[cfg(feature = "storage-media-host")]
pub use media_host::MediaHostStore;
pub use sharebox_core::StoreBackend;
pub use traits::{DestroyOutcome, RemoteStore, StorageError, StorageResult, UploadOptions};
