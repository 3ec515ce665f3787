//! Sharebox API Library
//!
//! HTTP boundary of the service: authentication, multipart buffering, the
//! file lifecycle and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod response;
pub mod services;
pub mod setup;
mod telemetry;
pub mod utils;

pub mod auth;
pub mod error;
pub mod state;

pub use error::{ErrorEnvelope, HttpAppError};
pub use response::ApiResponse;
pub use services::file_lifecycle::FileLifecycleService;
