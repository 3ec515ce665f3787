//! Bearer/cookie JWT authentication and the failed-attempt limiter.

pub mod attempts;
pub mod middleware;
pub mod models;
pub mod token;

pub use attempts::{AttemptStore, InMemoryAttemptStore};
pub use middleware::{auth_middleware, AuthState};
pub use models::{AccessClaims, Principal};
pub use token::{decode_access_token, issue_access_token};
