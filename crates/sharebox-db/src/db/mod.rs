//! File metadata repositories.
//!
//! [`FileRepository`] is the seam the API depends on. [`PgFileRepository`]
//! backs it with Postgres; [`InMemoryFileRepository`] serves development
//! setups without `DATABASE_URL` and the integration tests.

pub mod file;
pub mod memory;

pub use file::{FileRepository, PgFileRepository};
pub use memory::InMemoryFileRepository;
