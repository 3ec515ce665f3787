pub mod db;

pub use db::{FileRepository, InMemoryFileRepository, PgFileRepository};
