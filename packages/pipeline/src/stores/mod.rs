//! Storage implementations for the pipeline.
//!
//! Available backends:
//! - `MemoryStore` - In-memory persistence, queue and object storage (always available)
//! - `FilesystemObjectStore` - Local-directory document archive (always available)
//! - `PostgresStore` / `PostgresQueue` - PostgreSQL persistence and queue (requires `postgres` feature)

pub mod filesystem;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use filesystem::FilesystemObjectStore;
pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresQueue, PostgresStore};
