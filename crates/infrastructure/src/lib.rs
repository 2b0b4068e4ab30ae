//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_control_store;
mod postgres_access_control_store;

pub use in_memory_access_control_store::InMemoryAccessControlStore;
pub use postgres_access_control_store::PostgresAccessControlStore;
