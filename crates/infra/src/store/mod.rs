//! Storage collaborator boundary.
//!
//! The model layer persists rows through the [`Store`] trait without making any
//! storage assumptions. Stores are shallow: they read and write single tables
//! and never load relations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{FetchOptions, Filter, Store};
