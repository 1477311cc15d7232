//! Infrastructure layer: row stores and configuration.

pub mod config;
pub mod store;

pub use config::{ConfigError, DatabaseConfig};
pub use store::{FetchOptions, Filter, InMemoryStore, PostgresStore, Store};
