//! # Taskboard Shared Library
//!
//! Data layer and authorization primitives used by the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, JWT tokens, auth context and the project access guard
//! - `db`: Connection pool, migrations and the transaction helper
//! - `pagination`: `limit`/`offset` parameters and the list envelope
//! - `query`: Helpers for building filtered SQL safely

pub mod auth;
pub mod db;
pub mod models;
pub mod pagination;
pub mod query;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
