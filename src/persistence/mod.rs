//! Persistence layer modules.

pub mod contact_repo;
pub mod db;
pub mod group_repo;
pub mod schema;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
