//! # TaskClock Shared Library
//!
//! Domain kernel and data layer of TaskClock: projects with members, tasks
//! moving through CREATED → IN_PROGRESS → DONE, and accounting of the time
//! spent on them.
//!
//! ## Module Organization
//!
//! - `time`: millisecond arithmetic, time filters, injectable clock
//! - `models`: database models and their `sqlx` queries
//! - `store`: storage traits with PostgreSQL and in-memory implementations
//! - `guards`: membership and authorization checks over a project snapshot
//! - `lifecycle`: task status state machine
//! - `aggregation`: time-spent roll-ups per project and per developer
//! - `commands`: transactional use cases tying the above together
//! - `error`: command error taxonomy
//! - `auth`: password hashing, JWT, Axum auth middleware
//! - `db`: connection pool and migrations

pub mod aggregation;
pub mod auth;
pub mod commands;
pub mod db;
pub mod error;
pub mod guards;
pub mod lifecycle;
pub mod models;
pub mod store;
pub mod time;

/// Current version of the TaskClock shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
