/// Database layer for TaskClock
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Models live in [`crate::models`]; the transactional store built on top of
/// them lives in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
