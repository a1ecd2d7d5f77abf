/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded schema migrations
/// - `transaction`: Runs an ordered sequence of writes atomically
///
/// Models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
pub mod transaction;
