//! Database module for the SQLite store
//!
//! Connection pooling and the sample database bootstrap.

pub mod connection;
pub mod seed;

pub use connection::{init_pool, DbPool};
