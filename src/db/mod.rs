//! Database module for PostgreSQL connection and schema introspection
//!
//! The database is only ever read: column names feed the schema context of a prompt.

pub mod connection;
pub mod introspector;

pub use connection::lazy_pool;
pub use introspector::PgColumnSource;
