//! SQLite backend for the bounty board.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Multi-row writes each open their own
//! [`rusqlite::Transaction`] inside a single `call`, so no transaction handle
//! is ever shared between requests.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
