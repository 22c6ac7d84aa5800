//! Core types and trait definitions for the bounty board.
//!
//! Posts, tags, users, and the traits the storage backend and the two
//! collaborator adapters implement. No HTTP or SQL lives here.

// Trait methods spell out `impl Future + Send`; impls use plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod client;
pub mod error;
pub mod post;
pub mod retry;
pub mod settlement;
pub mod store;
pub mod tag;
pub mod user;

pub use error::{DomainError, Error, ErrorKind, Result};
