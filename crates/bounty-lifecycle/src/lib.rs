//! Post lifecycle engine and enrichment layer.
//!
//! [`Lifecycle`] owns the state machine (`Open → Payment → Acceptance`) and
//! the point accounting that goes with it. It is generic over the
//! [`PostStore`](bounty_core::store::PostStore) backend and both external
//! collaborators, so it carries no HTTP or database code of its own.

pub mod engine;
pub mod enrich;

pub use engine::Lifecycle;
pub use enrich::{PostDetail, PostView, PostWithTags};
