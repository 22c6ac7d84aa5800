//! Tags and the tag resolver.
//!
//! A tag is unique by its body (case-sensitive). Resolution looks the body up
//! first and only creates a row when none exists, so resolving the same body
//! twice always yields the same tag.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::post::PostId;

/// Store-assigned tag identifier.
pub type TagId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
  pub id:   TagId,
  pub body: String,
}

/// Association between a post and a tag. The pair is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostTag {
  pub post_id: PostId,
  pub tag_id:  TagId,
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Synchronous tag access within a single unit of work (typically an open
/// database transaction).
pub trait TagRepository {
  type Error;

  /// Exact, case-sensitive lookup.
  fn find_by_body(&mut self, body: &str) -> Result<Option<Tag>, Self::Error>;

  /// Insert a tag with `body`. If a row with that body appeared since the
  /// lookup, implementations return the existing row instead of failing.
  fn insert(&mut self, body: &str) -> Result<Tag, Self::Error>;
}

/// The outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub tag:     Tag,
  /// `true` if this call inserted the row.
  pub created: bool,
}

/// Return the tag whose body is `body`, creating it if absent.
pub fn resolve<R: TagRepository>(
  repo: &mut R,
  body: &str,
) -> Result<Resolved, R::Error> {
  if let Some(tag) = repo.find_by_body(body)? {
    debug!(tag_id = tag.id, body, "reusing existing tag");
    return Ok(Resolved { tag, created: false });
  }

  let tag = repo.insert(body)?;
  debug!(tag_id = tag.id, body, "created tag");
  Ok(Resolved { tag, created: true })
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use super::*;

  #[derive(Default)]
  struct MemoryTags {
    rows:    Vec<Tag>,
    inserts: usize,
  }

  impl TagRepository for MemoryTags {
    type Error = Infallible;

    fn find_by_body(&mut self, body: &str) -> Result<Option<Tag>, Infallible> {
      Ok(self.rows.iter().find(|t| t.body == body).cloned())
    }

    fn insert(&mut self, body: &str) -> Result<Tag, Infallible> {
      self.inserts += 1;
      let tag = Tag { id: self.rows.len() as TagId + 1, body: body.to_owned() };
      self.rows.push(tag.clone());
      Ok(tag)
    }
  }

  #[test]
  fn resolving_twice_yields_same_tag() {
    let mut repo = MemoryTags::default();

    let first = resolve(&mut repo, "plumbing").unwrap();
    let second = resolve(&mut repo, "plumbing").unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.tag, second.tag);
    assert_eq!(repo.inserts, 1);
  }

  #[test]
  fn bodies_are_case_sensitive() {
    let mut repo = MemoryTags::default();

    let lower = resolve(&mut repo, "urgent").unwrap();
    let upper = resolve(&mut repo, "Urgent").unwrap();

    assert_ne!(lower.tag.id, upper.tag.id);
    assert_eq!(repo.rows.len(), 2);
  }
}
