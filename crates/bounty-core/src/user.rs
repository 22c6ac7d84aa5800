//! Users live in the external identity service and are never persisted here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity-service user identifier. Zero is never a valid user.
pub type UserId = i64;

/// A display identity as reported by the identity service.
///
/// The default value is the empty placeholder shown in place of users the
/// directory does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:   UserId,
  #[serde(default)]
  pub name: String,
}

impl User {
  pub fn is_placeholder(&self) -> bool { self.id == 0 }
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// An in-memory snapshot of the identity directory, fetched once per
/// enrichment call.
#[derive(Debug, Clone, Default)]
pub struct Directory {
  users: HashMap<UserId, User>,
}

impl Directory {
  /// Look up a user, substituting the empty placeholder when unknown.
  pub fn get(&self, id: UserId) -> User {
    self.users.get(&id).cloned().unwrap_or_default()
  }

  /// Like [`Directory::get`] but for an optional reference.
  pub fn get_opt(&self, id: Option<UserId>) -> User {
    id.map(|id| self.get(id)).unwrap_or_default()
  }

  /// A name suitable for ledger comments; falls back to `user #<id>`.
  pub fn display_name(&self, id: UserId) -> String {
    match self.users.get(&id) {
      Some(u) if !u.name.is_empty() => u.name.clone(),
      _ => format!("user #{id}"),
    }
  }

  pub fn len(&self) -> usize { self.users.len() }

  pub fn is_empty(&self) -> bool { self.users.is_empty() }
}

impl FromIterator<User> for Directory {
  fn from_iter<T: IntoIterator<Item = User>>(iter: T) -> Self {
    Self {
      users: iter.into_iter().map(|u| (u.id, u)).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn directory() -> Directory {
    [
      User { id: 1, name: "Aiko".into() },
      User { id: 2, name: String::new() },
    ]
    .into_iter()
    .collect()
  }

  #[test]
  fn unknown_user_is_placeholder() {
    let dir = directory();
    assert_eq!(dir.get(1).name, "Aiko");
    assert!(dir.get(99).is_placeholder());
    assert!(dir.get_opt(None).is_placeholder());
  }

  #[test]
  fn display_name_falls_back_to_id() {
    let dir = directory();
    assert_eq!(dir.display_name(1), "Aiko");
    assert_eq!(dir.display_name(2), "user #2");
    assert_eq!(dir.display_name(7), "user #7");
  }
}
