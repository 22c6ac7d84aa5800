//! Presentation joins: posts decorated with display identities and tags.
//!
//! Unknown users never fail enrichment; they show as the empty placeholder.
//! A post without a requester does, because no persisted post may lack one.

use bounty_core::{
  Error, Result,
  post::Post,
  store::PostStore,
  tag::Tag,
  user::{Directory, User},
};
use serde::Serialize;

/// A post with its requester and helper identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
  pub post:      Post,
  pub requester: User,
  /// The placeholder when no helper is assigned.
  pub helper:    User,
}

/// A post with its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithTags {
  pub post: Post,
  pub tags: Vec<Tag>,
}

/// A post with identities and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
  pub post:      Post,
  pub requester: User,
  pub helper:    User,
  pub tags:      Vec<Tag>,
}

impl PostView {
  pub fn with_tags(self, tags: Vec<Tag>) -> PostDetail {
    PostDetail {
      post: self.post,
      requester: self.requester,
      helper: self.helper,
      tags,
    }
  }
}

/// Decorate one post using an already-fetched directory.
pub fn attach_identity(post: Post, directory: &Directory) -> Result<PostView> {
  if post.requester_id == 0 {
    return Err(Error::Data(format!("post {} has no requester", post.id)));
  }
  Ok(PostView {
    requester: directory.get(post.requester_id),
    helper: directory.get_opt(post.helper_id),
    post,
  })
}

/// Decorate each post with requester and helper identities.
pub fn attach_identities(
  posts: Vec<Post>,
  directory: &Directory,
) -> Result<Vec<PostView>> {
  posts
    .into_iter()
    .map(|post| attach_identity(post, directory))
    .collect()
}

/// Attach each post's tags, queried through the post–tag links.
pub async fn attach_tags<S: PostStore>(
  store: &S,
  posts: Vec<Post>,
) -> Result<Vec<PostWithTags>> {
  let mut out = Vec::with_capacity(posts.len());
  for post in posts {
    let tags = store.tags_for_post(post.id).await.map_err(Error::store)?;
    out.push(PostWithTags { post, tags });
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use bounty_core::post::PostStatus;
  use chrono::Utc;

  use super::*;

  fn post(id: i64, requester_id: i64, helper_id: Option<i64>) -> Post {
    Post {
      id,
      requester_id,
      helper_id,
      body: "fix sink".into(),
      point: 100,
      status: PostStatus::Open,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn directory() -> Directory {
    [User { id: 1, name: "Aiko".into() }, User { id: 2, name: "Ben".into() }]
      .into_iter()
      .collect()
  }

  #[test]
  fn attaches_known_identities() {
    let views =
      attach_identities(vec![post(10, 1, Some(2))], &directory()).unwrap();
    assert_eq!(views[0].requester.name, "Aiko");
    assert_eq!(views[0].helper.name, "Ben");
  }

  #[test]
  fn unknown_helper_becomes_placeholder() {
    let views =
      attach_identities(vec![post(10, 1, Some(99)), post(11, 42, None)], &directory())
        .unwrap();
    assert_eq!(views[0].helper, User::default());
    assert_eq!(views[1].requester, User::default());
    assert!(views[1].helper.is_placeholder());
  }

  #[test]
  fn missing_requester_is_a_data_error() {
    let err =
      attach_identities(vec![post(10, 1, None), post(11, 0, None)], &directory())
        .unwrap_err();
    assert!(matches!(err, Error::Data(_)));
  }
}
