//! Comment records as stored: flat rows with an optional parent pointer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored comment. The reply structure is implied by `parent_id`; see
/// [`crate::thread`] for turning a flat set into a forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  /// The book this comment belongs to. Replies always share their root's
  /// book.
  pub book_id:    Uuid,
  pub author_id:  Uuid,
  /// `None` for a root comment.
  pub parent_id:  Option<Uuid>,
  pub content:    String,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
  /// Users who liked this comment, in the order they liked it. Membership
  /// only; no user appears twice.
  pub liked_by:   Vec<Uuid>,
}

impl Comment {
  pub fn is_root(&self) -> bool { self.parent_id.is_none() }

  pub fn like_count(&self) -> usize { self.liked_by.len() }

  pub fn is_liked_by(&self, user_id: Uuid) -> bool {
    self.liked_by.contains(&user_id)
  }

  /// Key used wherever comments are listed chronologically: creation time,
  /// then id so equal timestamps still order deterministically.
  pub fn chronological_key(&self) -> (DateTime<Utc>, Uuid) {
    (self.created_at, self.comment_id)
  }
}

/// Input to [`crate::store::DiscussionStore::insert_comment`].
/// `comment_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewComment {
  pub book_id:   Uuid,
  pub author_id: Uuid,
  pub parent_id: Option<Uuid>,
  pub content:   String,
}
