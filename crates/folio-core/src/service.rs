//! [`Discussions`]: the operations Folio exposes to its callers.
//!
//! Every call reads fresh from the store; nothing is cached between calls.
//! Errors are never swallowed: each failure comes back as a distinct
//! [`Error`] variant for the caller to turn into a user-facing message.

use uuid::Uuid;

use crate::{
  Entity, Error, Result,
  catalog::User,
  comment::{Comment, NewComment},
  error::store_failure,
  engagement,
  store::{DiscussionStore, InsertOutcome, Relation},
  thread::{self, CommentNode},
};

/// Comment threading, mutation and engagement over a [`DiscussionStore`].
#[derive(Debug, Clone)]
pub struct Discussions<S> {
  store: S,
}

impl<S: DiscussionStore> Discussions<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  // ── Threads ───────────────────────────────────────────────────────────

  /// The display forest for a book. Comments with broken ancestry are shown
  /// as roots rather than dropped.
  pub async fn build_tree(&self, book_id: Uuid) -> Result<Vec<CommentNode>> {
    self.require_book(book_id).await?;

    let all = self
      .store
      .comments_for_book(book_id)
      .await
      .map_err(store_failure("comments_for_book"))?;
    let roots = self
      .store
      .root_comments_for_book(book_id)
      .await
      .map_err(store_failure("root_comments_for_book"))?;

    let fetched = all.len();
    let forest = thread::build_forest(all, roots);
    if !forest.promoted.is_empty() {
      tracing::info!(
        %book_id,
        promoted = forest.promoted.len(),
        "promoted orphan comments to roots"
      );
    }
    tracing::debug!(%book_id, fetched, roots = forest.roots.len(), "built thread");
    Ok(forest.roots)
  }

  /// Every comment of a book as a flat list, newest first.
  pub async fn recent_comments(&self, book_id: Uuid) -> Result<Vec<Comment>> {
    self.require_book(book_id).await?;

    let mut comments = self
      .store
      .comments_for_book(book_id)
      .await
      .map_err(store_failure("comments_for_book"))?;
    comments.sort_by_key(|c| std::cmp::Reverse(c.chronological_key()));
    Ok(comments)
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Create a root comment on `book_id`, or a reply to `parent_id`.
  ///
  /// A reply always lands in its parent's book; passing a different
  /// `book_id` is rejected rather than silently corrected.
  pub async fn create(
    &self,
    book_id: Uuid,
    content: &str,
    author_id: Uuid,
    parent_id: Option<Uuid>,
  ) -> Result<Comment> {
    let content = content.trim();
    if content.is_empty() {
      return Err(Error::InvalidArgument(
        "comment content must not be empty".to_string(),
      ));
    }

    if !self
      .store
      .user_exists(author_id)
      .await
      .map_err(store_failure("user_exists"))?
    {
      return Err(Error::not_found(Entity::User, author_id));
    }

    let book_id = match parent_id {
      None => {
        self.require_book(book_id).await?;
        book_id
      }
      Some(parent) => {
        let parent_book = self
          .store
          .book_of_comment(parent)
          .await
          .map_err(store_failure("book_of_comment"))?
          .ok_or_else(|| Error::not_found(Entity::Comment, parent))?;
        if parent_book != book_id {
          return Err(Error::InvalidArgument(format!(
            "comment {parent} belongs to book {parent_book}, not {book_id}"
          )));
        }
        parent_book
      }
    };

    let outcome = self
      .store
      .insert_comment(NewComment {
        book_id,
        author_id,
        parent_id,
        content: content.to_owned(),
      })
      .await
      .map_err(store_failure("insert_comment"))?;

    // The parent can vanish or move between the check above and the insert.
    let comment = match (outcome, parent_id) {
      (InsertOutcome::Inserted(comment), _) => comment,
      (InsertOutcome::ParentMissing, Some(parent)) => {
        return Err(Error::not_found(Entity::Comment, parent));
      }
      (InsertOutcome::ParentInOtherBook { parent_book }, Some(parent)) => {
        return Err(Error::InvalidArgument(format!(
          "comment {parent} belongs to book {parent_book}, not {book_id}"
        )));
      }
      (InsertOutcome::ParentMissing | InsertOutcome::ParentInOtherBook { .. }, None) => {
        return Err(Error::InvalidArgument(
          "store rejected a root comment as a reply".to_string(),
        ));
      }
    };

    tracing::info!(
      comment_id = %comment.comment_id,
      %book_id,
      parent_id = ?comment.parent_id,
      %author_id,
      "created comment"
    );
    Ok(comment)
  }

  /// Delete a comment and all of its replies, transitively.
  ///
  /// Allowed for the comment's author, or for any actor when
  /// `actor_is_privileged` is set. Returns the ids removed.
  pub async fn delete(
    &self,
    comment_id: Uuid,
    actor_id: Uuid,
    actor_is_privileged: bool,
  ) -> Result<Vec<Uuid>> {
    let comment = self
      .store
      .get_comment(comment_id)
      .await
      .map_err(store_failure("get_comment"))?
      .ok_or_else(|| Error::not_found(Entity::Comment, comment_id))?;

    if !actor_is_privileged && comment.author_id != actor_id {
      return Err(Error::PermissionDenied { actor: actor_id, comment: comment_id });
    }

    let removed = self
      .store
      .delete_comment_tree(comment_id)
      .await
      .map_err(store_failure("delete_comment_tree"))?;

    tracing::info!(
      %comment_id,
      %actor_id,
      privileged = actor_is_privileged,
      removed = removed.len(),
      "deleted comment thread"
    );
    Ok(removed)
  }

  // ── Engagement ────────────────────────────────────────────────────────

  /// Like or unlike a comment. Returns `true` if the comment is now liked.
  pub async fn toggle_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<bool> {
    engagement::toggle(&self.store, Relation::CommentLike, comment_id, user_id).await
  }

  /// Favorite or unfavorite a book. Returns `true` if the book is now a
  /// favorite.
  pub async fn toggle_favorite(&self, book_id: Uuid, user_id: Uuid) -> Result<bool> {
    engagement::toggle(&self.store, Relation::BookFavorite, book_id, user_id).await
  }

  pub async fn is_favorited(&self, book_id: Uuid, user_id: Uuid) -> Result<bool> {
    engagement::is_member(&self.store, Relation::BookFavorite, book_id, user_id)
      .await
  }

  /// The books a user has favorited, in the order they were favorited.
  pub async fn favorites_of(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
    self.require_user(user_id).await?;
    self
      .store
      .memberships(Relation::BookFavorite, user_id)
      .await
      .map_err(store_failure("memberships"))
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  pub async fn require_user(&self, user_id: Uuid) -> Result<User> {
    self
      .store
      .get_user(user_id)
      .await
      .map_err(store_failure("get_user"))?
      .ok_or_else(|| Error::not_found(Entity::User, user_id))
  }

  async fn require_book(&self, book_id: Uuid) -> Result<()> {
    if self
      .store
      .book_exists(book_id)
      .await
      .map_err(store_failure("book_exists"))?
    {
      Ok(())
    } else {
      Err(Error::not_found(Entity::Book, book_id))
    }
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  // A store whose every call fails, for exercising the error paths only.
  #[derive(Debug, thiserror::Error)]
  #[error("backend offline")]
  struct Offline;

  struct OfflineStore;

  impl DiscussionStore for OfflineStore {
    type Error = Offline;
    async fn comments_for_book(&self, _: Uuid) -> Result<Vec<Comment>, Offline> { Err(Offline) }
    async fn root_comments_for_book(&self, _: Uuid) -> Result<Vec<Comment>, Offline> { Err(Offline) }
    async fn get_comment(&self, _: Uuid) -> Result<Option<Comment>, Offline> { Err(Offline) }
    async fn book_of_comment(&self, _: Uuid) -> Result<Option<Uuid>, Offline> { Err(Offline) }
    async fn insert_comment(&self, _: NewComment) -> Result<InsertOutcome, Offline> { Err(Offline) }
    async fn delete_comment_tree(&self, _: Uuid) -> Result<Vec<Uuid>, Offline> { Err(Offline) }
    async fn members(&self, _: Relation, _: Uuid) -> Result<Option<Vec<Uuid>>, Offline> { Err(Offline) }
    async fn replace_members(&self, _: Relation, _: Uuid, _: Vec<Uuid>) -> Result<(), Offline> { Err(Offline) }
    async fn memberships(&self, _: Relation, _: Uuid) -> Result<Vec<Uuid>, Offline> { Err(Offline) }
    async fn get_user(&self, _: Uuid) -> Result<Option<User>, Offline> { Err(Offline) }
    async fn user_exists(&self, _: Uuid) -> Result<bool, Offline> { Err(Offline) }
    async fn book_exists(&self, _: Uuid) -> Result<bool, Offline> { Err(Offline) }
  }

  // Passes the caller-side parent checks, then reports `outcome` from the
  // insert, as if the parent changed in between.
  struct RacingStore {
    book:    Uuid,
    outcome: InsertOutcome,
  }

  impl DiscussionStore for RacingStore {
    type Error = Offline;
    async fn comments_for_book(&self, _: Uuid) -> Result<Vec<Comment>, Offline> { Err(Offline) }
    async fn root_comments_for_book(&self, _: Uuid) -> Result<Vec<Comment>, Offline> { Err(Offline) }
    async fn get_comment(&self, _: Uuid) -> Result<Option<Comment>, Offline> { Err(Offline) }
    async fn book_of_comment(&self, _: Uuid) -> Result<Option<Uuid>, Offline> { Ok(Some(self.book)) }
    async fn insert_comment(&self, _: NewComment) -> Result<InsertOutcome, Offline> {
      Ok(self.outcome.clone())
    }
    async fn delete_comment_tree(&self, _: Uuid) -> Result<Vec<Uuid>, Offline> { Err(Offline) }
    async fn members(&self, _: Relation, _: Uuid) -> Result<Option<Vec<Uuid>>, Offline> { Err(Offline) }
    async fn replace_members(&self, _: Relation, _: Uuid, _: Vec<Uuid>) -> Result<(), Offline> { Err(Offline) }
    async fn memberships(&self, _: Relation, _: Uuid) -> Result<Vec<Uuid>, Offline> { Err(Offline) }
    async fn get_user(&self, _: Uuid) -> Result<Option<User>, Offline> { Err(Offline) }
    async fn user_exists(&self, _: Uuid) -> Result<bool, Offline> { Ok(true) }
    async fn book_exists(&self, _: Uuid) -> Result<bool, Offline> { Ok(true) }
  }

  #[tokio::test]
  async fn parent_deleted_before_insert_is_not_found() {
    let book = Uuid::new_v4();
    let parent = Uuid::new_v4();
    let d = Discussions::new(RacingStore { book, outcome: InsertOutcome::ParentMissing });

    let err = d.create(book, "late reply", Uuid::new_v4(), Some(parent)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: Entity::Comment, id } if id == parent));
  }

  #[tokio::test]
  async fn parent_moved_before_insert_is_invalid() {
    let book = Uuid::new_v4();
    let elsewhere = Uuid::new_v4();
    let d = Discussions::new(RacingStore {
      book,
      outcome: InsertOutcome::ParentInOtherBook { parent_book: elsewhere },
    });

    let err = d
      .create(book, "late reply", Uuid::new_v4(), Some(Uuid::new_v4()))
      .await
      .unwrap_err();
    assert!(matches!(&err, Error::InvalidArgument(msg) if msg.contains(&elsewhere.to_string())));
  }

  #[tokio::test]
  async fn blank_content_rejected_before_store_is_touched() {
    let d = Discussions::new(OfflineStore);
    let err = d.create(Uuid::new_v4(), " \n ", Uuid::new_v4(), None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
  }

  #[tokio::test]
  async fn store_failures_surface_as_store_errors() {
    let d = Discussions::new(OfflineStore);
    let id = Uuid::new_v4();

    assert!(matches!(d.build_tree(id).await, Err(Error::Store(_))));
    assert!(matches!(d.delete(id, id, true).await, Err(Error::Store(_))));
    assert!(matches!(d.toggle_like(id, id).await, Err(Error::Store(_))));
    assert!(matches!(d.favorites_of(id).await, Err(Error::Store(_))));

    let Err(Error::Store(source)) = d.create(id, "hi", id, None).await else {
      panic!("expected a store error");
    };
    assert_eq!(source.to_string(), "backend offline");
  }
}
