//! The `DiscussionStore` trait: everything Folio needs from durable storage.
//!
//! The trait is implemented by storage backends (e.g. `folio-store-sqlite`).
//! The threading, engagement and mutation logic in this crate depends only on
//! this abstraction.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Entity,
  catalog::User,
  comment::{Comment, NewComment},
};

// ─── Relations ───────────────────────────────────────────────────────────────

/// A binary user ↔ subject relation whose only state is membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
  /// user ↔ comment
  CommentLike,
  /// user ↔ book
  BookFavorite,
}

impl Relation {
  /// The kind of record on the subject side of the relation.
  pub fn subject(self) -> Entity {
    match self {
      Self::CommentLike => Entity::Comment,
      Self::BookFavorite => Entity::Book,
    }
  }
}

// ─── Insert outcome ──────────────────────────────────────────────────────────

/// What [`DiscussionStore::insert_comment`] did with a new comment.
///
/// A reply's parent is re-checked in the same unit of work as the insert, so
/// a parent deleted or found in another book after the caller's own checks is
/// reported here rather than as a backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted(Comment),
  /// The parent no longer exists; nothing was written.
  ParentMissing,
  /// The parent belongs to a different book; nothing was written.
  ParentInOtherBook { parent_book: Uuid },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Folio storage backend.
///
/// Every method is a single unit of work: multi-row writes
/// ([`insert_comment`](Self::insert_comment),
/// [`delete_comment_tree`](Self::delete_comment_tree),
/// [`replace_members`](Self::replace_members)) either apply completely or
/// not at all.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DiscussionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Every comment of a book, flat, with no ordering guarantee.
  fn comments_for_book(
    &self,
    book_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Only the comments of a book whose stored parent is empty. This is the
  /// authoritative answer to "is this a root", newest first (ties by id,
  /// descending).
  fn root_comments_for_book(
    &self,
    book_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Retrieve a comment by id. Returns `None` if not found.
  fn get_comment(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// The book owning a comment, or `None` if the comment does not exist.
  fn book_of_comment(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  /// Persist a new comment. The store assigns `comment_id` and `created_at`.
  /// For a reply, the parent's existence and book are checked in the same
  /// unit of work as the insert; if the backend keeps explicit child lists,
  /// the parent's list is updated there too.
  fn insert_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Delete a comment and every transitive descendant atomically. Returns the
  /// ids removed (empty if the comment did not exist).
  fn delete_comment_tree(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Relations ─────────────────────────────────────────────────────────

  /// The current members of `relation` for `subject`, in the order they
  /// joined. Returns `None` if the subject itself does not exist.
  fn members(
    &self,
    relation: Relation,
    subject: Uuid,
  ) -> impl Future<Output = Result<Option<Vec<Uuid>>, Self::Error>> + Send + '_;

  /// Overwrite the full member set of `relation` for `subject` in one write.
  fn replace_members(
    &self,
    relation: Relation,
    subject: Uuid,
    members: Vec<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The subjects `member` belongs to under `relation`, in the order joined.
  fn memberships(
    &self,
    relation: Relation,
    member: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Collaborators ─────────────────────────────────────────────────────

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn user_exists(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn book_exists(
    &self,
    book_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
