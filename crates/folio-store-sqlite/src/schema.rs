//! SQL schema for the Folio SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

use folio_core::store::Relation;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    role        TEXT NOT NULL DEFAULT 'reader',   -- 'reader' | 'admin'
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS books (
    book_id     TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- parent_id is never updated after insert, so a stored chain cannot form a
-- cycle. Deleting a parent cascades to its replies.
CREATE TABLE IF NOT EXISTS comments (
    comment_id  TEXT PRIMARY KEY,
    book_id     TEXT NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    author_id   TEXT NOT NULL REFERENCES users(user_id),
    parent_id   TEXT REFERENCES comments(comment_id) ON DELETE CASCADE,
    content     TEXT NOT NULL CHECK (length(trim(content)) > 0),
    created_at  TEXT NOT NULL      -- RFC 3339 UTC, microseconds; server-assigned
);

-- Membership tables. rowid order is join order.
CREATE TABLE IF NOT EXISTS comment_likes (
    comment_id  TEXT NOT NULL REFERENCES comments(comment_id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    joined_at   TEXT NOT NULL,
    PRIMARY KEY (comment_id, user_id)
);

CREATE TABLE IF NOT EXISTS book_favorites (
    book_id     TEXT NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    joined_at   TEXT NOT NULL,
    PRIMARY KEY (book_id, user_id)
);

CREATE INDEX IF NOT EXISTS comments_book_idx    ON comments(book_id);
CREATE INDEX IF NOT EXISTS comments_parent_idx  ON comments(parent_id);
CREATE INDEX IF NOT EXISTS likes_user_idx       ON comment_likes(user_id);
CREATE INDEX IF NOT EXISTS favorites_user_idx   ON book_favorites(user_id);

PRAGMA user_version = 1;
";

/// Where a [`Relation`] lives: its membership table, the column naming the
/// subject, and the table the subject must exist in.
pub struct RelationTable {
  pub table:         &'static str,
  pub subject_col:   &'static str,
  pub subject_table: &'static str,
}

pub fn relation_table(relation: Relation) -> RelationTable {
  match relation {
    Relation::CommentLike => RelationTable {
      table:         "comment_likes",
      subject_col:   "comment_id",
      subject_table: "comments",
    },
    Relation::BookFavorite => RelationTable {
      table:         "book_favorites",
      subject_col:   "book_id",
      subject_table: "books",
    },
  }
}
