//! [`SqliteStore`], the SQLite implementation of [`DiscussionStore`].

use std::{collections::HashSet, path::Path};

use folio_core::{
  catalog::{Book, Role, User},
  comment::{Comment, NewComment},
  store::{DiscussionStore, InsertOutcome, Relation},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawComment, RawUser, decode_uuid, encode_dt, encode_role, encode_uuid, now,
  },
  schema::{SCHEMA, relation_table},
};

const COMMENT_COLUMNS: &str =
  "comment_id, book_id, author_id, parent_id, content, created_at";

const OLDEST_FIRST: &str = "created_at, comment_id";
const NEWEST_FIRST: &str = "created_at DESC, comment_id DESC";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folio discussion store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Registry ──────────────────────────────────────────────────────────────
  //
  // Users and books belong to the surrounding catalog; these exist so a store
  // can be populated for tests and demo data.

  pub async fn add_user(&self, username: &str, role: Role) -> Result<User> {
    let user = User {
      user_id:    Uuid::new_v4(),
      username:   username.to_owned(),
      role,
      created_at: now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let name     = user.username.clone();
    let role_str = encode_role(role).to_owned();
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, role, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  pub async fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
    let name = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, username, role, created_at FROM users WHERE username = ?1",
            rusqlite::params![name],
            raw_user,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  pub async fn add_book(&self, title: &str) -> Result<Book> {
    let book = Book {
      book_id:    Uuid::new_v4(),
      title:      title.to_owned(),
      created_at: now(),
    };

    let id_str = encode_uuid(book.book_id);
    let title  = book.title.clone();
    let at_str = encode_dt(book.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO books (book_id, title, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, title, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(book)
  }

  /// `SELECT 1 FROM {table} WHERE {key_col} = ?1`
  async fn row_exists(
    &self,
    table: &'static str,
    key_col: &'static str,
    key: Uuid,
  ) -> Result<bool> {
    let key_str = encode_uuid(key);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT 1 FROM {table} WHERE {key_col} = ?1"),
            rusqlite::params![key_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some())
      })
      .await?;

    Ok(exists)
  }

  /// Load comments matching `where_clause` (with `?1` bound to `key`),
  /// sorted by `order_by`.
  async fn load_comments(
    &self,
    where_clause: &'static str,
    order_by: &'static str,
    key: Uuid,
  ) -> Result<Vec<Comment>> {
    let key_str = encode_uuid(key);

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        Ok(query_comments(conn, where_clause, order_by, &key_str)?)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:    row.get(0)?,
    username:   row.get(1)?,
    role:       row.get(2)?,
    created_at: row.get(3)?,
  })
}

/// Comment rows in `order_by` order, each with its likers in like order.
fn query_comments(
  conn: &rusqlite::Connection,
  where_clause: &str,
  order_by: &str,
  key: &str,
) -> rusqlite::Result<Vec<RawComment>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COMMENT_COLUMNS} FROM comments
     WHERE {where_clause}
     ORDER BY {order_by}"
  ))?;
  let mut rows = stmt
    .query_map(rusqlite::params![key], |row| {
      Ok(RawComment {
        comment_id: row.get(0)?,
        book_id:    row.get(1)?,
        author_id:  row.get(2)?,
        parent_id:  row.get(3)?,
        content:    row.get(4)?,
        created_at: row.get(5)?,
        liked_by:   Vec::new(),
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut likes = conn.prepare_cached(
    "SELECT user_id FROM comment_likes WHERE comment_id = ?1 ORDER BY rowid",
  )?;
  for raw in &mut rows {
    raw.liked_by = likes
      .query_map(rusqlite::params![raw.comment_id], |r| r.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;
  }

  Ok(rows)
}

// ─── DiscussionStore impl ────────────────────────────────────────────────────

impl DiscussionStore for SqliteStore {
  type Error = Error;

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn comments_for_book(&self, book_id: Uuid) -> Result<Vec<Comment>> {
    self.load_comments("book_id = ?1", OLDEST_FIRST, book_id).await
  }

  async fn root_comments_for_book(&self, book_id: Uuid) -> Result<Vec<Comment>> {
    self
      .load_comments("book_id = ?1 AND parent_id IS NULL", NEWEST_FIRST, book_id)
      .await
  }

  async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
    let mut found = self
      .load_comments("comment_id = ?1", OLDEST_FIRST, comment_id).await?;
    Ok(found.pop())
  }

  async fn book_of_comment(&self, comment_id: Uuid) -> Result<Option<Uuid>> {
    let id_str = encode_uuid(comment_id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT book_id FROM comments WHERE comment_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_uuid).transpose()
  }

  async fn insert_comment(&self, input: NewComment) -> Result<InsertOutcome> {
    let comment = Comment {
      comment_id: Uuid::new_v4(),
      book_id:    input.book_id,
      author_id:  input.author_id,
      parent_id:  input.parent_id,
      content:    input.content,
      created_at: now(),
      liked_by:   Vec::new(),
    };

    let id_str     = encode_uuid(comment.comment_id);
    let book_str   = encode_uuid(comment.book_id);
    let author_str = encode_uuid(comment.author_id);
    let parent_str = comment.parent_id.map(encode_uuid);
    let content    = comment.content.clone();
    let at_str     = encode_dt(comment.created_at);

    // `Err(Some(book))` names the parent's actual book.
    let rejected: std::result::Result<(), Option<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The parent check and the insert share one transaction so a reply
        // can never land in a different book than its parent.
        if let Some(parent) = &parent_str {
          let parent_book: Option<String> = tx
            .query_row(
              "SELECT book_id FROM comments WHERE comment_id = ?1",
              rusqlite::params![parent],
              |r| r.get(0),
            )
            .optional()?;
          match parent_book {
            None => return Ok(Err(None)),
            Some(b) if b != book_str => return Ok(Err(Some(b))),
            Some(_) => {}
          }
        }

        tx.execute(
          "INSERT INTO comments (
             comment_id, book_id, author_id, parent_id, content, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, book_str, author_str, parent_str, content, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    match rejected {
      Ok(()) => Ok(InsertOutcome::Inserted(comment)),
      Err(None) => Ok(InsertOutcome::ParentMissing),
      Err(Some(parent_book)) => Ok(InsertOutcome::ParentInOtherBook {
        parent_book: decode_uuid(&parent_book)?,
      }),
    }
  }

  async fn delete_comment_tree(&self, comment_id: Uuid) -> Result<Vec<Uuid>> {
    let id_str = encode_uuid(comment_id);

    let removed: Vec<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // UNION (not UNION ALL) stops on a repeated id.
        let ids: Vec<String> = {
          let mut stmt = tx.prepare(
            "WITH RECURSIVE subtree(id) AS (
               SELECT comment_id FROM comments WHERE comment_id = ?1
               UNION
               SELECT c.comment_id FROM comments c JOIN subtree s ON c.parent_id = s.id
             )
             SELECT id FROM subtree",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![id_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        // Deepest first, so no delete has to cascade.
        for id in ids.iter().rev() {
          tx.execute(
            "DELETE FROM comments WHERE comment_id = ?1",
            rusqlite::params![id],
          )?;
        }
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    removed.iter().map(|s| decode_uuid(s)).collect()
  }

  // ── Relations ─────────────────────────────────────────────────────────────

  async fn members(
    &self,
    relation: Relation,
    subject: Uuid,
  ) -> Result<Option<Vec<Uuid>>> {
    let rt          = relation_table(relation);
    let subject_str = encode_uuid(subject);

    let raw: Option<Vec<String>> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            &format!("SELECT 1 FROM {} WHERE {} = ?1", rt.subject_table, rt.subject_col),
            rusqlite::params![subject_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        let mut stmt = conn.prepare(&format!(
          "SELECT user_id FROM {} WHERE {} = ?1 ORDER BY rowid",
          rt.table, rt.subject_col
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(Some(rows))
      })
      .await?;

    raw
      .map(|ids| ids.iter().map(|s| decode_uuid(s)).collect())
      .transpose()
  }

  async fn replace_members(
    &self,
    relation: Relation,
    subject: Uuid,
    members: Vec<Uuid>,
  ) -> Result<()> {
    let rt          = relation_table(relation);
    let subject_str = encode_uuid(subject);
    let at_str      = encode_dt(now());

    let mut seen = HashSet::new();
    let wanted: Vec<String> = members
      .into_iter()
      .filter(|m| seen.insert(*m))
      .map(encode_uuid)
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Vec<String> = {
          let mut stmt = tx.prepare(&format!(
            "SELECT user_id FROM {} WHERE {} = ?1",
            rt.table, rt.subject_col
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![subject_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        for gone in current.iter().filter(|m| !wanted.contains(m)) {
          tx.execute(
            &format!(
              "DELETE FROM {} WHERE {} = ?1 AND user_id = ?2",
              rt.table, rt.subject_col
            ),
            rusqlite::params![subject_str, gone],
          )?;
        }
        for added in wanted.iter().filter(|m| !current.contains(m)) {
          tx.execute(
            &format!(
              "INSERT INTO {} ({}, user_id, joined_at) VALUES (?1, ?2, ?3)",
              rt.table, rt.subject_col
            ),
            rusqlite::params![subject_str, added, at_str],
          )?;
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn memberships(&self, relation: Relation, member: Uuid) -> Result<Vec<Uuid>> {
    let rt         = relation_table(relation);
    let member_str = encode_uuid(member);

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM {} WHERE user_id = ?1 ORDER BY rowid",
          rt.subject_col, rt.table
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![member_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  // ── Collaborators ─────────────────────────────────────────────────────────

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, username, role, created_at FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            raw_user,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
    self.row_exists("users", "user_id", user_id).await
  }

  async fn book_exists(&self, book_id: Uuid) -> Result<bool> {
    self.row_exists("books", "book_id", book_id).await
  }
}
