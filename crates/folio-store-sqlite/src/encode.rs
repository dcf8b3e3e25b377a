//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so text order equals time order. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use folio_core::{
  catalog::{Role, User},
  comment::Comment,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps, so values handed back
/// from writes compare equal to values read later.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ─────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Reader => "reader",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "reader" => Ok(Role::Reader),
    "admin" => Ok(Role::Admin),
    other => Err(Error::UnknownRole(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `comments` row plus its likers, in like order.
pub struct RawComment {
  pub comment_id: String,
  pub book_id:    String,
  pub author_id:  String,
  pub parent_id:  Option<String>,
  pub content:    String,
  pub created_at: String,
  pub liked_by:   Vec<String>,
}

impl RawComment {
  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      book_id:    decode_uuid(&self.book_id)?,
      author_id:  decode_uuid(&self.author_id)?,
      parent_id:  self.parent_id.as_deref().map(decode_uuid).transpose()?,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
      liked_by:   self
        .liked_by
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
