//! Users and books, the collaborators comments and relations point at.
//!
//! Folio does not manage these records beyond reading them; they are owned by
//! the surrounding catalog application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a user is allowed to do beyond their own content.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Reader,
  /// May delete any comment.
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub username:   String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn is_privileged(&self) -> bool { self.role == Role::Admin }
}

/// A book: the collection that owns a set of comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
  pub book_id:    Uuid,
  pub title:      String,
  pub created_at: DateTime<Utc>,
}
