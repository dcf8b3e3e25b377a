//! Error types for `folio-core`.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Comment,
  Book,
  User,
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Comment => "comment",
      Self::Book => "book",
      Self::User => "user",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("user {actor} may not delete comment {comment}")]
  PermissionDenied { actor: Uuid, comment: Uuid },

  /// The backing store could not complete an operation.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

/// Wrap a backend error as [`Error::Store`], logging which call failed.
pub(crate) fn store_failure<E>(op: &'static str) -> impl FnOnce(E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  move |err| {
    tracing::warn!(op, error = %err, "store call failed");
    Error::store(err)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
