//! The acting user, as asserted by the upstream authenticator.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use folio_core::{catalog::User, service::Discussions, store::DiscussionStore};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const ACTOR_HEADER: &str = "x-user-id";

/// The user performing a request. Resolved against the store, so the role
/// (and hence delete privilege) always comes from stored data.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl<S> FromRequestParts<Arc<Discussions<S>>> for Actor
where
  S: DiscussionStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<Discussions<S>>,
  ) -> Result<Self, Self::Rejection> {
    let user_id = parts
      .headers
      .get(ACTOR_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| Uuid::parse_str(s.trim()).ok())
      .ok_or_else(|| {
        ApiError::Unauthorized(format!("missing or malformed {ACTOR_HEADER} header"))
      })?;

    match state.require_user(user_id).await {
      Ok(user) => Ok(Actor(user)),
      Err(folio_core::Error::NotFound { .. }) => {
        Err(ApiError::Unauthorized(format!("unknown user {user_id}")))
      }
      Err(e) => Err(e.into()),
    }
  }
}
