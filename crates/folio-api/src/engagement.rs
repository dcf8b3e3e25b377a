//! Handlers for likes and favorites. Every toggle answers with the state it
//! left behind: `{"active": true}` means the actor is now a member.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use folio_core::{service::Discussions, store::DiscussionStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

#[derive(Debug, Serialize)]
pub struct Membership {
  pub active: bool,
}

/// `POST /comments/{id}/like`
pub async fn toggle_like<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<Json<Membership>, ApiError>
where
  S: DiscussionStore + 'static,
{
  let active = discussions.toggle_like(id, actor.user_id).await?;
  Ok(Json(Membership { active }))
}

/// `POST /books/{book_id}/favorite`
pub async fn toggle_favorite<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(book_id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<Json<Membership>, ApiError>
where
  S: DiscussionStore + 'static,
{
  let active = discussions.toggle_favorite(book_id, actor.user_id).await?;
  Ok(Json(Membership { active }))
}

/// `GET /books/{book_id}/favorite`
pub async fn favorite_status<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(book_id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<Json<Membership>, ApiError>
where
  S: DiscussionStore + 'static,
{
  let active = discussions.is_favorited(book_id, actor.user_id).await?;
  Ok(Json(Membership { active }))
}

/// `GET /users/{user_id}/favorites`
pub async fn favorites_of<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
  S: DiscussionStore + 'static,
{
  Ok(Json(discussions.favorites_of(user_id).await?))
}
