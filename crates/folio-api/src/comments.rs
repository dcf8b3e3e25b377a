//! Handlers for comment threads.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/books/{book_id}/comments` | Optional `?viewer=<user id>` |
//! | `GET`    | `/books/{book_id}/comments/recent` | Flat, newest first |
//! | `POST`   | `/books/{book_id}/comments` | Body: `{"content":"…","parent_id":null}` |
//! | `DELETE` | `/comments/{id}` | Author or admin only |

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use folio_core::{
  comment::Comment,
  service::Discussions,
  store::DiscussionStore,
  thread::{self, CommentNode},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

// ─── Thread ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ThreadParams {
  pub viewer: Option<Uuid>,
}

/// A book's comment forest, plus the ids the viewer has liked when a viewer
/// was given.
#[derive(Debug, Serialize)]
pub struct ThreadView {
  pub comments: Vec<CommentNode>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub liked:    Option<BTreeSet<Uuid>>,
}

/// `GET /books/{book_id}/comments[?viewer=<uid>]`
pub async fn list<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(book_id): Path<Uuid>,
  Query(params): Query<ThreadParams>,
) -> Result<Json<ThreadView>, ApiError>
where
  S: DiscussionStore + 'static,
{
  let comments = discussions.build_tree(book_id).await?;
  let liked = params.viewer.map(|v| thread::liked_by(&comments, v));
  Ok(Json(ThreadView { comments, liked }))
}

/// `GET /books/{book_id}/comments/recent`
pub async fn recent<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: DiscussionStore + 'static,
{
  Ok(Json(discussions.recent_comments(book_id).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub content:   String,
  #[serde(default)]
  pub parent_id: Option<Uuid>,
}

/// `POST /books/{book_id}/comments`
pub async fn create<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(book_id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DiscussionStore + 'static,
{
  let comment = discussions
    .create(book_id, &body.content, actor.user_id, body.parent_id)
    .await?;
  Ok((StatusCode::CREATED, Json(comment)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /comments/{id}`
pub async fn delete<S>(
  State(discussions): State<Arc<Discussions<S>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<StatusCode, ApiError>
where
  S: DiscussionStore + 'static,
{
  discussions
    .delete(id, actor.user_id, actor.is_privileged())
    .await?;
  Ok(StatusCode::NO_CONTENT)
}
