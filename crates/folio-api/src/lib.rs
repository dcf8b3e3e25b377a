//! JSON REST API for Folio discussions.
//!
//! Exposes an axum [`Router`] backed by any
//! [`folio_core::store::DiscussionStore`]. Authentication happens upstream:
//! the authenticated user's id arrives in the [`actor::ACTOR_HEADER`] header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", folio_api::api_router(Arc::new(Discussions::new(store))))
//! ```

pub mod actor;
pub mod comments;
pub mod engagement;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use folio_core::{service::Discussions, store::DiscussionStore};

pub use error::ApiError;

/// Build a fully-materialised API router over `discussions`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(discussions: Arc<Discussions<S>>) -> Router<()>
where
  S: DiscussionStore + 'static,
{
  Router::new()
    // Threads
    .route(
      "/books/{book_id}/comments",
      get(comments::list::<S>).post(comments::create::<S>),
    )
    .route("/books/{book_id}/comments/recent", get(comments::recent::<S>))
    .route("/comments/{id}", delete(comments::delete::<S>))
    // Engagement
    .route("/comments/{id}/like", post(engagement::toggle_like::<S>))
    .route(
      "/books/{book_id}/favorite",
      get(engagement::favorite_status::<S>).post(engagement::toggle_favorite::<S>),
    )
    .route("/users/{user_id}/favorites", get(engagement::favorites_of::<S>))
    .with_state(discussions)
}

// ─── Integration tests ────────────────────────────────────────────────────────
