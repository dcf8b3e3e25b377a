//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<folio_core::Error> for ApiError {
  fn from(err: folio_core::Error) -> Self {
    use folio_core::Error as E;
    match err {
      e @ E::NotFound { .. } => ApiError::NotFound(e.to_string()),
      E::InvalidArgument(m) => ApiError::BadRequest(m),
      e @ E::PermissionDenied { .. } => ApiError::Forbidden(e.to_string()),
      E::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        // Backend detail stays in the log.
        tracing::error!(error = %e, "request failed in the store");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "something went wrong, please retry later".to_string(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use folio_core::Entity;
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_map_to_statuses() {
    let id = Uuid::new_v4();
    let cases = [
      (folio_core::Error::not_found(Entity::Book, id), StatusCode::NOT_FOUND),
      (
        folio_core::Error::InvalidArgument("blank".into()),
        StatusCode::BAD_REQUEST,
      ),
      (
        folio_core::Error::PermissionDenied { actor: id, comment: id },
        StatusCode::FORBIDDEN,
      ),
      (
        folio_core::Error::store(std::io::Error::other("disk on fire")),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[tokio::test]
  async fn store_detail_not_leaked() {
    let err = ApiError::from(folio_core::Error::store(std::io::Error::other(
      "disk on fire",
    )));
    let body = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
      .await
      .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("disk on fire"), "body: {text}");
    assert!(text.contains("retry later"), "body: {text}");
  }
}
