use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::db::DbError;

/// Errors returned by HTTP handlers. Each variant has its own status code, so
/// a client can tell "nothing to delete" apart from "not yours to delete".
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Catalog service unavailable")]
    Upstream(#[source] CatalogError),

    #[error("Internal server error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(_) => ApiError::NotFound("Bookmark not found".to_string()),
            DbError::Forbidden(_) => {
                ApiError::Forbidden("Not authorized to delete this bookmark".to_string())
            }
            DbError::AlreadyExists(_) => ApiError::Conflict("Already exists".to_string()),
            DbError::Sqlx(_) | DbError::Hash(_) => ApiError::Storage(Box::new(e)),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::UnknownKind(kind) => {
                ApiError::Validation(format!("Unknown media kind: {}", kind))
            }
            CatalogError::UpstreamStatus(404) => {
                ApiError::NotFound("Title not found".to_string())
            }
            e => ApiError::Upstream(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details go to the log only.
        match &self {
            ApiError::Storage(source) => error!("Storage failure: {}", source),
            ApiError::Upstream(source) => warn!("Catalog failure: {}", source),
            _ => {}
        }

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
