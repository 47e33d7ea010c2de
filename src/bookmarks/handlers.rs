use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::types::*;
use crate::auth::AuthUser;
use crate::db::{Bookmark, BookmarkRepo};
use crate::error::ApiError;
use crate::server::AppState;

pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let bookmarks = state.db.list_bookmarks(&auth.user_id).await?;
    Ok(Json(bookmarks))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<BookmarkPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let new = payload.validate()?;

    let bookmark = state.db.create_bookmark(&auth.user_id, &new).await?;

    info!(
        user_id = %auth.user_id,
        bookmark_id = %bookmark.id,
        movie_id = %bookmark.movie_id,
        "Bookmark created"
    );

    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.db.delete_bookmark(&id, &auth.user_id).await?;

    info!(user_id = %auth.user_id, bookmark_id = %id, "Bookmark deleted");

    Ok(Json(DeleteResponse {
        message: "Bookmark deleted".to_string(),
        deleted: None,
    }))
}

pub async fn delete_bookmarks_by_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(movie_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state
        .db
        .delete_bookmarks_by_movie(&auth.user_id, &movie_id)
        .await?;

    info!(user_id = %auth.user_id, movie_id = %movie_id, deleted, "Bookmarks deleted");

    Ok(Json(DeleteResponse {
        message: "Bookmark deleted".to_string(),
        deleted: Some(deleted),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{AccessToken, AccessTokenRepo, SqliteRepository};
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        db: Arc<SqliteRepository>,
    }

    impl Harness {
        async fn new() -> Self {
            let db = Arc::new(SqliteRepository::in_memory().await.unwrap());
            let state = AppState::new(Config::default(), db.clone(), None);
            Harness {
                app: crate::server::build_router(state),
                db,
            }
        }

        /// Token for `user_id`, as the auth gate would have issued it.
        async fn token(&self, user_id: &str) -> String {
            let token = AccessToken::new(user_id);
            self.db.upsert_token(&token).await.unwrap();
            token.token
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => request
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => request.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }

    fn dune() -> Value {
        json!({"movieId": "42", "title": "Dune", "backdropPath": "/x.jpg", "releaseYear": "2021"})
    }

    #[tokio::test]
    async fn test_requires_token() {
        let h = Harness::new().await;

        let (status, body) = h.call("GET", "/api/bookmarks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authentication required");

        let (status, _) = h.call("GET", "/api/bookmarks", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = h.call("DELETE", "/api/bookmarks/movie/42", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_uses_caller_identity() {
        let h = Harness::new().await;
        let token = h.token("u1").await;

        let mut body = dune();
        body["userId"] = json!("u2");
        let (status, created) = h.call("POST", "/api/bookmarks", Some(&token), Some(body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["userId"], "u1");
        assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let h = Harness::new().await;
        let token = h.token("u1").await;

        let (status, body) = h
            .call("POST", "/api/bookmarks", Some(&token), Some(json!({"movieId": "42"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Missing required field(s): title, backdropPath, releaseYear"
        );

        let mut empty_year = dune();
        empty_year["releaseYear"] = json!("");
        let (status, _) = h
            .call("POST", "/api/bookmarks", Some(&token), Some(empty_year))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, list) = h.call("GET", "/api/bookmarks", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_failure() {
        let h = Harness::new().await;
        let token = h.token("u1").await;

        let request = Request::post("/api/bookmarks")
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped() {
        let h = Harness::new().await;
        let t1 = h.token("u1").await;
        let t2 = h.token("u2").await;

        h.call("POST", "/api/bookmarks", Some(&t1), Some(dune())).await;
        for _ in 0..3 {
            h.call("POST", "/api/bookmarks", Some(&t2), Some(dune())).await;
        }

        let (_, list) = h.call("GET", "/api/bookmarks/", Some(&t1), None).await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.iter().all(|b| b["userId"] == "u1"));
    }

    #[tokio::test]
    async fn test_dune_scenario() {
        let h = Harness::new().await;
        let token = h.token("u1").await;

        let (status, _) = h.call("POST", "/api/bookmarks", Some(&token), Some(dune())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, list) = h.call("GET", "/api/bookmarks/", Some(&token), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["movieId"], "42");

        let (status, body) = h
            .call("DELETE", "/api/bookmarks/movie/42", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Bookmark deleted");
        assert_eq!(body["deleted"], 1);

        let (_, list) = h.call("GET", "/api/bookmarks/", Some(&token), None).await;
        assert_eq!(list, json!([]));

        let (status, _) = h
            .call("DELETE", "/api/bookmarks/movie/42", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_foreign_delete_is_forbidden() {
        let h = Harness::new().await;
        let t1 = h.token("u1").await;
        let t2 = h.token("u2").await;

        let (_, created) = h.call("POST", "/api/bookmarks", Some(&t1), Some(dune())).await;
        let b1 = created["id"].as_str().unwrap().to_string();

        let (status, body) = h
            .call("DELETE", &format!("/api/bookmarks/{}", b1), Some(&t2), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not authorized to delete this bookmark");

        // Deleting by movie id only ever touches the caller's own rows.
        let (status, _) = h
            .call("DELETE", "/api/bookmarks/movie/42", Some(&t2), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = h.call("GET", "/api/bookmarks", Some(&t1), None).await;
        assert_eq!(list[0]["id"], b1.as_str());

        let (status, _) = h
            .call("DELETE", &format!("/api/bookmarks/{}", b1), Some(&t1), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let h = Harness::new().await;
        let token = h.token("u1").await;

        let (status, body) = h
            .call("DELETE", "/api/bookmarks/does-not-exist", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Bookmark not found");
    }
}
