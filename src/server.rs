use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::catalog::TmdbClient;
use crate::config::Config;
use crate::db::Repository;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn Repository>,
    /// `None` when no TMDB credential is configured.
    pub catalog: Option<Arc<TmdbClient>>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn Repository>,
        catalog: Option<Arc<TmdbClient>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db,
            catalog,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let bookmark_routes = Router::new()
        .route(
            "/api/bookmarks",
            get(crate::bookmarks::list_bookmarks).post(crate::bookmarks::create_bookmark),
        )
        .route(
            "/api/bookmarks/",
            get(crate::bookmarks::list_bookmarks).post(crate::bookmarks::create_bookmark),
        )
        .route("/api/bookmarks/:id", delete(crate::bookmarks::delete_bookmark))
        .route(
            "/api/bookmarks/movie/:movie_id",
            delete(crate::bookmarks::delete_bookmarks_by_movie),
        )
        .route("/logout", post(crate::auth::logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    let auth_routes = Router::new()
        .route("/signup", post(crate::auth::signup))
        .route("/signup/", post(crate::auth::signup))
        .route("/login", post(crate::auth::login))
        .route("/login/", post(crate::auth::login));

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .merge(auth_routes)
        .merge(bookmark_routes);

    if state.catalog.is_some() {
        router = router.merge(crate::catalog::routes());
    }

    router
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn fallback_handler(req: Request) -> impl IntoResponse {
    // Preflight requests are answered by the CORS layer; this only catches
    // ones for paths that do not exist.
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not found" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteRepository;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = Arc::new(SqliteRepository::in_memory().await.unwrap());
        build_router(AppState::new(Config::default(), db, None))
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_catalog_not_mounted_without_credentials() {
        let response = app()
            .await
            .oneshot(
                Request::get("/api/catalog/trending")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/bookmarks")
                    .header("Origin", "http://localhost:3000")
                    .header("Access-Control-Request-Method", "POST")
                    .header("Access-Control-Request-Headers", "authorization,content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
