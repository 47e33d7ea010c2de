use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::model::*;
use super::tmdb::TmdbClient;
use super::CatalogError;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingParams {
    #[serde(default)]
    pub window: Option<TimeWindow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub page: Option<u32>,
}

/// Read-only catalog routes. Public, no bookmark state involved.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/catalog/trending", get(trending))
        .route("/api/catalog/popular", get(popular))
        .route("/api/catalog/discover/:kind", get(discover))
        .route("/api/catalog/search/:scope", get(search))
        .route("/api/catalog/title/:kind/:id", get(details))
        .route("/api/catalog/title/:kind/:id/credits", get(credits))
}

fn tmdb(state: &AppState) -> Result<Arc<TmdbClient>, ApiError> {
    state
        .catalog
        .clone()
        .ok_or_else(|| ApiError::Upstream(CatalogError::NotConfigured))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<Page<CatalogItem>>, ApiError> {
    let page = tmdb(&state)?
        .trending(params.window.unwrap_or_default())
        .await?;
    Ok(Json(page))
}

pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CatalogItem>>, ApiError> {
    let page = tmdb(&state)?
        .popular_movies(params.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn discover(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CatalogItem>>, ApiError> {
    let kind: MediaKind = kind.parse()?;
    let page = tmdb(&state)?
        .discover(kind, params.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn search(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<CatalogItem>>, ApiError> {
    let scope: SearchScope = scope.parse()?;
    let page = tmdb(&state)?
        .search(scope, &params.query, params.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn details(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<TitleDetails>, ApiError> {
    let kind: MediaKind = kind.parse()?;
    Ok(Json(tmdb(&state)?.details(kind, &id).await?))
}

pub async fn credits(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Credits>, ApiError> {
    let kind: MediaKind = kind.parse()?;
    Ok(Json(tmdb(&state)?.credits(kind, &id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TmdbAuth;
    use crate::config::Config;
    use crate::db::SqliteRepository;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use mockito::Matcher;
    use serde_json::json;
    use tower::ServiceExt;

    async fn app(server: &mockito::ServerGuard) -> Router {
        let db = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let tmdb =
            TmdbClient::new(&server.url(), TmdbAuth::Bearer("t".to_string()), "en-US").unwrap();
        let state = AppState::new(Config::default(), db, Some(Arc::new(tmdb)));
        crate::server::build_router(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_search_proxy() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/movie")
            .match_query(Matcher::UrlEncoded("query".into(), "dune".into()))
            .with_status(200)
            .with_body(
                json!({
                    "page": 1,
                    "results": [{"id": 438631, "title": "Dune", "release_date": "2021-09-15", "backdrop_path": "/x.jpg"}],
                    "total_pages": 1,
                    "total_results": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let (status, body) = get_json(app(&server).await, "/api/catalog/search/movie?query=dune").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["kind"], "movie");
        assert_eq!(body["results"][0]["releaseYear"], "2021");
        assert_eq!(body["totalPages"], 1);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_bad_request() {
        let server = mockito::Server::new_async().await;
        let (status, body) = get_json(app(&server).await, "/api/catalog/discover/person").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Unknown media kind: person");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/movie/popular")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let (status, body) = get_json(app(&server).await, "/api/catalog/popular").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Catalog service unavailable");
    }
}
