use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::model::*;
use super::CatalogError;
use crate::config::TmdbConfig;

/// Queries shorter than this are not sent to TMDB.
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone)]
pub enum TmdbAuth {
    /// v4 read access token.
    Bearer(String),
    /// v3 api key.
    ApiKey(String),
}

/// Read-only client for the TMDB v3 REST API. No retries; every error goes
/// straight back to the caller.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: Client,
    base_url: String,
    auth: TmdbAuth,
    language: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, auth: TmdbAuth, language: &str) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            language: language.to_string(),
        })
    }

    /// `None` when the config carries no TMDB credential.
    pub fn from_config(config: &TmdbConfig) -> Result<Option<Self>, CatalogError> {
        let auth = match (&config.bearer_token, &config.api_key) {
            (Some(token), _) if !token.is_empty() => TmdbAuth::Bearer(token.clone()),
            (_, Some(key)) if !key.is_empty() => TmdbAuth::ApiKey(key.clone()),
            _ => return Ok(None),
        };
        Self::new(&config.base_url, auth, &config.language).map(Some)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "TMDB request");

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("language", self.language.as_str())])
            .query(query);

        request = match &self.auth {
            TmdbAuth::Bearer(token) => request.bearer_auth(token),
            TmdbAuth::ApiKey(key) => request.query(&[("api_key", key.as_str())]),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UpstreamStatus(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn trending(&self, window: TimeWindow) -> Result<Page<CatalogItem>, CatalogError> {
        let path = format!("trending/all/{}", window.as_str());
        let raw: RawPage<RawResult> = self.get(&path, &[]).await?;
        Ok(Page::ingest(raw, None))
    }

    pub async fn popular_movies(&self, page: u32) -> Result<Page<CatalogItem>, CatalogError> {
        let raw: RawPage<RawResult> = self
            .get("movie/popular", &[("page", page.max(1).to_string())])
            .await?;
        Ok(Page::ingest(raw, Some(MediaKind::Movie)))
    }

    /// Most popular titles of one kind, adult content excluded.
    pub async fn discover(
        &self,
        kind: MediaKind,
        page: u32,
    ) -> Result<Page<CatalogItem>, CatalogError> {
        let path = format!("discover/{}", kind.tmdb_segment());
        let raw: RawPage<RawResult> = self
            .get(
                &path,
                &[
                    ("include_adult", "false".to_string()),
                    ("include_video", "false".to_string()),
                    ("sort_by", "popularity.desc".to_string()),
                    ("page", page.max(1).to_string()),
                ],
            )
            .await?;
        Ok(Page::ingest(raw, Some(kind)))
    }

    pub async fn search(
        &self,
        scope: SearchScope,
        query: &str,
        page: u32,
    ) -> Result<Page<CatalogItem>, CatalogError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Page::empty());
        }

        let path = format!("search/{}", scope.tmdb_segment());
        let raw: RawPage<RawResult> = self
            .get(
                &path,
                &[
                    ("include_adult", "false".to_string()),
                    ("query", query.to_string()),
                    ("page", page.max(1).to_string()),
                ],
            )
            .await?;
        Ok(Page::ingest(raw, scope.kind_hint()))
    }

    pub async fn details(&self, kind: MediaKind, id: &str) -> Result<TitleDetails, CatalogError> {
        let path = format!("{}/{}", kind.tmdb_segment(), urlencoding::encode(id));
        let raw: RawDetails = self.get(&path, &[]).await?;
        Ok(TitleDetails::ingest(raw, kind))
    }

    pub async fn credits(&self, kind: MediaKind, id: &str) -> Result<Credits, CatalogError> {
        let path = format!("{}/{}/credits", kind.tmdb_segment(), urlencoding::encode(id));
        self.get(&path, &[]).await
    }
}
