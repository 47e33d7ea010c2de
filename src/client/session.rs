use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::auth::{AuthResponse, Credentials};
use crate::bookmarks::{BookmarkPayload, DeleteResponse};
use crate::db::Bookmark;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turns a non-2xx response into the matching `ClientError`.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("").to_string(),
    };

    Err(match status {
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::FORBIDDEN => ClientError::Forbidden(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    })
}

/// Unauthenticated entry point. Logging in yields a [`Session`]; there is no
/// shared client that changes identity behind its users' backs.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Arc<str>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authenticate(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.http.post(self.url(path)).json(&credentials).send().await?;
        let auth: AuthResponse = check(response).await?.json().await?;

        Ok(Session {
            client: self.clone(),
            token: auth.token.into(),
            user_id: auth.user_id,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        self.authenticate("/login", username, password).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        self.authenticate("/signup", username, password).await
    }

    /// A session for a token obtained earlier, e.g. one kept across restarts.
    pub fn with_token(&self, token: &str, user_id: &str) -> Session {
        Session {
            client: self.clone(),
            token: token.into(),
            user_id: user_id.to_string(),
        }
    }
}

/// An authenticated caller. Cheap to clone; pass it to whatever needs to
/// talk to the bookmark API as this user.
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    token: Arc<str>,
    user_id: String,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .http
            .request(method, self.client.url(path))
            .bearer_auth(&self.token)
    }

    pub async fn list(&self) -> Result<Vec<Bookmark>, ClientError> {
        let response = self
            .request(reqwest::Method::GET, "/api/bookmarks/")
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn create(&self, payload: &BookmarkPayload) -> Result<Bookmark, ClientError> {
        let response = self
            .request(reqwest::Method::POST, "/api/bookmarks")
            .json(payload)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("/api/bookmarks/{}", urlencoding::encode(id));
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        check(response).await?;
        Ok(())
    }

    /// Returns how many bookmarks were removed.
    pub async fn delete_by_movie(&self, movie_id: &str) -> Result<u64, ClientError> {
        let path = format!("/api/bookmarks/movie/{}", urlencoding::encode(movie_id));
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        let body: DeleteResponse = check(response).await?.json().await?;
        Ok(body.deleted.unwrap_or(1))
    }

    pub async fn logout(self) -> Result<(), ClientError> {
        let response = self.request(reqwest::Method::POST, "/logout").send().await?;
        check(response).await?;
        Ok(())
    }
}
