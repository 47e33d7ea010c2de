use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// bcrypt hash, never the plain password.
    #[serde(skip_serializing)]
    pub password: String,
    pub created: Option<DateTime<Utc>>,
    pub lastlogin: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub userid: String,
    pub created: Option<DateTime<Utc>>,
    pub lastused: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(userid: &str) -> Self {
        let now = Utc::now();
        Self {
            token: uuid::Uuid::new_v4().simple().to_string(),
            userid: userid.to_string(),
            created: Some(now),
            lastused: Some(now),
        }
    }

    /// A token without a creation time never expires.
    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.created {
            Some(created) => created + ttl < now,
            None => false,
        }
    }
}

/// A stored bookmark. Only the server sets `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub movie_id: String,
    pub title: String,
    pub backdrop_path: String,
    pub release_year: String,
    pub created: DateTime<Utc>,
}

/// Already validated fields for a bookmark insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    pub movie_id: String,
    pub title: String,
    pub backdrop_path: String,
    pub release_year: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub(crate) fn parse_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry() {
        let mut token = AccessToken::new("u1");
        let now = Utc::now();
        assert!(!token.is_expired(chrono::Duration::hours(1), now));

        token.created = Some(now - chrono::Duration::hours(2));
        assert!(token.is_expired(chrono::Duration::hours(1), now));

        token.created = None;
        assert!(!token.is_expired(chrono::Duration::hours(1), now));
    }

    #[test]
    fn test_bookmark_json_is_camel_case() {
        let bookmark = Bookmark {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            movie_id: "42".to_string(),
            title: "Dune".to_string(),
            backdrop_path: "/x.jpg".to_string(),
            release_year: "2021".to_string(),
            created: Utc::now(),
        };
        let value = serde_json::to_value(&bookmark).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["movieId"], "42");
        assert_eq!(value["backdropPath"], "/x.jpg");
        assert_eq!(value["releaseYear"], "2021");
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp(Some("2024-03-01T10:00:00+00:00".to_string())).is_some());
        assert!(parse_timestamp(Some("yesterday".to_string())).is_none());
        assert!(parse_timestamp(None).is_none());
    }
}
