use serde::{Deserialize, Deserializer, Serialize};

use crate::db::NewBookmark;
use crate::error::ApiError;

/// Body of `POST /api/bookmarks`. Every field is optional here so that a
/// missing one is reported as a validation failure rather than a parse error.
/// An owner id in the body is not part of this type and is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    #[serde(
        default,
        alias = "movie_id",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub movie_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, alias = "backdrop_path", skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, alias = "release_year", skip_serializing_if = "Option::is_none")]
    pub release_year: Option<String>,
}

// TMDB ids are numbers; clients pass them through unchanged.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(i64),
        Uint(u64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Str(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    }))
}

impl BookmarkPayload {
    pub fn validate(self) -> Result<NewBookmark, ApiError> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let movie_id = present(self.movie_id);
        let title = present(self.title);
        let backdrop_path = present(self.backdrop_path);
        let release_year = present(self.release_year);

        match (movie_id, title, backdrop_path, release_year) {
            (Some(movie_id), Some(title), Some(backdrop_path), Some(release_year)) => {
                Ok(NewBookmark {
                    movie_id,
                    title,
                    backdrop_path,
                    release_year,
                })
            }
            (movie_id, title, backdrop_path, release_year) => {
                let missing: Vec<&str> = [
                    ("movieId", movie_id.is_none()),
                    ("title", title.is_none()),
                    ("backdropPath", backdrop_path.is_none()),
                    ("releaseYear", release_year.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(name, _)| name)
                .collect();

                Err(ApiError::Validation(format!(
                    "Missing required field(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> BookmarkPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numeric_movie_id() {
        let p = payload(json!({"movieId": 42, "title": "Dune", "backdropPath": "/x.jpg", "releaseYear": "2021"}));
        assert_eq!(p.validate().unwrap().movie_id, "42");
    }

    #[test]
    fn test_owner_in_body_is_ignored() {
        let p = payload(json!({
            "movieId": "42",
            "title": "Dune",
            "backdropPath": "/x.jpg",
            "releaseYear": "2021",
            "userId": "mallory"
        }));
        let new = p.validate().unwrap();
        assert_eq!(new.title, "Dune");
    }

    #[test]
    fn test_each_field_is_required() {
        let full = json!({"movieId": "42", "title": "Dune", "backdropPath": "/x.jpg", "releaseYear": "2021"});
        for field in ["movieId", "title", "backdropPath", "releaseYear"] {
            let mut missing = full.clone();
            missing.as_object_mut().unwrap().remove(field);
            let err = payload(missing).validate().unwrap_err();
            assert_eq!(err.to_string(), format!("Missing required field(s): {}", field));

            let mut empty = full.clone();
            empty[field] = json!("  ");
            assert!(matches!(
                payload(empty).validate(),
                Err(ApiError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_lists_all_missing_fields() {
        let err = payload(json!({"title": "Dune"})).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required field(s): movieId, backdropPath, releaseYear"
        );
    }
}
