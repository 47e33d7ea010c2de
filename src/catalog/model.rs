use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CatalogError;
use crate::bookmarks::BookmarkPayload;

/// What a catalog title is. Decided once when a TMDB result is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Path segment TMDB uses for this kind.
    pub fn tmdb_segment(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

impl FromStr for MediaKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "series" | "show" => Ok(MediaKind::Series),
            other => Err(CatalogError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tmdb_segment())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Multi,
    Only(MediaKind),
}

impl SearchScope {
    pub fn tmdb_segment(self) -> &'static str {
        match self {
            SearchScope::Multi => "multi",
            SearchScope::Only(kind) => kind.tmdb_segment(),
        }
    }

    pub(super) fn kind_hint(self) -> Option<MediaKind> {
        match self {
            SearchScope::Multi => None,
            SearchScope::Only(kind) => Some(kind),
        }
    }
}

impl FromStr for SearchScope {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi" | "all" => Ok(SearchScope::Multi),
            other => other.parse().map(SearchScope::Only),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

/// First four characters of a TMDB date when they form a year, else empty.
pub fn release_year(date: Option<&str>) -> String {
    match date {
        Some(d) if d.len() >= 4 && d.as_bytes()[..4].iter().all(u8::is_ascii_digit) => {
            d[..4].to_string()
        }
        _ => String::new(),
    }
}

// TMDB sends `null` for missing strings about as often as it omits them.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A search/list result as TMDB sends it. Movies and series use different
/// field names for the same things.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResult {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub overview: String,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    pub overview: String,
    pub backdrop_path: Option<String>,
    pub poster_path: Option<String>,
    pub release_year: String,
    pub vote_average: Option<f64>,
}

impl CatalogItem {
    /// Converts a raw result. `hint` is the kind implied by the endpoint;
    /// an explicit `media_type` wins over it. People and other non-title
    /// results give `None`.
    pub fn ingest(raw: RawResult, hint: Option<MediaKind>) -> Option<Self> {
        let kind = match raw.media_type.as_deref() {
            Some("movie") => MediaKind::Movie,
            Some("tv") => MediaKind::Series,
            Some(_) => return None,
            None => match hint {
                Some(kind) => kind,
                None if raw.release_date.is_some() || raw.title.is_some() => MediaKind::Movie,
                None if raw.first_air_date.is_some() || raw.name.is_some() => MediaKind::Series,
                None => return None,
            },
        };

        let (title, date) = match kind {
            MediaKind::Movie => (raw.title.or(raw.name), raw.release_date),
            MediaKind::Series => (raw.name.or(raw.title), raw.first_air_date),
        };

        Some(CatalogItem {
            id: raw.id.to_string(),
            kind,
            title: title.unwrap_or_default(),
            overview: raw.overview,
            backdrop_path: raw.backdrop_path,
            poster_path: raw.poster_path,
            release_year: release_year(date.as_deref()),
            vote_average: raw.vote_average,
        })
    }

    /// The body for `POST /api/bookmarks` that saves this title.
    pub fn to_bookmark_payload(&self) -> BookmarkPayload {
        BookmarkPayload {
            movie_id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            backdrop_path: self.backdrop_path.clone(),
            release_year: Some(self.release_year.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Page {
            page: 1,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }
}

impl Page<CatalogItem> {
    pub fn ingest(raw: RawPage<RawResult>, hint: Option<MediaKind>) -> Self {
        Page {
            page: raw.page,
            results: raw
                .results
                .into_iter()
                .filter_map(|r| CatalogItem::ingest(r, hint))
                .collect(),
            total_pages: raw.total_pages,
            total_results: raw.total_results,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGenre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub overview: String,
    #[serde(default)]
    pub genres: Vec<RawGenre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleDetails {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    pub tagline: Option<String>,
    pub overview: String,
    pub genres: Vec<String>,
    /// Minutes. For series, the first listed episode run time.
    pub runtime: Option<u32>,
    pub original_language: Option<String>,
    pub vote_average: Option<f64>,
    pub status: Option<String>,
    pub release_date: Option<String>,
    pub release_year: String,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

impl TitleDetails {
    pub fn ingest(raw: RawDetails, kind: MediaKind) -> Self {
        let (title, date, runtime) = match kind {
            MediaKind::Movie => (raw.title.or(raw.name), raw.release_date, raw.runtime),
            MediaKind::Series => (
                raw.name.or(raw.title),
                raw.first_air_date,
                raw.episode_run_time.first().copied(),
            ),
        };

        TitleDetails {
            id: raw.id.to_string(),
            kind,
            title: title.unwrap_or_default(),
            tagline: raw.tagline.filter(|t| !t.is_empty()),
            overview: raw.overview,
            genres: raw.genres.into_iter().map(|g| g.name).collect(),
            runtime,
            original_language: raw.original_language,
            vote_average: raw.vote_average,
            status: raw.status,
            release_year: release_year(date.as_deref()),
            release_date: date,
            homepage: raw.homepage.filter(|h| !h.is_empty()),
            imdb_id: raw.imdb_id.filter(|i| !i.is_empty()),
            budget: raw.budget,
            revenue: raw.revenue,
            number_of_seasons: raw.number_of_seasons,
            number_of_episodes: raw.number_of_episodes,
            poster_path: raw.poster_path,
            backdrop_path: raw.backdrop_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}
