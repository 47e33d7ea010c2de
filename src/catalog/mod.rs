//! Read-only access to the TMDB media catalog.
//!
//! Raw TMDB results are converted once, on arrival, into [`CatalogItem`]s
//! carrying an explicit [`MediaKind`]. Nothing downstream looks at TMDB's
//! movie/series field names again.

pub mod accumulator;
pub mod handlers;
pub mod model;
pub mod tmdb;

pub use accumulator::SearchAccumulator;
pub use handlers::routes;
pub use model::*;
pub use tmdb::{TmdbAuth, TmdbClient};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Catalog returned status {0}")]
    UpstreamStatus(u16),
    #[error("Unknown media kind: {0}")]
    UnknownKind(String),
    #[error("No catalog credentials configured")]
    NotConfigured,
}
