use tracing::debug;

use super::session::{ClientError, Session};
use crate::bookmarks::BookmarkPayload;
use crate::db::Bookmark;

/// A view's local copy of the caller's bookmarks.
///
/// The copy is only ever replaced by what the server returns. Every
/// mutation is followed by a fresh list, so after any sequence of toggles
/// the shelf shows the server's state, not a guess about it.
#[derive(Debug, Clone)]
pub struct BookmarkShelf {
    session: Session,
    bookmarks: Vec<Bookmark>,
}

impl BookmarkShelf {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            bookmarks: Vec::new(),
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, movie_id: &str) -> bool {
        self.bookmarks.iter().any(|b| b.movie_id == movie_id)
    }

    pub async fn refresh(&mut self) -> Result<&[Bookmark], ClientError> {
        self.bookmarks = self.session.list().await?;
        Ok(&self.bookmarks)
    }

    /// Bookmarks the title when it is not on the shelf, removes it when it
    /// is. Returns whether the server has it bookmarked afterwards.
    pub async fn toggle(&mut self, payload: &BookmarkPayload) -> Result<bool, ClientError> {
        let movie_id = payload
            .movie_id
            .clone()
            .ok_or_else(|| ClientError::Validation("movieId is required".to_string()))?;

        if self.is_bookmarked(&movie_id) {
            match self.session.delete_by_movie(&movie_id).await {
                // Someone else already removed it; the refresh below shows that.
                Ok(_) | Err(ClientError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        } else {
            self.session.create(payload).await?;
        }

        self.refresh().await?;
        let bookmarked = self.is_bookmarked(&movie_id);
        debug!(movie_id = %movie_id, bookmarked, "Bookmark toggled");
        Ok(bookmarked)
    }

    pub async fn remove(&mut self, id: &str) -> Result<(), ClientError> {
        let result = self.session.delete(id).await;
        self.refresh().await?;
        result
    }
}
