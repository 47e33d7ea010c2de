use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, username: &str) -> DbResult<User>;
    async fn get_user_by_id(&self, id: &str) -> DbResult<User>;
    /// Fails with `AlreadyExists` when the username is taken.
    async fn create_user(&self, user: &User) -> DbResult<()>;
    async fn update_last_login(&self, id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait AccessTokenRepo: Send + Sync {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken>;
    async fn upsert_token(&self, token: &AccessToken) -> DbResult<()>;
    async fn delete_token(&self, token: &str) -> DbResult<()>;
}

/// Owner-scoped bookmark storage.
#[async_trait]
pub trait BookmarkRepo: Send + Sync {
    /// All bookmarks of `user_id`, oldest first.
    async fn list_bookmarks(&self, user_id: &str) -> DbResult<Vec<Bookmark>>;
    async fn create_bookmark(&self, user_id: &str, new: &NewBookmark) -> DbResult<Bookmark>;
    /// Lookup by id, then owner check. A foreign bookmark yields `Forbidden`
    /// and is left in place.
    async fn delete_bookmark(&self, id: &str, user_id: &str) -> DbResult<()>;
    /// Removes every bookmark of `user_id` for `movie_id` and returns how many.
    async fn delete_bookmarks_by_movie(&self, user_id: &str, movie_id: &str) -> DbResult<u64>;
}

pub trait Repository: UserRepo + AccessTokenRepo + BookmarkRepo + Send + Sync {}

impl<T> Repository for T where T: UserRepo + AccessTokenRepo + BookmarkRepo + Send + Sync {}
