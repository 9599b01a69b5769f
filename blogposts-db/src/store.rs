use async_trait::async_trait;
use blogposts_common::{
    model::{
        Id,
        post::{CreatePost, Post, PostMarker, UpdatePost},
    },
    snowflake::SnowflakeError,
};
use std::fmt::Debug;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Could not generate a post id: {0}")]
    Snowflake(#[from] SnowflakeError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Durable storage for posts.
///
/// Every method is a single store round trip, so a mutation is never
/// observable half applied.
#[async_trait]
pub trait PostStore: Debug + Send + Sync {
    /// All posts, oldest first.
    async fn list_posts(&self) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// Stores a new post, assigning its id and creation time.
    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    /// Applies a merge patch and returns the updated post, or `None` if there
    /// is no post with that id.
    async fn update_post(&self, update: &UpdatePost) -> Result<Option<Post>>;

    /// Returns whether a post was actually removed.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;

    async fn close(&self) {}
}
