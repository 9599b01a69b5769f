//! In-memory post store, used when no database is configured and in tests.
//!
//! Data is lost when the process exits.

use crate::store::{PostStore, Result};
use async_trait::async_trait;
use blogposts_common::{
    model::{
        BlogpostsSnowflakeGenerator, Id,
        post::{CreatePost, Post, PostMarker, UpdatePost},
    },
    snowflake::{ProcessId, WorkerId},
};
use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct MemoryStore {
    posts: RwLock<BTreeMap<Id<PostMarker>, Post>>,
    snowflake_generator: Mutex<BlogpostsSnowflakeGenerator>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            posts: RwLock::new(BTreeMap::new()),
            snowflake_generator: Mutex::new(BlogpostsSnowflakeGenerator::new(
                worker_id, process_id,
            )),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.posts.read().await.values().cloned().collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(&post_id).cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        let post = Post {
            id: snowflake.into(),
            title: post.title.clone(),
            author: post.author.clone(),
            content: post.content.clone(),
            created: OffsetDateTime::now_utc(),
        };
        self.posts.write().await.insert(post.id, post.clone());

        Ok(post)
    }

    async fn update_post(&self, update: &UpdatePost) -> Result<Option<Post>> {
        let mut posts = self.posts.write().await;
        let Some(post) = posts.get_mut(&update.id) else {
            return Ok(None);
        };
        post.apply(update);

        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        Ok(self.posts.write().await.remove(&post_id).is_some())
    }
}
