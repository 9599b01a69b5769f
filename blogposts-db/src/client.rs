use crate::{
    record::PostRecord,
    store::{PostStore, Result},
};
use async_trait::async_trait;
use blogposts_common::{
    model::{
        BlogpostsSnowflakeGenerator, Id,
        post::{CreatePost, Post, PostMarker, UpdatePost},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as};
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;
use tracing::{debug, info};

/// Postgres backed [`PostStore`].
#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<BlogpostsSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(BlogpostsSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Opens a pool against `database_url` and makes sure the posts table exists.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "Connected to database");

        let client = Self::new(pool, worker_id, process_id);
        client.ensure_schema().await?;

        Ok(client)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        query("CREATE SCHEMA IF NOT EXISTS posts")
            .execute(&self.pool)
            .await?;
        query(
            "
            CREATE TABLE IF NOT EXISTS posts.posts (
                post_snowflake BIGINT PRIMARY KEY,
                title TEXT NOT NULL,
                author_first_name TEXT,
                author_last_name TEXT,
                content TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        debug!("Posts schema is in place");
        Ok(())
    }

    fn next_post_id(&self) -> Result<Id<PostMarker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }
}

#[async_trait]
impl PostStore for DbClient {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.author_first_name,
                posts.author_last_name,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            ORDER BY
                posts.post_snowflake
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.author_first_name,
                posts.author_last_name,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            WHERE
                posts.post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id = self.next_post_id()?;

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts
                (post_snowflake, title, author_first_name, author_last_name, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                post_snowflake,
                title,
                author_first_name,
                author_last_name,
                content,
                created_at
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(&post.title)
        .bind(post.author.first_name.as_deref())
        .bind(post.author.last_name.as_deref())
        .bind(&post.content)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    async fn update_post(&self, update: &UpdatePost) -> Result<Option<Post>> {
        let author = update.author.as_ref();

        let record = query_as::<_, PostRecord>(
            "
            UPDATE posts.posts
            SET
                title = COALESCE($2, title),
                author_first_name = CASE WHEN $3 THEN $4 ELSE author_first_name END,
                author_last_name = CASE WHEN $3 THEN $5 ELSE author_last_name END,
                content = COALESCE($6, content)
            WHERE
                post_snowflake = $1
            RETURNING
                post_snowflake,
                title,
                author_first_name,
                author_last_name,
                content,
                created_at
            ",
        )
        .bind(update.id.snowflake().get().cast_signed())
        .bind(update.title.as_deref())
        .bind(author.is_some())
        .bind(author.and_then(|author| author.first_name.as_deref()))
        .bind(author.and_then(|author| author.last_name.as_deref()))
        .bind(update.content.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[cfg(test)]
mod tests {
    use crate::{client::DbClient, store::PostStore};
    use blogposts_common::{
        model::post::{Author, CreatePost, UpdatePost},
        snowflake::{ProcessId, WorkerId},
    };
    use sqlx::PgPool;

    async fn client(pool: PgPool) -> DbClient {
        let client = DbClient::new(pool, WorkerId::default(), ProcessId::default());
        client.ensure_schema().await.unwrap();
        client
    }

    fn create_post(title: &str) -> CreatePost {
        CreatePost {
            title: title.to_owned(),
            author: Author::new(Some("Ada".to_owned()), Some("Lovelace".to_owned())),
            content: "Notes".to_owned(),
        }
    }

    #[sqlx::test(migrations = false)]
    async fn create_then_fetch(pool: PgPool) {
        let client = client(pool).await;

        let first = client.create_post(&create_post("first")).await.unwrap();
        let second = client.create_post(&create_post("second")).await.unwrap();

        assert_eq!(first.title, "first");
        assert_eq!(first.author.display_name(), "Ada Lovelace");
        assert_eq!(client.fetch_post(first.id).await.unwrap(), Some(first.clone()));
        assert_eq!(client.list_posts().await.unwrap(), [first, second]);
    }

    #[sqlx::test(migrations = false)]
    async fn ensure_schema_is_repeatable(pool: PgPool) {
        let client = client(pool).await;
        let created = client.create_post(&create_post("kept")).await.unwrap();

        client.ensure_schema().await.unwrap();

        assert_eq!(client.fetch_post(created.id).await.unwrap(), Some(created));
    }

    #[sqlx::test(migrations = false)]
    async fn title_update_keeps_other_fields(pool: PgPool) {
        let client = client(pool).await;
        let created = client.create_post(&create_post("draft")).await.unwrap();

        let updated = client
            .update_post(&UpdatePost {
                id: created.id,
                title: Some("final".to_owned()),
                ..UpdatePost::default()
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.content, created.content);
        assert_eq!(updated.created, created.created);
        assert_eq!(client.fetch_post(created.id).await.unwrap(), Some(updated));
    }

    #[sqlx::test(migrations = false)]
    async fn author_update_replaces_both_name_parts(pool: PgPool) {
        let client = client(pool).await;
        let created = client.create_post(&create_post("draft")).await.unwrap();

        let updated = client
            .update_post(&UpdatePost {
                id: created.id,
                author: Some(Author::new(Some("Grace".to_owned()), None)),
                content: Some("Compilers".to_owned()),
                ..UpdatePost::default()
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.author, Author::new(Some("Grace".to_owned()), None));
        assert_eq!(updated.author.display_name(), "Grace");
        assert_eq!(updated.title, "draft");
        assert_eq!(updated.content, "Compilers");
    }

    #[sqlx::test(migrations = false)]
    async fn created_is_stable(pool: PgPool) {
        let client = client(pool).await;
        let created = client.create_post(&create_post("dated")).await.unwrap();

        let first = client.fetch_post(created.id).await.unwrap().unwrap();
        let second = client.fetch_post(created.id).await.unwrap().unwrap();

        assert_eq!(first.created, created.created);
        assert_eq!(second.created, created.created);
    }

    #[sqlx::test(migrations = false)]
    async fn missing_posts(pool: PgPool) {
        let client = client(pool).await;
        let created = client.create_post(&create_post("gone")).await.unwrap();

        assert!(client.delete_post(created.id).await.unwrap());
        assert!(!client.delete_post(created.id).await.unwrap());
        assert_eq!(client.fetch_post(created.id).await.unwrap(), None);
        assert_eq!(
            client
                .update_post(&UpdatePost {
                    id: created.id,
                    title: Some("back".to_owned()),
                    ..UpdatePost::default()
                })
                .await
                .unwrap(),
            None
        );
    }
}
