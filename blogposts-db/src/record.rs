use blogposts_common::model::post::{Author, Post};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.post_snowflake.cast_unsigned().into(),
            title: value.title,
            author: Author::new(value.author_first_name, value.author_last_name),
            content: value.content,
            created: value.created_at,
        }
    }
}
