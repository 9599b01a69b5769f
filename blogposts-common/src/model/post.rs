use crate::model::Id;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A stored blog post.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub author: Author,
    pub content: String,
    pub created: OffsetDateTime,
}

/// Name parts of a post author. Empty parts are stored as `None`.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Author {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Public representation of a [`Post`] as returned by the API.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostView {
    pub id: Id<PostMarker>,
    pub title: String,
    pub author: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostList {
    pub blog_posts: Vec<PostView>,
}

/// A validated creation request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub title: String,
    pub author: Author,
    pub content: String,
}

/// A validated merge patch. `None` fields keep their stored value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UpdatePost {
    pub id: Id<PostMarker>,
    pub title: Option<String>,
    pub author: Option<Author>,
    pub content: Option<String>,
}

impl Post {
    #[must_use]
    pub fn view(&self) -> PostView {
        PostView::from(self)
    }

    /// Applies `update` in place, leaving omitted fields untouched.
    pub fn apply(&mut self, update: &UpdatePost) {
        if let Some(title) = &update.title {
            self.title.clone_from(title);
        }
        if let Some(author) = &update.author {
            self.author.clone_from(author);
        }
        if let Some(content) = &update.content {
            self.content.clone_from(content);
        }
    }
}

impl Author {
    #[must_use]
    pub fn new(first_name: Option<String>, last_name: Option<String>) -> Self {
        let non_empty = |part: Option<String>| part.filter(|part| !part.is_empty());

        Self {
            first_name: non_empty(first_name),
            last_name: non_empty(last_name),
        }
    }

    #[must_use]
    pub fn has_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }

    /// The name parts joined by a single space. Missing parts are left out.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first_name), Some(last_name)) => format!("{first_name} {last_name}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            author: post.author.display_name(),
            content: post.content.clone(),
            created: post.created,
        }
    }
}

impl PostList {
    #[must_use]
    pub fn from_posts(posts: &[Post]) -> Self {
        Self {
            blog_posts: posts.iter().map(Post::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{Author, Post, PostList, UpdatePost};
    use serde_json::json;
    use time::macros::datetime;

    fn post() -> Post {
        Post {
            id: 42_u64.into(),
            title: "On Engines".to_owned(),
            author: Author::new(Some("Ada".to_owned()), Some("Lovelace".to_owned())),
            content: "Notes".to_owned(),
            created: datetime!(2025-03-01 12:00 UTC),
        }
    }

    #[test]
    fn author_display_name() {
        let name = |first: Option<&str>, last: Option<&str>| {
            Author::new(first.map(str::to_owned), last.map(str::to_owned)).display_name()
        };

        assert_eq!(name(Some("Ada"), Some("Lovelace")), "Ada Lovelace");
        assert_eq!(name(Some("Ada"), None), "Ada");
        assert_eq!(name(Some(""), Some("Lovelace")), "Lovelace");
        assert_eq!(name(None, None), "");
    }

    #[test]
    fn view_serializes_public_shape() {
        let view = serde_json::to_value(post().view()).unwrap();

        assert_eq!(
            view,
            json!({
                "id": "42",
                "title": "On Engines",
                "author": "Ada Lovelace",
                "content": "Notes",
                "created": "2025-03-01T12:00:00Z",
            })
        );
    }

    #[test]
    fn created_is_stable_across_views() {
        let post = post();

        assert_eq!(post.view().created, post.view().created);
    }

    #[test]
    fn list_uses_blog_posts_key() {
        let list = serde_json::to_value(PostList::from_posts(&[post()])).unwrap();

        assert_eq!(list["blogPosts"][0]["author"], "Ada Lovelace");
    }

    #[test]
    fn apply_keeps_omitted_fields() {
        let mut post = post();
        post.apply(&UpdatePost {
            id: post.id,
            title: Some("Retitled".to_owned()),
            ..UpdatePost::default()
        });

        assert_eq!(post.title, "Retitled");
        assert_eq!(post.author.display_name(), "Ada Lovelace");
        assert_eq!(post.content, "Notes");
    }
}
