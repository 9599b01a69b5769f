use crate::server::{
    Result, ServerError, ServerRouter,
    json::{Created, Json},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use blogposts_common::model::{
    Id,
    post::{CreatePost, PostList, PostMarker, PostView, UpdatePost},
};
use blogposts_db::store::PostStore;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<Json<PostList>> {
    let posts = store.list_posts().await?;

    Ok(Json(PostList::from_posts(&posts)))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<Json<PostView>> {
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post.view()))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn PostStore>>,
    Json(payload): Json<Value>,
) -> Result<Created<PostView>> {
    let post = CreatePost::from_payload(&payload)?;
    let post = store.create_post(&post).await?;
    info!(id = %post.id, "Created post");

    Ok(Created(post.view()))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    Json(payload): Json<Value>,
) -> Result<Json<PostView>> {
    let update = UpdatePost::from_payload(id, &payload)?;
    let post = store
        .update_post(&update)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    info!(%id, "Updated post");

    Ok(Json(post.view()))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<StatusCode> {
    if store.delete_post(id).await? {
        info!(%id, "Deleted post");
    } else {
        debug!(%id, "Post to delete did not exist");
    }

    Ok(StatusCode::NO_CONTENT)
}
