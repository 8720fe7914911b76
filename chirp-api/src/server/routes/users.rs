use crate::feed;
use crate::identity::IdentityLookup;
use crate::server::{Result, ServerError, ServerRouter, json::Json};
use crate::store::PostStore;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{author::AuthorId, feed::FeedEntry};
use chirp_db::client::DEFAULT_POST_LIMIT;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct GetUserPostsPath {
    id: AuthorId,
}

async fn get_user_posts(
    GetUserPostsPath { id }: GetUserPostsPath,
    State(post_store): State<Arc<dyn PostStore>>,
    State(identity): State<Arc<dyn IdentityLookup>>,
) -> Result<Json<Vec<FeedEntry>>> {
    let posts = post_store.by_author(&id, DEFAULT_POST_LIMIT).await?;
    let entries = feed::assemble(posts, identity.as_ref()).await?;

    Ok(Json(entries))
}
