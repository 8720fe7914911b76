use crate::feed;
use crate::identity::IdentityLookup;
use crate::rate_limit::RateLimiter;
use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use crate::store::PostStore;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chirp_common::model::{
    author::AuthorId,
    feed::FeedEntry,
    post::{Post, PostContent},
};
use chirp_db::client::DEFAULT_POST_LIMIT;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_feed)
        .typed_post(create_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct GetFeedPath();

async fn get_feed(
    GetFeedPath(): GetFeedPath,
    State(post_store): State<Arc<dyn PostStore>>,
    State(identity): State<Arc<dyn IdentityLookup>>,
) -> Result<Json<Vec<FeedEntry>>> {
    let posts = post_store.recent(DEFAULT_POST_LIMIT).await?;
    let entries = feed::assemble(posts, identity.as_ref()).await?;

    Ok(Json(entries))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct CreatePostBody {
    content: String,
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(post_store): State<Arc<dyn PostStore>>,
    State(rate_limiter): State<Arc<dyn RateLimiter>>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostBody>,
) -> Result<Json<Post>> {
    let post = submit(
        post_store.as_ref(),
        rate_limiter.as_ref(),
        &user.into_user_id(),
        body.content,
    )
    .await?;

    Ok(Json(post))
}

/// Validation, then admission, then the write. Short-circuits on the first
/// failure, so nothing is persisted and no window slot is consumed unless the
/// steps before it passed.
async fn submit(
    post_store: &dyn PostStore,
    rate_limiter: &dyn RateLimiter,
    author: &AuthorId,
    content: String,
) -> Result<Post> {
    let content = PostContent::new(content)?;

    if !rate_limiter.try_acquire(author.get()).await? {
        return Err(ServerError::RateLimited);
    }

    Ok(post_store.create(author, &content).await?)
}

#[cfg(test)]
mod tests {
    use crate::rate_limit::{RateLimitPolicy, testing::MemoryRateLimiter};
    use crate::server::ServerError;
    use crate::server::routes::posts::submit;
    use crate::store::testing::MemoryPostStore;
    use chirp_common::model::author::AuthorId;
    use std::collections::HashSet;

    #[tokio::test]
    async fn invalid_content_persists_nothing_and_consumes_no_slot() {
        let store = MemoryPostStore::new();
        let limiter = MemoryRateLimiter::new(RateLimitPolicy::default());
        let author = AuthorId::from("u1");

        let err = submit(&store, &limiter, &author, "hello".to_owned())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidContent(_)));
        assert_eq!(store.post_count(), 0);

        // The rejected submission left the full window available.
        for _ in 0..3 {
            submit(&store, &limiter, &author, "😀".to_owned())
                .await
                .unwrap();
        }
        assert_eq!(store.post_count(), 3);
    }

    #[tokio::test]
    async fn fourth_submission_within_window_is_rate_limited() {
        let store = MemoryPostStore::new();
        let limiter = MemoryRateLimiter::new(RateLimitPolicy::default());
        let author = AuthorId::from("u1");

        let mut ids = HashSet::new();
        let mut previous_created_at = None;
        for _ in 0..3 {
            let post = submit(&store, &limiter, &author, "😀".to_owned())
                .await
                .unwrap();
            assert!(ids.insert(post.id));
            if let Some(previous) = previous_created_at {
                assert!(post.created_at >= previous);
            }
            previous_created_at = Some(post.created_at);
        }

        let err = submit(&store, &limiter, &author, "😀".to_owned())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::RateLimited));
        assert_eq!(store.post_count(), 3);
    }

    #[tokio::test]
    async fn validation_outranks_the_rate_limit() {
        let store = MemoryPostStore::new();
        let limiter = MemoryRateLimiter::new(RateLimitPolicy::default());
        let author = AuthorId::from("u1");

        for _ in 0..3 {
            submit(&store, &limiter, &author, "😀".to_owned())
                .await
                .unwrap();
        }

        // Exhausted window, but invalid content still reports validation.
        let err = submit(&store, &limiter, &author, "hello".to_owned())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidContent(_)));
    }

    #[tokio::test]
    async fn callers_are_limited_independently() {
        let store = MemoryPostStore::new();
        let limiter = MemoryRateLimiter::new(RateLimitPolicy::default());

        for _ in 0..3 {
            submit(&store, &limiter, &AuthorId::from("u1"), "😀".to_owned())
                .await
                .unwrap();
        }

        submit(&store, &limiter, &AuthorId::from("u2"), "🎉".to_owned())
            .await
            .unwrap();
        assert_eq!(store.post_count(), 4);
    }
}
