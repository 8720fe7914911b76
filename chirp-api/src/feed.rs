//! Joins a batch of posts with their resolved authors.

use crate::identity::{IdentityError, IdentityLookup};
use chirp_common::model::{
    author::{AuthorId, AuthorProfile},
    feed::FeedEntry,
    post::Post,
};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Author {0} for post could not be fully resolved")]
    UnresolvedAuthor(AuthorId),
}

/// Resolves all distinct authors in one batch call and pairs each post with
/// its author, preserving the input order.
///
/// All-or-nothing: one post whose author is missing, or whose profile lacks a
/// display field, fails the whole batch.
pub async fn assemble(
    posts: Vec<Post>,
    identity: &dyn IdentityLookup,
) -> Result<Vec<FeedEntry>, FeedError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let author_ids: Vec<AuthorId> = posts
        .iter()
        .map(|post| post.author_id.clone())
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let profiles = identity.resolve(&author_ids).await?;

    posts
        .into_iter()
        .map(|post| {
            let author = profiles
                .get(&post.author_id)
                .cloned()
                .and_then(AuthorProfile::into_feed_author)
                .ok_or_else(|| FeedError::UnresolvedAuthor(post.author_id.clone()))?;

            Ok(FeedEntry { post, author })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::feed::{FeedError, assemble};
    use crate::identity::{IdentityError, IdentityLookup};
    use async_trait::async_trait;
    use chirp_common::model::{
        author::{AuthorId, AuthorProfile},
        post::{Post, PostContent},
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::UtcDateTime;

    struct FakeIdentity {
        profiles: HashMap<AuthorId, AuthorProfile>,
        resolve_calls: AtomicUsize,
    }

    impl FakeIdentity {
        fn new(profiles: impl IntoIterator<Item = AuthorProfile>) -> Self {
            Self {
                profiles: profiles
                    .into_iter()
                    .map(|profile| (profile.id.clone(), profile))
                    .collect(),
                resolve_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityLookup for FakeIdentity {
        async fn resolve(
            &self,
            ids: &[AuthorId],
        ) -> Result<HashMap<AuthorId, AuthorProfile>, IdentityError> {
            self.resolve_calls.fetch_add(1, Ordering::Relaxed);
            Ok(ids
                .iter()
                .filter_map(|id| self.profiles.get(id).cloned().map(|p| (id.clone(), p)))
                .collect())
        }

        async fn verify_session(&self, _token: &str) -> Result<Option<AuthorId>, IdentityError> {
            Ok(None)
        }
    }

    fn profile(id: &str) -> AuthorProfile {
        AuthorProfile {
            id: AuthorId::from(id),
            username: Some(format!("{id}-name")),
            profile_picture: Some(format!("https://img.example/{id}.png")),
        }
    }

    fn post(id: u64, author: &str) -> Post {
        Post {
            id: id.into(),
            author_id: AuthorId::from(author),
            content: PostContent::new("😀".to_owned()).unwrap(),
            created_at: UtcDateTime::now(),
        }
    }

    #[tokio::test]
    async fn empty_batch_makes_no_identity_call() {
        let identity = FakeIdentity::new([]);

        let entries = assemble(Vec::new(), &identity).await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(identity.resolve_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn entries_preserve_input_order() {
        let identity = FakeIdentity::new([profile("u1"), profile("u2")]);
        let posts = vec![post(3, "u1"), post(2, "u2"), post(1, "u1")];

        let entries = assemble(posts, &identity).await.unwrap();

        let ids: Vec<u64> = entries.iter().map(|entry| entry.post.id.into()).collect();
        assert_eq!(ids, [3, 2, 1]);
        assert_eq!(entries[0].author.username, "u1-name");
        assert_eq!(entries[1].author.username, "u2-name");
        // Distinct authors resolved in one batch, not per post.
        assert_eq!(identity.resolve_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn unknown_author_fails_whole_batch() {
        let identity = FakeIdentity::new([profile("u1")]);
        let posts = vec![post(2, "u1"), post(1, "ghost")];

        let result = assemble(posts, &identity).await;

        assert!(matches!(
            result,
            Err(FeedError::UnresolvedAuthor(id)) if id.get() == "ghost"
        ));
    }

    #[tokio::test]
    async fn author_without_username_fails_whole_batch() {
        let mut partial = profile("u2");
        partial.username = None;
        let identity = FakeIdentity::new([profile("u1"), partial]);
        let posts = vec![post(2, "u1"), post(1, "u2")];

        let result = assemble(posts, &identity).await;

        assert!(matches!(result, Err(FeedError::UnresolvedAuthor(_))));
    }

    #[tokio::test]
    async fn author_without_picture_fails_whole_batch() {
        let mut partial = profile("u1");
        partial.profile_picture = None;
        let identity = FakeIdentity::new([partial]);

        let result = assemble(vec![post(1, "u1")], &identity).await;

        assert!(matches!(result, Err(FeedError::UnresolvedAuthor(_))));
    }
}
