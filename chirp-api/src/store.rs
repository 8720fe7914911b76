//! Persistence seam for posts. Production plugs in [`DbClient`]; tests plug
//! in an in-memory store.

use async_trait::async_trait;
use chirp_common::model::{
    author::AuthorId,
    post::{Post, PostContent},
};
use chirp_db::client::{DbClient, DbError};
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(#[from] DbError);

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Assigns id and creation time, persists, returns the stored post.
    async fn create(&self, author: &AuthorId, content: &PostContent) -> Result<Post, StoreError>;

    /// Up to `limit` most recent posts, newest first, ties broken by id.
    async fn recent(&self, limit: u32) -> Result<Vec<Post>, StoreError>;

    /// Same ordering as [`Self::recent`], filtered to one author.
    async fn by_author(&self, author: &AuthorId, limit: u32) -> Result<Vec<Post>, StoreError>;
}

#[async_trait]
impl PostStore for DbClient {
    async fn create(&self, author: &AuthorId, content: &PostContent) -> Result<Post, StoreError> {
        Ok(self.create_post(author, content).await?)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Post>, StoreError> {
        Ok(self.fetch_recent_posts(limit).await?)
    }

    async fn by_author(&self, author: &AuthorId, limit: u32) -> Result<Vec<Post>, StoreError> {
        Ok(self.fetch_author_posts(author, limit).await?)
    }
}
