use crate::record::PostRecord;
use chirp_common::model::{
    ChirpSnowflakeGenerator, ModelValidationError,
    author::AuthorId,
    post::{Post, PostContent},
};
use chirp_common::snowflake::{ProcessId, WorkerId};
use sqlx::PgPool;
use std::sync::Mutex;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Default page size for feed queries.
pub const DEFAULT_POST_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<ChirpSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(ChirpSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn next_snowflake(&self) -> u64 {
        self.snowflake_generator
            .lock()
            .expect("snowflake generator lock poisoned")
            .generate()
            .get()
    }

    /// Persists a new post. The store assigns `created_at`; content is assumed
    /// validated by the caller (the boundary owns that invariant).
    pub async fn create_post(&self, author: &AuthorId, content: &PostContent) -> Result<Post> {
        let post_snowflake = self.next_snowflake();

        let record = sqlx::query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts (post_snowflake, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING post_snowflake, author_id, content, created_at
            ",
        )
        .bind(post_snowflake.cast_signed())
        .bind(author.get())
        .bind(content.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    /// Most recent posts, newest first; ties broken by id, newest first.
    pub async fn fetch_recent_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.author_id,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            ORDER BY
                posts.created_at DESC,
                posts.post_snowflake DESC
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| record.try_into().map_err(DbError::Data))
            .collect()
    }

    /// Same ordering as [`Self::fetch_recent_posts`], filtered to one author.
    pub async fn fetch_author_posts(&self, author: &AuthorId, limit: u32) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.author_id,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            WHERE
                posts.author_id = $1
            ORDER BY
                posts.created_at DESC,
                posts.post_snowflake DESC
            LIMIT $2
            ",
        )
        .bind(author.get())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| record.try_into().map_err(DbError::Data))
            .collect()
    }
}
