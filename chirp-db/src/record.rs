use chirp_common::model::{
    ModelValidationError,
    author::AuthorId,
    post::{Post, PostContent},
};
use sqlx::FromRow;
use time::PrimitiveDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub author_id: String,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author_id: AuthorId::new(value.author_id),
            content: PostContent::new(value.content)?,
            created_at: value.created_at.as_utc(),
        })
    }
}
