use crate::model::{Id, author::AuthorId};
use regex::Regex;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::sync::LazyLock;
use thiserror::Error;
use time::UtcDateTime;

pub const POST_CONTENT_MAX_LEN: usize = 280;

/// The upstream validator's emoji definition: pictographs plus the components
/// that combine into them (skin tones, ZWJ, variation selectors, flags).
static EMOJI_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\p{Extended_Pictographic}|\p{Emoji_Component})+$")
        .expect("emoji pattern is valid")
});

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author_id: AuthorId,
    pub content: PostContent,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum ContentValidationError {
    #[error("Post content must not be empty")]
    Empty,
    #[error("Post content is {0} characters long, over the limit of {POST_CONTENT_MAX_LEN}")]
    TooLong(usize),
    #[error("Post content must consist of emoji only")]
    NotEmoji,
}

impl PostContent {
    /// Validates at the boundary; a [`PostContent`] never holds an invalid payload.
    pub fn new(content: String) -> Result<Self, ContentValidationError> {
        let char_count = content.chars().count();
        if char_count == 0 {
            return Err(ContentValidationError::Empty);
        }
        if char_count > POST_CONTENT_MAX_LEN {
            return Err(ContentValidationError::TooLong(char_count));
        }
        if !EMOJI_ONLY.is_match(&content) {
            return Err(ContentValidationError::NotEmoji);
        }

        Ok(Self(content))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(inner.clone())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"PostContent"))
    }
}
