use crate::model::{author::FeedAuthor, post::Post};
use serde::{Deserialize, Serialize};

/// Transient join of a post with its fully resolved author. Produced per
/// request by the feed assembler; never persisted.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct FeedEntry {
    pub post: Post,
    pub author: FeedAuthor,
}
