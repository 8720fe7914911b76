use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier issued by the external identity provider. Never minted
/// locally; posts store the authenticated caller's own id verbatim.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for AuthorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<String> for AuthorId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AuthorId {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

/// Public profile fragment as the identity provider returns it. Display fields
/// are nullable upstream; nothing here is persisted or cached locally.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct AuthorProfile {
    pub id: AuthorId,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
}

/// An author whose display fields are all present. Feeds only ever carry these.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct FeedAuthor {
    pub id: AuthorId,
    pub username: String,
    pub profile_picture: String,
}

impl AuthorProfile {
    /// `None` if the profile is missing a display field and cannot be rendered.
    #[must_use]
    pub fn into_feed_author(self) -> Option<FeedAuthor> {
        Some(FeedAuthor {
            id: self.id,
            username: self.username?,
            profile_picture: self.profile_picture?,
        })
    }
}
