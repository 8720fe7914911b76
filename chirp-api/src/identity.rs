//! Adapter for the external identity provider: batch profile lookup plus
//! session verification. No local caching; every request re-resolves.

use async_trait::async_trait;
use chirp_common::model::author::{AuthorId, AuthorProfile};
use reqwest::StatusCode;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use thiserror::Error;

/// Largest id batch the provider accepts per lookup call.
pub const MAX_LOOKUP_BATCH: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider could not be reached: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("Identity provider replied with unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Batch profile lookup. Ids unknown to the provider are absent from the
    /// returned map rather than an error.
    async fn resolve(
        &self,
        ids: &[AuthorId],
    ) -> Result<HashMap<AuthorId, AuthorProfile>, IdentityError>;

    /// Resolves a session token to its subject; `None` when the token does not
    /// belong to a live session.
    async fn verify_session(&self, token: &str) -> Result<Option<AuthorId>, IdentityError>;
}

pub struct HttpIdentityClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

/// Plans the lookup calls for a set of ids: comma-joined query values, at most
/// [`MAX_LOOKUP_BATCH`] ids each.
fn lookup_batches(ids: &[AuthorId]) -> Vec<String> {
    ids.chunks(MAX_LOOKUP_BATCH)
        .map(|chunk| {
            chunk
                .iter()
                .map(AuthorId::get)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect()
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct UserResponse {
    id: String,
    username: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct SessionResponse {
    user_id: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: String, secret_key: String) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            secret_key,
        })
    }
}

impl From<UserResponse> for AuthorProfile {
    fn from(value: UserResponse) -> Self {
        Self {
            id: AuthorId::new(value.id),
            username: value.username,
            profile_picture: value.profile_image_url,
        }
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityClient {
    async fn resolve(
        &self,
        ids: &[AuthorId],
    ) -> Result<HashMap<AuthorId, AuthorProfile>, IdentityError> {
        let mut profiles = HashMap::with_capacity(ids.len());

        for joined in lookup_batches(ids) {
            let response = self
                .http
                .get(format!("{}/v1/users", self.base_url))
                .query(&[("ids", joined.as_str())])
                .bearer_auth(&self.secret_key)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(IdentityError::UnexpectedStatus(response.status()));
            }

            let users: Vec<UserResponse> = response.json().await?;
            for user in users {
                let profile = AuthorProfile::from(user);
                profiles.insert(profile.id.clone(), profile);
            }
        }

        Ok(profiles)
    }

    async fn verify_session(&self, token: &str) -> Result<Option<AuthorId>, IdentityError> {
        let response = self
            .http
            .post(format!("{}/v1/tokens/verify", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let session: SessionResponse = response.json().await?;
                Ok(Some(AuthorId::new(session.user_id)))
            }
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status => Err(IdentityError::UnexpectedStatus(status)),
        }
    }
}
