use crate::identity::IdentityLookup;
use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use chirp_common::model::author::AuthorId;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// Extractor proving the caller presented a live session with the identity
/// provider. Handlers taking this run only for authenticated requests.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    id: AuthorId,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn into_user_id(self) -> AuthorId {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn IdentityLookup>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let identity = Arc::<dyn IdentityLookup>::from_ref(state);
        let user_id = identity
            .verify_session(header.token())
            .await?
            .ok_or(ServerError::InvalidSession)?;

        Ok(Self { id: user_id })
    }
}
