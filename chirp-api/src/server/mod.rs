use crate::feed::FeedError;
use crate::identity::{IdentityError, IdentityLookup};
use crate::rate_limit::{RateLimitError, RateLimiter};
use crate::store::{PostStore, StoreError};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use chirp_common::model::post::ContentValidationError;
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub post_store: Arc<dyn PostStore>,
    pub identity: Arc<dyn IdentityLookup>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("Provided session token was invalid")]
    InvalidSession,
    #[error("Post content was rejected: {0}")]
    InvalidContent(#[from] ContentValidationError),
    #[error("Caller exceeded the posting rate limit")]
    RateLimited,
    #[error(transparent)]
    RateLimiter(#[from] RateLimitError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Feed could not be assembled: {0}")]
    Feed(FeedError),
}

impl From<FeedError> for ServerError {
    fn from(value: FeedError) -> Self {
        match value {
            FeedError::Identity(err) => Self::Identity(err),
            err @ FeedError::UnresolvedAuthor(_) => Self::Feed(err),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidSession => StatusCode::UNAUTHORIZED,
            ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidContent(_) => StatusCode::BAD_REQUEST,
            ServerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServerError::JsonResponse(_)
            | ServerError::RateLimiter(_)
            | ServerError::Identity(_)
            | ServerError::Store(_)
            | ServerError::Feed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code surfaced to the UI layer.
    pub fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::TOO_MANY_REQUESTS => "TOO_MANY_REQUESTS",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        error!(error = %self, %status, code, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            code,
        };
        (status, Json(error_response)).into_response()
    }
}
