//! Caller identity.
//!
//! The identity provider sits in front of this service and forwards the
//! authenticated user id in the `x-user-id` header. A request without it
//! is rejected before any handler logic runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

impl Caller {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Caller(id.to_string()))
            .ok_or_else(|| ApiError::from(ecoquest_core::Error::Unauthenticated))
    }
}
