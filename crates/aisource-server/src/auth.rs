//! Caller-identity boundary.
//!
//! Authentication itself is an external collaborator (an identity provider
//! fronting this service). The core only ever consumes "is there an
//! authenticated caller, and what is their id": the fronting layer passes
//! the opaque user id as a bearer token, and this extractor surfaces it or
//! rejects with 401. No verification happens here.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::error::AppError;

/// The authenticated caller's opaque user id.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|id| Caller(id.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}
