//! Shared bearer-token guard for mutating endpoints (SPEC_FULL §6).
//!
//! There is no account model here: a single shared token, configured via `API_KEY`,
//! is compared against the `X-API-Key` header in constant time. When no token is
//! configured the guard is a no-op, matching the spec's "requires the shared bearer
//! token when configured" wording.

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::utils::ApiError;
use crate::AppState;

static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(configured) = state.config.auth.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(&API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing X-API-Key header"))?;

    let matches = provided.len() == configured.len()
        && bool::from(provided.as_bytes().ct_eq(configured.as_bytes()));

    if !matches {
        return Err(ApiError::unauthorized("invalid API key"));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_length_strings_with_different_bytes_do_not_match() {
        let a = b"abcd";
        let b = b"abce";
        assert!(!bool::from(a.ct_eq(b)));
    }

    #[test]
    fn identical_strings_match() {
        let a = b"secret-token";
        let b = b"secret-token";
        assert!(bool::from(a.ct_eq(b)));
    }
}
