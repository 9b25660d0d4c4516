//! Principal resolution
//!
//! Authentication happens upstream. The authenticator forwards the caller
//! as two headers:
//! - `X-Principal-Id`: opaque user id (required)
//! - `X-Principal-Admin`: `true` for administrators (optional)
//!
//! [`principal_middleware`] turns them into a [`Principal`] request
//! extension and returns 401 when the id is absent. Handlers take
//! [`AuthPrincipal`] to read it back.

use crate::error::ApiError;
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use kanban_core::Principal;

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ADMIN_HEADER: &str = "x-principal-admin";

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Resolve the forwarded principal or reject the request with 401.
pub async fn principal_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, PrincipalError> {
    let principal = principal_from_headers(request.headers())?;
    tracing::debug!(user_id = %principal.user_id, is_admin = principal.is_admin, "Resolved principal");
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Like [`principal_middleware`], but requests without headers run as a
/// local administrator.
#[cfg(any(test, feature = "dev"))]
pub async fn dev_principal_middleware(mut request: Request, next: Next) -> Response {
    let principal = principal_from_headers(request.headers())
        .unwrap_or_else(|_| Principal::admin("dev"));
    request.extensions_mut().insert(principal);
    next.run(request).await
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, PrincipalError> {
    let user_id = headers
        .get(PRINCIPAL_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            PrincipalError(ApiError::unauthorized(
                "Missing X-Principal-Id header",
            ))
        })?;

    let is_admin = match headers.get(PRINCIPAL_ADMIN_HEADER) {
        None => false,
        Some(value) => match value.to_str().map(|v| v.trim().to_ascii_lowercase()) {
            Ok(v) if v == "true" => true,
            Ok(v) if v == "false" => false,
            _ => {
                return Err(PrincipalError(ApiError::invalid_format(
                    PRINCIPAL_ADMIN_HEADER,
                    "true or false",
                )))
            }
        },
    };

    Ok(Principal {
        user_id: user_id.to_string(),
        is_admin,
    })
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for the middleware and extractor.
#[derive(Debug)]
pub struct PrincipalError(pub ApiError);

impl IntoResponse for PrincipalError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// The caller resolved by [`principal_middleware`].
///
/// Rejects with 401 when no principal was resolved for the request.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = PrincipalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthPrincipal)
            .ok_or_else(|| PrincipalError(ApiError::unauthorized("No authenticated principal")))
    }
}

impl std::ops::Deref for AuthPrincipal {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_principal_from_headers() {
        let principal = principal_from_headers(&headers(&[(PRINCIPAL_ID_HEADER, "alice")])).unwrap();
        assert_eq!(principal, Principal::user("alice"));

        let admin = principal_from_headers(&headers(&[
            (PRINCIPAL_ID_HEADER, "root"),
            (PRINCIPAL_ADMIN_HEADER, "TRUE"),
        ]))
        .unwrap();
        assert_eq!(admin, Principal::admin("root"));
    }

    #[test]
    fn test_missing_principal_is_unauthorized() {
        let err = principal_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.0.code, crate::error::ErrorCode::Unauthorized);

        let blank = principal_from_headers(&headers(&[(PRINCIPAL_ID_HEADER, "  ")])).unwrap_err();
        assert_eq!(blank.0.code, crate::error::ErrorCode::Unauthorized);
    }

    #[test]
    fn test_malformed_admin_flag() {
        let err = principal_from_headers(&headers(&[
            (PRINCIPAL_ID_HEADER, "alice"),
            (PRINCIPAL_ADMIN_HEADER, "yes"),
        ]))
        .unwrap_err();
        assert_eq!(err.0.code, crate::error::ErrorCode::InvalidFormat);
    }
}
