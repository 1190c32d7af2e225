//! `RequireAuth`: the bearer-token extractor every non-public route takes

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use std::sync::Arc;

use super::{AuthContext, TokenError};
use crate::app::AppState;
use crate::error::ErrorResponse;
use crate::middleware::X_REQUEST_ID;

/// A verified account token
///
/// ```ignore
/// async fn handler(auth: RequireAuth) -> String {
///     format!("account {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingToken,
    InvalidFormat,
    Expired,
    InvalidToken,
}

/// Rejection for `RequireAuth`; always a 401
#[derive(Debug)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    request_id: Option<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self.kind {
            AuthErrorKind::MissingToken => "Missing authorization token",
            AuthErrorKind::InvalidFormat => "Invalid authorization format",
            AuthErrorKind::Expired => "Token has expired",
            AuthErrorKind::InvalidToken => "Invalid token",
        };

        let body = ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            request_id: self.request_id,
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// The token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthErrorKind> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthErrorKind::MissingToken)?
        .to_str()
        .map_err(|_| AuthErrorKind::InvalidFormat)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthErrorKind::InvalidFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthErrorKind::InvalidFormat);
    }

    match token.trim() {
        "" => Err(AuthErrorKind::MissingToken),
        token => Ok(token),
    }
}

fn classify(err: &TokenError) -> AuthErrorKind {
    match err {
        TokenError::Invalid(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            AuthErrorKind::Expired
        }
        _ => AuthErrorKind::InvalidToken,
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let reject = |kind| AuthError {
            kind,
            request_id: parts
                .headers
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        };

        let token = bearer_token(&parts.headers).map_err(reject)?;

        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            reject(classify(&e))
        })?;

        let context = AuthContext::from_claims(claims).map_err(|e| {
            tracing::warn!(error = %e, "Token subject is not an account id");
            reject(AuthErrorKind::InvalidToken)
        })?;

        Ok(RequireAuth(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Ok("abc"));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_eq!(
            bearer_token(&HeaderMap::new()),
            Err(AuthErrorKind::MissingToken)
        );
        assert_eq!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthErrorKind::InvalidFormat)
        );
        assert_eq!(
            bearer_token(&headers("Bearer")),
            Err(AuthErrorKind::InvalidFormat)
        );
        assert_eq!(
            bearer_token(&headers("Bearer  ")),
            Err(AuthErrorKind::MissingToken)
        );
    }
}
