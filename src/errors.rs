use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Terminal failure kinds of `KeyStore::authenticate`.
///
/// Every kind maps to 401. Authentication failures are never transient, so
/// none of them is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("API key required. Provide 'x-api-key' header or 'Authorization: Bearer <key>'")]
    MissingCredential,

    #[error("API key header is not valid UTF-8")]
    MalformedCredential,

    #[error("invalid API key format")]
    InvalidFormat,

    #[error("invalid API key")]
    UnknownCredential,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedCredential => "malformed_credential",
            AuthError::InvalidFormat => "invalid_format",
            AuthError::UnknownCredential => "unknown_credential",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("missing permission: {required}")]
    Forbidden { required: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Unauthorized(e) => (e.status(), "authentication_error", e.code(), e.to_string()),
            AppError::Forbidden { required } => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "insufficient_permissions",
                format!("'{}' permission required", required),
            ),
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        if matches!(self, AppError::Unauthorized(_)) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_auth_error_is_401() {
        for err in [
            AuthError::MissingCredential,
            AuthError::MalformedCredential,
            AuthError::InvalidFormat,
            AuthError::UnknownCredential,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            let resp = err.into_response();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
        }
    }

    #[test]
    fn test_forbidden_is_403_without_challenge() {
        let resp = AppError::Forbidden {
            required: "admin".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
