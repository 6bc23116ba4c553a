use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use thiserror::Error;

use crate::claims::TokenType;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is missing")]
    MissingToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token is malformed: {0}")]
    MalformedToken(String),
    #[error("expected {expected} token but received {found} token")]
    WrongTokenType {
        expected: TokenType,
        found: TokenType,
    },
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("failed to parse {0} key: {1}")]
    KeyParse(&'static str, String),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("cookie '{0}' contains characters not allowed in a header")]
    InvalidCookie(String),
}

impl AuthError {
    /// True for failures caused by the presented credential rather than by
    /// server-side key or hashing setup.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::ExpiredToken
                | AuthError::MalformedToken(_)
                | AuthError::WrongTokenType { .. }
                | AuthError::InvalidClaim(_, _)
                | AuthError::InvalidAuthorization
        )
    }

    /// Converts into the HTTP envelope, pointing the location at `cookie`.
    pub fn into_api_error(self, cookie: &str) -> ApiError {
        if self.is_credential_error() {
            ApiError::unauthorized(self.to_string()).with_location(["cookies", cookie])
        } else {
            ApiError::internal(self)
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            JwtErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::MalformedToken(value.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        value.into_api_error(crate::extractors::ACCESS_TOKEN_COOKIE)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_http_errors::{ErrorKind, Location};

    #[test]
    fn credential_errors_become_unauthorized_at_cookie() {
        let err = ApiError::from(AuthError::ExpiredToken);
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            err.location(),
            &[Location::from("cookies"), Location::from("access_token")]
        );
    }

    #[test]
    fn key_errors_are_internal() {
        let err = AuthError::KeyParse("private", "bad pem".into()).into_api_error("refresh_token");
        assert_eq!(err.kind(), ErrorKind::InternalError);
    }

    #[test]
    fn refresh_location_is_respected() {
        let err = AuthError::WrongTokenType {
            expected: TokenType::Refresh,
            found: TokenType::Access,
        }
        .into_api_error("refresh_token");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.location()[1], Location::from("refresh_token"));
        assert_eq!(err.message(), "expected refresh token but received access token");
    }
}
