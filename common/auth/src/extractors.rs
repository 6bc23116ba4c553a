use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    request::Parts,
    HeaderMap, HeaderValue,
};
use common_http_errors::ApiError;

use crate::claims::{Claims, TokenType};
use crate::error::{AuthError, AuthResult};
use crate::verifier::JwtVerifier;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const LOGGED_IN_COOKIE: &str = "logged_in";

/// Verified access-token claims taken from the `access_token` cookie or a
/// bearer header.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub token: String,
}

/// Verified refresh-token claims taken from the `refresh_token` cookie or a
/// bearer header.
#[derive(Debug, Clone)]
pub struct RefreshContext {
    pub claims: Claims,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<JwtVerifier>::from_ref(state);
        let (claims, token) =
            verify_from_headers(&verifier, &parts.headers, ACCESS_TOKEN_COOKIE, TokenType::Access)
                .map_err(|err| err.into_api_error(ACCESS_TOKEN_COOKIE))?;
        Ok(Self { claims, token })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RefreshContext
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<JwtVerifier>::from_ref(state);
        let (claims, token) = verify_from_headers(
            &verifier,
            &parts.headers,
            REFRESH_TOKEN_COOKIE,
            TokenType::Refresh,
        )
        .map_err(|err| err.into_api_error(REFRESH_TOKEN_COOKIE))?;
        Ok(Self { claims, token })
    }
}

fn verify_from_headers(
    verifier: &JwtVerifier,
    headers: &HeaderMap,
    cookie: &str,
    expected: TokenType,
) -> AuthResult<(Claims, String)> {
    let token = token_from_headers(headers, cookie)?;
    let claims = verifier.verify(&token, expected)?;
    Ok((claims, token))
}

/// Locates a token in the named cookie, falling back to `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap, cookie: &str) -> AuthResult<String> {
    if let Some(value) = cookie_value(headers, cookie) {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    match headers.get(AUTHORIZATION) {
        Some(value) => parse_bearer(value),
        None => Err(AuthError::MissingToken),
    }
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
}

fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorization)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_accepts_valid_token() {
        let header = HeaderValue::from_static("Bearer abc.def.ghi");
        let token = parse_bearer(&header).expect("token");
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn parse_bearer_rejects_wrong_scheme() {
        let header = HeaderValue::from_static("Basic credentials");
        let err = parse_bearer(&header).expect_err("should reject");
        assert!(matches!(err, AuthError::InvalidAuthorization));
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("logged_in=True; access_token=from.cookie"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from.header"));
        assert_eq!(
            token_from_headers(&headers, ACCESS_TOKEN_COOKIE).unwrap(),
            "from.cookie"
        );
        assert_eq!(
            token_from_headers(&headers, REFRESH_TOKEN_COOKIE).unwrap(),
            "from.header"
        );
    }

    #[test]
    fn missing_token_when_nothing_presented() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token="));
        assert!(matches!(
            token_from_headers(&headers, ACCESS_TOKEN_COOKIE),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn cookie_value_reads_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("refresh_token=r.t.k; b=2"));
        assert_eq!(cookie_value(&headers, "refresh_token").as_deref(), Some("r.t.k"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
