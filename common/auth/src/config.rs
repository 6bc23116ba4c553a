use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Duration;
use jsonwebtoken::Algorithm;

use crate::error::{AuthError, AuthResult};

/// Runtime configuration for issuing and verifying JWTs.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Asymmetric algorithm used for both signing and verification.
    pub algorithm: Algorithm,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtConfig {
    /// Construct config with the service defaults: 30 second leeway, 120 minute
    /// access tokens and 600 minute refresh tokens.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            leeway_seconds: 30,
            access_ttl: Duration::minutes(120),
            refresh_ttl: Duration::minutes(600),
        }
    }

    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::new(Algorithm::RS256)
    }
}

/// Parses an algorithm name, accepting only asymmetric families.
pub fn parse_algorithm(value: &str) -> AuthResult<Algorithm> {
    let trimmed = value.trim();
    let algorithm: Algorithm = trimmed
        .parse::<Algorithm>()
        .or_else(|_| trimmed.to_ascii_uppercase().parse::<Algorithm>())
        .map_err(|_| AuthError::UnsupportedAlgorithm(trimmed.to_owned()))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            Err(AuthError::UnsupportedAlgorithm(trimmed.to_owned()))
        }
        other => Ok(other),
    }
}

/// Decodes a base64-encoded PEM document as supplied through the environment.
pub fn decode_pem(encoded: &str) -> AuthResult<Vec<u8>> {
    let compact: String = encoded.split_whitespace().collect();
    STANDARD
        .decode(compact)
        .map_err(|err| AuthError::KeyParse("base64", err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_token_lifetimes() {
        let config = JwtConfig::default();
        assert_eq!(config.algorithm, Algorithm::RS256);
        assert_eq!(config.access_ttl.num_seconds(), 120 * 60);
        assert_eq!(config.refresh_ttl.num_seconds(), 600 * 60);
        assert_eq!(config.with_leeway(5).leeway_seconds, 5);
    }

    #[test]
    fn parse_algorithm_rejects_symmetric_keys() {
        assert_eq!(parse_algorithm("rs256").unwrap(), Algorithm::RS256);
        assert_eq!(parse_algorithm(" ES256 ").unwrap(), Algorithm::ES256);
        assert!(matches!(
            parse_algorithm("HS256"),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
        assert!(parse_algorithm("none").is_err());
    }

    #[test]
    fn decode_pem_accepts_wrapped_base64() {
        let encoded = STANDARD.encode("-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----\n");
        let (head, tail) = encoded.split_at(10);
        let wrapped = format!("{head}\n{tail}");
        let pem = decode_pem(&wrapped).expect("decode");
        assert!(String::from_utf8(pem).unwrap().starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(decode_pem("***").is_err());
    }
}
