use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::{Claims, TokenType};
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Verifies tokens minted by [`crate::TokenSigner`] using the public key only.
#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig, key: DecodingKey) -> Self {
        Self { config, key }
    }

    pub fn from_pem(config: JwtConfig, public_pem: &[u8]) -> AuthResult<Self> {
        let key = decoding_key_from_pem(config.algorithm, public_pem)?;
        Ok(Self::new(config, key))
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Verifies signature and expiry, then checks the token's type marker.
    pub fn verify(&self, token: &str, expected: TokenType) -> AuthResult<Claims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let mut validation = Validation::new(self.config.algorithm);
        validation.leeway = self.config.leeway_seconds.into();
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Value>(token, &self.key, &validation)?;
        let claims = Claims::try_from(token_data.claims)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected,
                found: claims.token_type,
            });
        }

        debug!(
            subject = %claims.subject,
            token_type = expected.as_str(),
            "verified JWT successfully"
        );
        Ok(claims)
    }
}

fn decoding_key_from_pem(algorithm: Algorithm, pem: &[u8]) -> AuthResult<DecodingKey> {
    let key = match algorithm {
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(AuthError::UnsupportedAlgorithm(format!("{algorithm:?}")))
        }
        _ => DecodingKey::from_rsa_pem(pem),
    };
    key.map_err(|err| AuthError::KeyParse("public", err.to_string()))
}
