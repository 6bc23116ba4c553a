use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tracing::debug;

use crate::claims::{ClaimsRepr, TokenSubject, TokenType};
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Mints signed access and refresh tokens with the configured private key.
pub struct TokenSigner {
    config: JwtConfig,
    encoding_key: EncodingKey,
}

impl TokenSigner {
    pub fn new(config: JwtConfig, encoding_key: EncodingKey) -> Self {
        Self {
            config,
            encoding_key,
        }
    }

    pub fn from_pem(config: JwtConfig, private_pem: &[u8]) -> AuthResult<Self> {
        let encoding_key = encoding_key_from_pem(config.algorithm, private_pem)?;
        Ok(Self::new(config, encoding_key))
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn issue_access(&self, subject: &TokenSubject, ttl: Duration) -> AuthResult<IssuedToken> {
        self.issue(TokenType::Access, subject, ttl)
    }

    pub fn issue_refresh(&self, subject: &TokenSubject, ttl: Duration) -> AuthResult<IssuedToken> {
        self.issue(TokenType::Refresh, subject, ttl)
    }

    pub fn issue(
        &self,
        token_type: TokenType,
        subject: &TokenSubject,
        ttl: Duration,
    ) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = ClaimsRepr {
            sub: subject.id.clone(),
            token_type,
            account: subject.account,
            exp: expires_at.timestamp(),
            iat: Some(now.timestamp()),
        };

        let header = Header::new(self.config.algorithm);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;
        debug!(
            subject = %subject.id,
            account = subject.account.as_str(),
            token_type = token_type.as_str(),
            "issued JWT"
        );

        Ok(IssuedToken {
            token,
            token_type,
            expires_at,
            expires_in: ttl.num_seconds(),
        })
    }
}

fn encoding_key_from_pem(algorithm: Algorithm, pem: &[u8]) -> AuthResult<EncodingKey> {
    let key = match algorithm {
        Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => EncodingKey::from_ed_pem(pem),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(AuthError::UnsupportedAlgorithm(format!("{algorithm:?}")))
        }
        _ => EncodingKey::from_rsa_pem(pem),
    };
    key.map_err(|err| AuthError::KeyParse("private", err.to_string()))
}
