use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use common_auth::{decode_pem, parse_algorithm, CookiePolicy, CookieSameSite, JwtConfig};
use common_store::MongoConfig;

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub mongo: MongoConfig,
    pub jwt: JwtConfig,
    pub cookies: CookiePolicy,
    pub cors_allowed_origins: Vec<String>,
    /// Page size used when a list request has no `limit` or `limit=0`.
    pub default_find_limit: i64,
}

impl ServiceConfig {
    /// Configuration with every default applied and a local MongoDB URL.
    pub fn local() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            mongo: MongoConfig::new("mongodb://localhost:27017", "hms_db"),
            jwt: JwtConfig::default(),
            cookies: CookiePolicy::default(),
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            default_find_limit: 25,
        }
    }
}

/// PEM signing material. Kept apart from `ServiceConfig` so it never shows up
/// in a `Debug` dump.
pub struct KeyMaterial {
    pub private_pem: Vec<u8>,
    pub public_pem: Vec<u8>,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = number_from_env("PORT", 8000u16)?;

    let mongo_url = env::var("MONGODB_URL").context("MONGODB_URL must be set")?;
    let mongo_database = env::var("MONGODB_DATABASE")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "hms_db".to_string());

    let algorithm = env::var("JWT_ALGORITHM")
        .ok()
        .map(|value| parse_algorithm(&value))
        .transpose()
        .context("Failed to parse JWT_ALGORITHM")?;
    let mut jwt = algorithm.map(JwtConfig::new).unwrap_or_default();
    jwt = jwt
        .with_leeway(number_from_env("JWT_LEEWAY_SECONDS", 30u32)?)
        .with_access_ttl(Duration::minutes(number_from_env(
            "ACCESS_TOKEN_EXPIRES_IN",
            120i64,
        )?))
        .with_refresh_ttl(Duration::minutes(number_from_env(
            "REFRESH_TOKEN_EXPIRES_IN",
            600i64,
        )?));

    let same_site = env::var("AUTH_COOKIE_SAMESITE")
        .ok()
        .map(|value| parse_same_site(&value))
        .transpose()
        .context("Failed to parse AUTH_COOKIE_SAMESITE")?
        .unwrap_or(CookieSameSite::Lax);
    let cookies = CookiePolicy {
        secure: bool_from_env("AUTH_COOKIE_SECURE").unwrap_or(false),
        same_site,
        domain: env::var("AUTH_COOKIE_DOMAIN")
            .ok()
            .and_then(|value| normalize_optional(&value)),
    };

    let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|value| parse_origins(&value))
        .filter(|origins| !origins.is_empty())
        .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

    let default_find_limit = number_from_env("DEFAULT_FIND_LIMIT", 25i64)?;
    if default_find_limit <= 0 {
        return Err(anyhow!("DEFAULT_FIND_LIMIT must be positive"));
    }

    Ok(ServiceConfig {
        host,
        port,
        mongo: MongoConfig::new(mongo_url, mongo_database),
        jwt,
        cookies,
        cors_allowed_origins,
        default_find_limit,
    })
}

pub fn load_key_material() -> Result<KeyMaterial> {
    let private_key = env::var("JWT_PRIVATE_KEY").context("JWT_PRIVATE_KEY must be set")?;
    let public_key = env::var("JWT_PUBLIC_KEY").context("JWT_PUBLIC_KEY must be set")?;
    Ok(KeyMaterial {
        private_pem: decode_pem(&private_key).context("Failed to decode JWT_PRIVATE_KEY")?,
        public_pem: decode_pem(&public_key).context("Failed to decode JWT_PUBLIC_KEY")?,
    })
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn number_from_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key).ok().and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| anyhow!("Invalid {key} '{value}': {err}")),
        None => Ok(default),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn parse_same_site(value: &str) -> Result<CookieSameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(CookieSameSite::Lax),
        "strict" => Ok(CookieSameSite::Strict),
        "none" => Ok(CookieSameSite::None),
        other => Err(anyhow!(
            "Unsupported cookie same-site policy '{other}'. Use Lax, Strict, or None."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_from_env_parses() {
        std::env::set_var("HOTEL_TEST_BOOL_TRUE", "true");
        std::env::set_var("HOTEL_TEST_BOOL_ONE", "1");
        std::env::set_var("HOTEL_TEST_BOOL_FALSE", "no");
        assert_eq!(bool_from_env("HOTEL_TEST_BOOL_TRUE"), Some(true));
        assert_eq!(bool_from_env("HOTEL_TEST_BOOL_ONE"), Some(true));
        assert_eq!(bool_from_env("HOTEL_TEST_BOOL_FALSE"), Some(false));
        assert_eq!(bool_from_env("HOTEL_TEST_BOOL_UNSET"), None);
    }

    #[test]
    fn number_from_env_falls_back_and_rejects_garbage() {
        std::env::set_var("HOTEL_TEST_NUMBER", "45");
        std::env::set_var("HOTEL_TEST_NUMBER_BAD", "forty");
        assert_eq!(number_from_env("HOTEL_TEST_NUMBER", 1i64).unwrap(), 45);
        assert_eq!(number_from_env("HOTEL_TEST_NUMBER_UNSET", 7i64).unwrap(), 7);
        assert!(number_from_env("HOTEL_TEST_NUMBER_BAD", 1i64).is_err());
    }

    #[test]
    fn same_site_is_case_insensitive() {
        assert_eq!(parse_same_site("STRICT").unwrap(), CookieSameSite::Strict);
        assert_eq!(parse_same_site(" none ").unwrap(), CookieSameSite::None);
        assert!(parse_same_site("sometimes").is_err());
    }

    #[test]
    fn origins_split_on_common_separators() {
        assert_eq!(
            parse_origins("http://a.test, http://b.test;;http://c.test"),
            vec!["http://a.test", "http://b.test", "http://c.test"]
        );
    }

    #[test]
    fn local_defaults_match_documented_values() {
        let config = ServiceConfig::local();
        assert_eq!(config.port, 8000);
        assert_eq!(config.mongo.database, "hms_db");
        assert_eq!(config.default_find_limit, 25);
        assert_eq!(config.jwt.access_ttl, Duration::minutes(120));
        assert_eq!(config.jwt.refresh_ttl, Duration::minutes(600));
    }
}
