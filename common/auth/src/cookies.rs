use axum::http::HeaderValue;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl CookieSameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieSameSite::Lax => "Lax",
            CookieSameSite::Strict => "Strict",
            CookieSameSite::None => "None",
        }
    }
}

/// Attributes shared by every session cookie the service sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub domain: Option<String>,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            same_site: CookieSameSite::Lax,
            domain: None,
        }
    }
}

impl CookiePolicy {
    /// Renders a `Set-Cookie` value with path `/`.
    pub fn render(
        &self,
        name: &str,
        value: &str,
        max_age_seconds: i64,
        http_only: bool,
    ) -> AuthResult<HeaderValue> {
        let mut cookie = format!(
            "{name}={value}; Max-Age={max_age_seconds}; Path=/; SameSite={}",
            self.same_site.as_str()
        );
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|_| AuthError::InvalidCookie(name.to_owned()))
    }

    /// Renders an expired, empty cookie that makes the browser drop `name`.
    pub fn expire(&self, name: &str, http_only: bool, max_age_seconds: i64) -> AuthResult<HeaderValue> {
        self.render(name, "", max_age_seconds, http_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_renders_lax_http_only_cookie() {
        let value = CookiePolicy::default()
            .render("access_token", "abc.def", 7200, true)
            .unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "access_token=abc.def; Max-Age=7200; Path=/; SameSite=Lax; HttpOnly"
        );
    }

    #[test]
    fn secure_domain_policy_adds_attributes() {
        let policy = CookiePolicy {
            secure: true,
            same_site: CookieSameSite::Strict,
            domain: Some("hotel.example".into()),
        };
        let value = policy.render("logged_in", "True", 60, false).unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "logged_in=True; Max-Age=60; Path=/; SameSite=Strict; Domain=hotel.example; Secure"
        );
    }

    #[test]
    fn expire_clears_value() {
        let value = CookiePolicy::default().expire("logged_in", false, -1).unwrap();
        assert!(value.to_str().unwrap().starts_with("logged_in=; Max-Age=-1;"));
    }
}
