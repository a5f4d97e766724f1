//! Session cookie handling.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use vitae_config::{CookieConfig, Environment, SameSitePolicy};
use vitae_core::SessionToken;

/// Resolved session cookie attributes.
///
/// Built once at startup so the production `Secure` override is applied in
/// one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookies {
    name: String,
    path: String,
    secure: bool,
    http_only: bool,
    same_site: SameSite,
}

impl SessionCookies {
    pub fn from_config(config: &CookieConfig, environment: Environment) -> Self {
        Self {
            name: config.name.clone(),
            path: config.path.clone(),
            secure: config.is_secure(environment),
            http_only: config.http_only,
            same_site: match config.same_site {
                SameSitePolicy::Strict => SameSite::Strict,
                SameSitePolicy::Lax => SameSite::Lax,
                SameSitePolicy::None => SameSite::None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Reads the session token from the jar. Empty values count as absent.
    pub fn token(&self, jar: &CookieJar) -> Option<SessionToken> {
        jar.get(&self.name)
            .map(|cookie| cookie.value().trim())
            .filter(|value| !value.is_empty())
            .map(SessionToken::new)
    }

    /// Cookie carrying `token` with the configured attributes.
    pub fn session_cookie(&self, token: &SessionToken) -> Cookie<'static> {
        self.with_attributes(token.as_str().to_string())
    }

    /// Cookie that clears the session token in the browser.
    ///
    /// Path and flags must match the issued cookie or browsers keep the old one.
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = self.with_attributes(String::new());
        cookie.make_removal();
        cookie
    }

    fn with_attributes(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), value))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site)
            .build()
    }
}

impl Default for SessionCookies {
    fn default() -> Self {
        Self::from_config(&CookieConfig::default(), Environment::Development)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cookies = SessionCookies::default();
        let cookie = cookies.session_cookie(&SessionToken::new("abc"));

        assert_eq!(cookie.name(), "session-token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert!(!cookies.is_secure());
    }

    #[test]
    fn test_production_forces_secure() {
        let config = CookieConfig {
            secure: Some(false),
            ..CookieConfig::default()
        };
        let cookies = SessionCookies::from_config(&config, Environment::Production);
        assert!(cookies.is_secure());
    }

    #[test]
    fn test_custom_name_and_same_site() {
        let config = CookieConfig {
            name: "sid".to_string(),
            same_site: SameSitePolicy::Strict,
            ..CookieConfig::default()
        };
        let cookies = SessionCookies::from_config(&config, Environment::Staging);
        let jar = CookieJar::new().add(Cookie::new("sid", "tok"));

        assert_eq!(cookies.name(), "sid");
        assert_eq!(cookies.token(&jar).unwrap().as_str(), "tok");
        assert_eq!(cookies.removal().same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let cookies = SessionCookies::default();
        let jar = CookieJar::new().add(Cookie::new("session-token", ""));
        assert!(cookies.token(&jar).is_none());
        assert!(cookies.token(&CookieJar::new()).is_none());
    }

    #[test]
    fn test_removal_cookie_expires() {
        let removal = SessionCookies::default().removal();
        assert_eq!(removal.value(), "");
        assert_eq!(removal.path(), Some("/"));
        assert!(removal.max_age().is_some());
    }
}
