//! In-process session store with signed cookies
//!
//! Sessions map an opaque UUID token to the authenticated username. The
//! cookie value is `token.signature` where the signature is HMAC-SHA256 of
//! the token under the configured secret, so a tampered cookie fails before
//! any store lookup. Sessions live for the server process and expire after a
//! configurable TTL.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: uuid::Uuid::new_v4().to_string(),
            ttl_hours: 24,
            cookie_name: "appdock_session".to_string(),
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: "Strict".to_string(),
        }
    }
}

/// A live authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: String,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Server-held session state, keyed by opaque token.
pub struct SessionStore {
    config: SessionConfig,
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    /// Create a session for a user and return the signed cookie value.
    pub fn create(&self, user: &str) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires = now + Duration::hours(self.config.ttl_hours);

        self.sessions.insert(
            token.clone(),
            Session {
                user: user.to_string(),
                created_at: now.timestamp(),
                expires_at: expires.timestamp(),
            },
        );

        format!("{}.{}", token, self.sign(&token))
    }

    /// Resolve a Cookie header to a live session, if any.
    ///
    /// Verifies the cookie signature before touching the store, and evicts
    /// the session when its TTL has passed.
    pub fn authenticate(&self, cookie_header: &str) -> Option<Session> {
        let value = self.extract_cookie_value(cookie_header)?;
        let token = self.verify_cookie_value(&value)?;

        let session = self.sessions.get(&token)?.clone();
        if session.expires_at <= Utc::now().timestamp() {
            drop(self.sessions.remove(&token));
            return None;
        }

        Some(session)
    }

    /// Destroy the session named by a Cookie header. Returns whether a live
    /// session was actually removed.
    pub fn destroy(&self, cookie_header: &str) -> bool {
        let Some(value) = self.extract_cookie_value(cookie_header) else {
            return false;
        };
        let Some(token) = self.verify_cookie_value(&value) else {
            return false;
        };
        self.sessions.remove(&token).is_some()
    }

    /// Build the Set-Cookie header value carrying a session.
    pub fn session_cookie(&self, value: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}",
            self.config.cookie_name,
            value,
            self.config.ttl_hours * 3600
        );

        if self.config.cookie_http_only {
            cookie.push_str("; HttpOnly");
        }

        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.config.cookie_same_site));

        cookie
    }

    /// Build the Set-Cookie header value that clears the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite={}",
            self.config.cookie_name, self.config.cookie_same_site
        )
    }

    fn extract_cookie_value(&self, cookie_header: &str) -> Option<String> {
        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if let Some(value) = cookie.strip_prefix(&format!("{}=", self.config.cookie_name)) {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }

    /// Split a cookie value into token and signature, check the signature,
    /// and hand back the token.
    fn verify_cookie_value(&self, value: &str) -> Option<String> {
        let (token, signature) = value.rsplit_once('.')?;
        if !constant_time_eq(&self.sign(token), signature) {
            return None;
        }
        Some(token.to_string())
    }

    fn sign(&self, token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Compare two hex signatures without short-circuiting on the first
/// mismatching byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SessionConfig {
        SessionConfig {
            secret: "test-secret-for-session-signing".to_string(),
            ttl_hours: 24,
            cookie_name: "test_session".to_string(),
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: "Strict".to_string(),
        }
    }

    fn cookie_header(store: &SessionStore, value: &str) -> String {
        format!("{}={}", store.config.cookie_name, value)
    }

    #[test]
    fn test_create_and_authenticate() {
        let store = SessionStore::new(test_config());
        let value = store.create("admin");

        let session = store.authenticate(&cookie_header(&store, &value)).unwrap();
        assert_eq!(session.user, "admin");
        assert!(session.expires_at > session.created_at);
    }

    #[test]
    fn test_tampered_cookie_rejected() {
        let store = SessionStore::new(test_config());
        let value = store.create("admin");

        let mut tampered = value.clone();
        tampered.pop();
        tampered.push('0');
        assert!(store.authenticate(&cookie_header(&store, &tampered)).is_none());

        // A token signed under a different secret is also rejected.
        let other = SessionStore::new(SessionConfig {
            secret: "different-secret".to_string(),
            ..test_config()
        });
        let foreign = other.create("admin");
        assert!(store.authenticate(&cookie_header(&store, &foreign)).is_none());
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let store = SessionStore::new(test_config());
        assert!(store.authenticate(&cookie_header(&store, "no-signature-here")).is_none());
    }

    #[test]
    fn test_destroy_removes_session() {
        let store = SessionStore::new(test_config());
        let value = store.create("admin");
        let header = cookie_header(&store, &value);

        assert!(store.destroy(&header));
        assert!(store.authenticate(&header).is_none());
        assert!(!store.destroy(&header));
    }

    #[test]
    fn test_expired_session_evicted() {
        let store = SessionStore::new(SessionConfig {
            ttl_hours: 0,
            ..test_config()
        });
        let value = store.create("admin");
        assert!(store.authenticate(&cookie_header(&store, &value)).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let store = SessionStore::new(test_config());
        let cookie = store.session_cookie("tok.sig");

        assert!(cookie.contains("test_session=tok.sig"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_secure() {
        let store = SessionStore::new(SessionConfig {
            cookie_secure: true,
            ..test_config()
        });
        assert!(store.session_cookie("tok.sig").contains("Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let store = SessionStore::new(test_config());
        let cookie = store.clear_cookie();

        assert!(cookie.contains("test_session="));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_extract_cookie_value() {
        let store = SessionStore::new(test_config());

        assert_eq!(
            store.extract_cookie_value("test_session=abc123; other=value"),
            Some("abc123".to_string())
        );
        assert_eq!(
            store.extract_cookie_value("other=value; test_session=xyz789"),
            Some("xyz789".to_string())
        );
        assert_eq!(store.extract_cookie_value("other=value"), None);
        assert_eq!(store.extract_cookie_value("test_session="), None);
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl_hours, 24);
        assert_eq!(config.cookie_name, "appdock_session");
        assert!(config.cookie_http_only);
        assert_eq!(config.cookie_same_site, "Strict");
        assert!(!config.secret.is_empty());
    }
}
