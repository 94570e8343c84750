//! Admin credential check and the request-level auth gate
//!
//! A single fixed credential pair guards every mutating route and the admin
//! page. The gate resolves the request's session cookie and tells the
//! routing layer whether to proceed, answer 401 JSON, or redirect a browser
//! to the login page.

use crate::session::{Session, SessionStore};
use hyper::header::{ACCEPT, COOKIE};
use hyper::Request;
use std::sync::Arc;

/// The configured admin login pair. Comparison is plain equality.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Outcome of gating a request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// The session is authenticated; the request proceeds unchanged.
    Authorized(Session),
    /// No authenticated session. `wants_json` selects between a 401 JSON
    /// body and a redirect to the login page.
    Denied { wants_json: bool },
}

/// Guard consulted by guarded routes before their handler runs.
pub struct AuthGate {
    sessions: Arc<SessionStore>,
}

impl AuthGate {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    pub fn check<B>(&self, req: &Request<B>) -> AuthOutcome {
        if let Some(session) = self.session_for(req) {
            return AuthOutcome::Authorized(session);
        }

        let wants_json = req
            .headers()
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(accepts_json)
            .unwrap_or(false);

        AuthOutcome::Denied { wants_json }
    }

    /// Resolve the request's session without gating.
    pub fn session_for<B>(&self, req: &Request<B>) -> Option<Session> {
        let cookie_header = req.headers().get(COOKIE)?.to_str().ok()?;
        self.sessions.authenticate(cookie_header)
    }
}

/// Whether an Accept header admits a JSON response.
pub fn accepts_json(accept: &str) -> bool {
    accept
        .split(',')
        .any(|part| {
            let media = part.split(';').next().unwrap_or("").trim();
            media.eq_ignore_ascii_case("application/json")
        })
}
