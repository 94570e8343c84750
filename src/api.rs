//! HTTP surface for the app catalog
//!
//! Serves the JSON CRUD API, the login/logout flow, the embedded pages, the
//! health probe relay, and the frontend config endpoint. Every response gets
//! permissive CORS headers; mutating catalog routes and the admin page pass
//! the auth gate first.

use crate::auth::{AdminCredentials, AuthGate, AuthOutcome};
use crate::db::{AppFields, Database};
use crate::error::{json_error, json_response, ApiErrorCode};
use crate::pages;
use crate::probe::HealthProbe;
use crate::session::SessionStore;
use anyhow::Result;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{COOKIE, LOCATION, SET_COOKIE};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Static values handed to the frontend via /api/config.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub company_name: String,
    pub company_icon: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The catalog HTTP server.
///
/// All collaborators are constructed once at startup and injected here; the
/// server itself holds no global state.
pub struct ApiServer {
    db: Arc<Database>,
    sessions: Arc<SessionStore>,
    gate: AuthGate,
    credentials: AdminCredentials,
    probe: HealthProbe,
    site: SiteSettings,
    listener: TcpListener,
    shutdown_rx: watch::Receiver<bool>,
}

impl ApiServer {
    /// Bind the listening socket. Splitting bind from run lets callers (and
    /// tests) learn the bound address before serving starts.
    pub async fn bind(
        addr: SocketAddr,
        db: Arc<Database>,
        sessions: Arc<SessionStore>,
        credentials: AdminCredentials,
        site: SiteSettings,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let gate = AuthGate::new(Arc::clone(&sessions));

        Ok(Self {
            db,
            sessions,
            gate,
            credentials,
            probe: HealthProbe::new(),
            site,
            listener,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!(addr = %self.local_addr()?, "Catalog server listening");

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                if let Err(e) = server.serve_connection(stream, addr).await {
                                    debug!(addr = %addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Catalog server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn serve_connection<S>(self: Arc<Self>, stream: S, _addr: SocketAddr) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| {
            let server = Arc::clone(&self);
            async move { server.handle_request(req).await }
        });

        AutoBuilder::new(TokioExecutor::new())
            .serve_connection(io, service)
            .await
            .map_err(|e| anyhow::anyhow!("Connection error: {}", e))?;

        Ok(())
    }

    async fn handle_request(
        self: Arc<Self>,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();

        debug!(%method, %path, "Request");

        // CORS preflight
        if method == Method::OPTIONS {
            let response = Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(Full::new(Bytes::new()))
                .expect("valid response with StatusCode enum");
            return Ok(apply_cors(response));
        }

        let response = match (method, path.as_str()) {
            // Liveness - no auth required
            (Method::GET, "/health") => Ok(json_response(StatusCode::OK, r#"{"status":"ok"}"#)),

            // Pages
            (Method::GET, "/") => Ok(redirect("/admin")),
            (Method::GET, "/login") => Ok(pages::serve_login()),
            (Method::GET, "/admin") => self.admin_page(&req),

            // Session lifecycle
            (Method::POST, "/login") => self.login(req).await,
            (Method::GET, "/logout") => self.logout(&req),

            // Catalog
            (Method::GET, "/api/apps") => self.list_apps(),
            (Method::POST, "/api/apps") => self.create_app(req).await,
            (Method::PUT, p) if p.starts_with("/api/apps/") => self.update_app(req).await,
            (Method::DELETE, p) if p.starts_with("/api/apps/") => self.delete_app(&req),

            // Health probe relay
            (Method::GET, "/proxy-health") => self.proxy_health(&req).await,

            // Frontend config
            (Method::GET, "/api/config") => self.site_config(),

            _ => Ok(json_error(ApiErrorCode::NotFound, "Not found")),
        };

        let response = response.unwrap_or_else(|e| {
            error!(error = %e, "Request failed");
            json_error(ApiErrorCode::InternalError, format!("Internal error: {}", e))
        });

        Ok(apply_cors(response))
    }

    /// Run the auth gate; Some(response) short-circuits the handler.
    fn guard<B>(&self, req: &Request<B>) -> Option<Response<Full<Bytes>>> {
        match self.gate.check(req) {
            AuthOutcome::Authorized(_) => None,
            AuthOutcome::Denied { wants_json: true } => {
                warn!(path = %req.uri().path(), "Unauthorized request");
                Some(json_error(ApiErrorCode::Unauthorized, "You need to login first"))
            }
            AuthOutcome::Denied { wants_json: false } => Some(redirect("/login")),
        }
    }

    // ==================== Pages ====================

    fn admin_page<B>(&self, req: &Request<B>) -> Result<Response<Full<Bytes>>> {
        if let Some(denied) = self.guard(req) {
            return Ok(denied);
        }
        Ok(pages::serve_admin())
    }

    // ==================== Session lifecycle ====================

    async fn login(
        self: Arc<Self>,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>> {
        let body = req.collect().await?.to_bytes();
        let login: LoginRequest = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                return Ok(json_error(ApiErrorCode::BadRequest, format!("Invalid JSON: {}", e)));
            }
        };

        if !self.credentials.verify(&login.username, &login.password) {
            warn!(user = %login.username, "Failed login attempt");
            return Ok(json_error(ApiErrorCode::Unauthorized, "Invalid username or password"));
        }

        let cookie_value = self.sessions.create(&login.username);
        info!(user = %login.username, "Login successful");

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .header(SET_COOKIE, self.sessions.session_cookie(&cookie_value))
            .body(Full::new(Bytes::from(r#"{"message":"Login successful"}"#)))
            .expect("valid response with StatusCode enum and static headers"))
    }

    fn logout<B>(&self, req: &Request<B>) -> Result<Response<Full<Bytes>>> {
        if let Some(cookie_header) = req.headers().get(COOKIE).and_then(|v| v.to_str().ok()) {
            if self.sessions.destroy(cookie_header) {
                debug!("Session destroyed");
            }
        }

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .header(SET_COOKIE, self.sessions.clear_cookie())
            .body(Full::new(Bytes::from(r#"{"message":"Logged out"}"#)))
            .expect("valid response with StatusCode enum and static headers"))
    }

    // ==================== Catalog ====================

    fn list_apps(&self) -> Result<Response<Full<Bytes>>> {
        let apps = self.db.list_apps()?;
        Ok(json_response(StatusCode::OK, serde_json::to_string(&apps)?))
    }

    async fn create_app(
        self: Arc<Self>,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>> {
        if let Some(denied) = self.guard(&req) {
            return Ok(denied);
        }

        let body = req.collect().await?.to_bytes();
        let fields: AppFields = match serde_json::from_slice(&body) {
            Ok(f) => f,
            Err(e) => {
                return Ok(json_error(ApiErrorCode::BadRequest, format!("Invalid app payload: {}", e)));
            }
        };

        let app = self.db.create_app(&fields)?;
        info!(id = app.id, title = %app.title, "App created");

        Ok(json_response(StatusCode::OK, serde_json::to_string(&app)?))
    }

    async fn update_app(
        self: Arc<Self>,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>> {
        if let Some(denied) = self.guard(&req) {
            return Ok(denied);
        }

        let id = match app_id_from_path(req.uri().path()) {
            Some(id) => id,
            None => return Ok(json_error(ApiErrorCode::BadRequest, "Invalid app id")),
        };

        let body = req.collect().await?.to_bytes();
        let fields: AppFields = match serde_json::from_slice(&body) {
            Ok(f) => f,
            Err(e) => {
                return Ok(json_error(ApiErrorCode::BadRequest, format!("Invalid app payload: {}", e)));
            }
        };

        match self.db.update_app(id, &fields)? {
            Some(app) => {
                info!(id, "App updated");
                Ok(json_response(StatusCode::OK, serde_json::to_string(&app)?))
            }
            None => Ok(json_error(ApiErrorCode::NotFound, format!("App not found: {}", id))),
        }
    }

    fn delete_app<B>(&self, req: &Request<B>) -> Result<Response<Full<Bytes>>> {
        if let Some(denied) = self.guard(req) {
            return Ok(denied);
        }

        let id = match app_id_from_path(req.uri().path()) {
            Some(id) => id,
            None => return Ok(json_error(ApiErrorCode::BadRequest, "Invalid app id")),
        };

        match self.db.delete_app(id)? {
            Some(app) => {
                info!(id, title = %app.title, "App removed");
                let body = serde_json::json!({
                    "message": "App removed",
                    "removedApp": app,
                });
                Ok(json_response(StatusCode::OK, body.to_string()))
            }
            None => Ok(json_error(ApiErrorCode::NotFound, format!("App not found: {}", id))),
        }
    }

    // ==================== Health probe relay ====================

    async fn proxy_health<B>(&self, req: &Request<B>) -> Result<Response<Full<Bytes>>> {
        let target = req
            .uri()
            .query()
            .and_then(|q| query_param(q, "url"))
            .filter(|t| !t.is_empty());

        let target = match target {
            Some(t) => t,
            None => return Ok(json_error(ApiErrorCode::BadRequest, "Missing url query parameter")),
        };

        match self.probe.relay_status(&target).await {
            Ok(code) => {
                // Relay only the status; the target's body never leaves here.
                let status = StatusCode::from_u16(code)
                    .expect("upstream status code is within the valid range");
                Ok(Response::builder()
                    .status(status)
                    .body(Full::new(Bytes::new()))
                    .expect("valid response with StatusCode enum"))
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Health probe failed");
                Ok(json_error(
                    ApiErrorCode::UpstreamFailure,
                    format!("Failed to reach target: {}", e),
                ))
            }
        }
    }

    // ==================== Frontend config ====================

    fn site_config(&self) -> Result<Response<Full<Bytes>>> {
        let body = serde_json::json!({
            "companyName": self.site.company_name,
            "companyIcon": self.site.company_icon,
        });
        Ok(json_response(StatusCode::OK, body.to_string()))
    }
}

// ==================== Helper Functions ====================

fn redirect(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, location)
        .body(Full::new(Bytes::new()))
        .expect("valid response with StatusCode enum and static header")
}

/// Apply permissive CORS headers; the catalog API is consumed cross-origin.
fn apply_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        hyper::header::HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        hyper::header::HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        hyper::header::HeaderValue::from_static("Content-Type, Accept"),
    );
    response
}

/// Extract the numeric id from an /api/apps/:id path.
fn app_id_from_path(path: &str) -> Option<i64> {
    path.strip_prefix("/api/apps/")?.parse().ok()
}

/// Find a query parameter by name, percent-decoded.
fn query_param(query: &str, name: &str) -> Option<String> {
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            return urlencoding::decode(value).ok().map(|v| v.into_owned());
        }
    }
    None
}
