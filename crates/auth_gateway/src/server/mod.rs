//! Auth Gateway HTTP Server
//!
//! Wraps a downstream router with the session gate and mounts the IdP
//! callback endpoint next to it.

pub mod callback;
pub mod cookies;
pub mod gateway;

use axum::{
    extract::Extension,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue,
    },
    middleware,
    routing::get,
    Json, Router as AxumRouter,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

use crate::auth::{
    spawn_cleanup_task, IdentityProviderClient, InMemorySessionStore, OidcClient, SessionState,
    SessionStore,
};
use crate::config::GatewayConfig;
pub use gateway::AuthenticatedSession;

pub const CALLBACK_PATH: &str = "/auth/callback";

const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const CORS_ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Authorization";

/// Request-independent gateway settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Path owned by the callback handler; never gated
    pub callback_path: String,
    pub cookie_secure: bool,
    pub frontend_origin: HeaderValue,
}

impl GatewaySettings {
    pub fn new(frontend_origin: &str, cookie_secure: bool) -> anyhow::Result<Self> {
        let frontend_origin = HeaderValue::from_str(frontend_origin)
            .map_err(|e| anyhow::anyhow!("Invalid frontend origin '{}': {}", frontend_origin, e))?;

        Ok(Self {
            callback_path: CALLBACK_PATH.to_string(),
            cookie_secure,
            frontend_origin,
        })
    }
}

/// Application state shared by the gate and the callback handler
#[derive(Clone)]
pub struct AppState {
    /// Authoritative session records, keyed by the `SESSION_ID` cookie
    pub sessions: Arc<dyn SessionStore>,
    pub idp: Arc<dyn IdentityProviderClient>,
    pub settings: GatewaySettings,
}

/// Wrap `downstream` with the session gate and mount the callback route.
///
/// CORS permission headers are attached to every response, including
/// redirects and callback errors.
pub fn build_router(state: Arc<AppState>, downstream: AxumRouter) -> AxumRouter {
    let frontend_origin = state.settings.frontend_origin.clone();

    let callback_routes = AxumRouter::new()
        .route(&state.settings.callback_path, get(callback::auth_callback))
        .with_state(state.clone());

    downstream
        .merge(callback_routes)
        .layer(middleware::from_fn_with_state(state, gateway::session_gate))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            frontend_origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub state: SessionState,
}

/// GET /auth/session - only reachable once the gate has let the request through
async fn current_session(Extension(session): Extension<AuthenticatedSession>) -> Json<SessionInfo> {
    Json(SessionInfo {
        session_id: session.session_id,
        state: SessionState::Authenticated,
    })
}

/// Downstream routes served by the standalone binary
pub fn session_routes() -> AxumRouter {
    AxumRouter::new().route("/auth/session", get(current_session))
}

/// Start the Auth Gateway HTTP server
///
/// Builds the in-memory session store and the OIDC client from `config`,
/// spawns TTL eviction when a TTL is configured, and serves:
/// - GET /auth/callback - IdP redirect target (not gated)
/// - GET /auth/session - current session (gated)
///
/// # Errors
/// Returns error if the IdP client cannot be built or server binding fails
pub async fn start_server(host: &str, port: u16, config: GatewayConfig) -> anyhow::Result<()> {
    let sessions: Arc<dyn SessionStore> = match config.session_ttl {
        Some(ttl) => {
            let ttl = chrono::Duration::from_std(ttl)
                .map_err(|e| anyhow::anyhow!("Session TTL out of range: {}", e))?;
            Arc::new(InMemorySessionStore::with_ttl(ttl))
        }
        None => Arc::new(InMemorySessionStore::new()),
    };

    if config.session_ttl.is_some() {
        spawn_cleanup_task(sessions.clone(), config.cleanup_interval);
        info!(interval_secs = config.cleanup_interval.as_secs(), "Session cleanup task started");
    }

    let idp = OidcClient::new(config.idp.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize identity provider client: {}", e))?;
    info!(
        auth_url = %config.idp.auth_url,
        client_id = %config.idp.client_id,
        "Identity provider configured"
    );

    let state = Arc::new(AppState {
        sessions,
        idp: Arc::new(idp),
        settings: GatewaySettings::new(&config.frontend_origin, config.cookie_secure)?,
    });

    let app = build_router(state, session_routes());

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    info!("[INFO] Auth Gateway listening on {}", addr);
    info!("[INFO] Available endpoints:");
    info!("  GET    {}             - Identity provider callback", CALLBACK_PATH);
    info!("  GET    /auth/session             - Current session (requires login)");

    axum::serve(listener, app).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::{
        body::Body,
        http::{header::COOKIE, Request, StatusCode},
    };

    #[test]
    fn test_settings_reject_invalid_origin() {
        assert!(GatewaySettings::new("http://localhost:3000\n", false).is_err());
    }

    #[tokio::test]
    async fn test_session_endpoint_for_authenticated_session() {
        let store = Arc::new(InMemorySessionStore::new());
        store.put("S1", "T1", "").await.unwrap();
        let app = test_app(test_state(store, Arc::new(FakeIdp::default())));

        let request = Request::builder()
            .uri("/auth/session")
            .header(COOKIE, "SESSION_ID=S1")
            .body(Body::empty())
            .unwrap();
        let response = send(app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["session_id"], "S1");
        assert_eq!(body["state"], "authenticated");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_unknown_path_is_gated_and_has_cors_headers() {
        let app = test_app(test_state(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(FakeIdp::default()),
        ));

        let request = Request::builder()
            .uri("/does-not-exist")
            .body(Body::empty())
            .unwrap();
        let response = send(app, request).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_cors_headers(&response);
    }
}
