//! Auth Gateway Service
//!
//! Cookie-based session broker in front of a web backend. Unauthenticated
//! requests are redirected to an external OAuth2/OIDC identity provider;
//! the provider's callback is reconciled into an authenticated session.
//!
//! # Features
//! - Session gate middleware with `SESSION_ID` cookie issuance
//! - Authorization-code-for-token exchange (Keycloak or any OIDC provider)
//! - Concurrent in-memory session store with optional TTL eviction
//! - CORS permission headers on every response

pub mod auth;
pub mod config;
pub mod error;
pub mod server;

pub use auth::{
    IdentityProviderClient, IdpConfig, InMemorySessionStore, OidcClient, Session, SessionState,
    SessionStore,
};
pub use config::GatewayConfig;
pub use server::{
    build_router, session_routes, start_server, AppState, AuthenticatedSession, GatewaySettings,
};
