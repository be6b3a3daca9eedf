//! Session gate in front of every route except the IdP callback.
//!
//! Requests carrying a `SESSION_ID` cookie whose record holds a token pass
//! through. Everything else is recorded as a pending session (keyed by the
//! cookie, or by a freshly issued one) and sent to the identity provider
//! with a `302 Found`.

use axum::{
    extract::{Request, State},
    http::{
        header::{LOCATION, REFERER},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, error};

use super::{cookies, AppState};
use crate::auth::SessionId;
use crate::error::SessionStoreError;

/// Inserted into request extensions for requests the gate lets through
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_id: String,
}

pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == state.settings.callback_path {
        return next.run(request).await;
    }

    let cookie_session = cookies::get_session_id(&jar);

    if let Some(session_id) = &cookie_session {
        match state.sessions.get(session_id).await {
            Ok(Some(session)) if session.is_authenticated() => {
                request.extensions_mut().insert(AuthenticatedSession {
                    session_id: session.session_id,
                });
                return next.run(request).await;
            }
            Ok(_) => {}
            Err(e) => return store_unavailable(e),
        }
    }

    let original_url = request
        .headers()
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (session_id, issue_cookie) = match cookie_session {
        Some(id) => (id, false),
        None => (SessionId::generate(), true),
    };

    match state.sessions.put_pending(&session_id, &original_url).await {
        Ok(true) => {}
        Ok(false) => {
            // A concurrent callback finished between the read and the write
            request
                .extensions_mut()
                .insert(AuthenticatedSession { session_id });
            return next.run(request).await;
        }
        Err(e) => return store_unavailable(e),
    }

    debug!(
        path = %request.uri().path(),
        new_session = issue_cookie,
        "Redirecting unauthenticated request to identity provider"
    );

    let redirect = (
        StatusCode::FOUND,
        [(LOCATION, state.idp.authorization_url().to_string())],
    );

    if issue_cookie {
        let jar = jar.add(cookies::session_cookie(&session_id, state.settings.cookie_secure));
        (jar, redirect).into_response()
    } else {
        redirect.into_response()
    }
}

fn store_unavailable(e: SessionStoreError) -> Response {
    error!(error = %e, "Session lookup failed");
    (StatusCode::SERVICE_UNAVAILABLE, "Session store unavailable").into_response()
}
