//! Identity provider callback: completes a pending session.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{cookies, AppState};
use crate::error::CallbackError;

/// Callback query parameters
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth/callback
///
/// Exchanges the code, stores the token under the cookie's session id, and
/// sends the browser back to the resource it was originally after.
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, CallbackError> {
    // An unparseable query (e.g. a repeated `code`) carries no usable code
    let Query(params) = query.map_err(|e| {
        debug!(error = %e, "Unparseable callback query");
        CallbackError::MissingCode
    })?;

    if let Some(error) = &params.error {
        debug!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or("none"),
            "Identity provider returned an error"
        );
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    let session_id = cookies::get_session_id(&jar).ok_or(CallbackError::MissingSessionCookie)?;

    let session = state
        .sessions
        .get(&session_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Session lookup failed");
            CallbackError::from(e)
        })?
        .ok_or_else(|| {
            debug!("Callback for unknown session");
            CallbackError::UnknownSession
        })?;

    // Captured before the write below clears it
    let original_url = session.original_url;

    let token = state
        .idp
        .exchange_code_for_token(&code)
        .await
        .map_err(|e| {
            warn!(error = %e, "Token exchange failed");
            CallbackError::from(e)
        })?;

    state
        .sessions
        .put(&session_id, &token, "")
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store authenticated session");
            CallbackError::from(e)
        })?;

    info!(redirect = !original_url.is_empty(), "Session authenticated");

    if original_url.is_empty() {
        Ok((StatusCode::OK, "Authenticated").into_response())
    } else {
        Ok((StatusCode::FOUND, [(LOCATION, original_url)]).into_response())
    }
}
