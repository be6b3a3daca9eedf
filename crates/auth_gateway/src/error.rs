use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised while loading [`crate::config::GatewayConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the authorization-code-for-token exchange.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Token endpoint request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Identity provider rejected the code: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors surfaced by the `/auth/callback` endpoint.
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("Authorization code missing")]
    MissingCode,

    #[error("Missing session ID cookie")]
    MissingSessionCookie,

    #[error("Unknown or expired session")]
    UnknownSession,

    #[error("Token exchange failed")]
    Exchange(#[from] ExchangeError),

    #[error("Session store unavailable")]
    Store(#[from] SessionStoreError),
}

impl CallbackError {
    pub fn status(&self) -> StatusCode {
        match self {
            CallbackError::MissingCode
            | CallbackError::MissingSessionCookie
            | CallbackError::UnknownSession => StatusCode::BAD_REQUEST,
            CallbackError::Exchange(_) => StatusCode::BAD_GATEWAY,
            CallbackError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        // Display is the client-facing text; inner causes stay in the logs.
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        assert_eq!(CallbackError::MissingCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CallbackError::MissingSessionCookie.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(CallbackError::UnknownSession.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_exchange_error_hides_idp_body() {
        let err = CallbackError::from(ExchangeError::Rejected {
            status: 400,
            body: "{\"error\":\"invalid_grant\"}".to_string(),
        });

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Token exchange failed");
    }
}
