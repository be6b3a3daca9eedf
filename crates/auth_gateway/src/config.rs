//! Gateway configuration loaded from environment variables.

use std::time::Duration;

use crate::auth::cleanup::DEFAULT_CLEANUP_INTERVAL_SECS;
use crate::auth::idp::{IdpConfig, DEFAULT_EXCHANGE_TIMEOUT};
use crate::error::ConfigError;

pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";

/// Everything the gateway reads at startup
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub idp: IdpConfig,
    /// Origin allowed by the CORS response headers
    pub frontend_origin: String,
    /// Mark issued `SESSION_ID` cookies `Secure`
    pub cookie_secure: bool,
    /// `None` keeps sessions for the life of the process
    pub session_ttl: Option<Duration>,
    pub cleanup_interval: Duration,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// Endpoints come from `IDP_AUTH_URL`/`IDP_TOKEN_URL`, or are derived
    /// from `KEYCLOAK_URL` + `KEYCLOAK_REALM` when those are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let client_id = required("IDP_CLIENT_ID")?;
        let client_secret = var("IDP_CLIENT_SECRET");
        let redirect_uri = required("IDP_REDIRECT_URI")?;

        let mut idp = match (var("KEYCLOAK_URL"), var("KEYCLOAK_REALM")) {
            (Some(base_url), Some(realm)) => {
                IdpConfig::keycloak(&base_url, &realm, &client_id, client_secret, &redirect_uri)
            }
            _ => IdpConfig {
                client_id,
                client_secret,
                auth_url: required("IDP_AUTH_URL")?,
                token_url: required("IDP_TOKEN_URL")?,
                redirect_uri,
                scopes: vec!["openid".to_string()],
                timeout: DEFAULT_EXCHANGE_TIMEOUT,
            },
        };

        // Explicit endpoints win over the derived Keycloak ones
        if let Some(auth_url) = var("IDP_AUTH_URL") {
            idp.auth_url = auth_url;
        }
        if let Some(token_url) = var("IDP_TOKEN_URL") {
            idp.token_url = token_url;
        }
        if let Some(scopes) = var("IDP_SCOPES") {
            idp.scopes = scopes.split_whitespace().map(str::to_string).collect();
        }
        if let Some(secs) = var("IDP_TIMEOUT_SECS") {
            idp.timeout = Duration::from_secs(parse_secs("IDP_TIMEOUT_SECS", &secs)?);
        }

        let cookie_secure = match var("SESSION_COOKIE_SECURE") {
            Some(value) => parse_bool("SESSION_COOKIE_SECURE", &value)?,
            None => false,
        };

        let session_ttl = var("SESSION_TTL_SECS")
            .map(|secs| parse_secs("SESSION_TTL_SECS", &secs).map(Duration::from_secs))
            .transpose()?;

        let cleanup_interval = match var("SESSION_CLEANUP_INTERVAL_SECS") {
            Some(secs) => Duration::from_secs(parse_secs("SESSION_CLEANUP_INTERVAL_SECS", &secs)?),
            None => Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        };

        Ok(Self {
            idp,
            frontend_origin: var("FRONTEND_ORIGIN")
                .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_string()),
            cookie_secure,
            session_ttl,
            cleanup_interval,
        })
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| env.get(name).cloned())
    }

    const BASE: [(&str, &str); 2] = [
        ("IDP_CLIENT_ID", "todo-backend"),
        ("IDP_REDIRECT_URI", "http://localhost:8080/auth/callback"),
    ];

    #[test]
    fn test_keycloak_config_with_defaults() {
        let mut vars = BASE.to_vec();
        vars.push(("KEYCLOAK_URL", "http://localhost:8180"));
        vars.push(("KEYCLOAK_REALM", "todo"));

        let config = load(&vars).unwrap();

        assert_eq!(
            config.idp.auth_url,
            "http://localhost:8180/realms/todo/protocol/openid-connect/auth"
        );
        assert_eq!(config.idp.client_secret, None);
        assert_eq!(config.idp.timeout, DEFAULT_EXCHANGE_TIMEOUT);
        assert_eq!(config.frontend_origin, DEFAULT_FRONTEND_ORIGIN);
        assert!(!config.cookie_secure);
        assert!(config.session_ttl.is_none());
        assert_eq!(
            config.cleanup_interval,
            Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS)
        );
    }

    #[test]
    fn test_explicit_endpoints_and_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("IDP_AUTH_URL", "https://idp.example/authorize"),
            ("IDP_TOKEN_URL", "https://idp.example/token"),
            ("IDP_CLIENT_SECRET", "s3cret"),
            ("IDP_SCOPES", "openid  email"),
            ("IDP_TIMEOUT_SECS", "3"),
            ("FRONTEND_ORIGIN", "https://app.example"),
            ("SESSION_COOKIE_SECURE", "true"),
            ("SESSION_TTL_SECS", "3600"),
        ]);

        let config = load(&vars).unwrap();

        assert_eq!(config.idp.auth_url, "https://idp.example/authorize");
        assert_eq!(config.idp.token_url, "https://idp.example/token");
        assert_eq!(config.idp.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.idp.scopes, vec!["openid", "email"]);
        assert_eq!(config.idp.timeout, Duration::from_secs(3));
        assert_eq!(config.frontend_origin, "https://app.example");
        assert!(config.cookie_secure);
        assert_eq!(config.session_ttl, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_missing_client_id() {
        let result = load(&[("IDP_REDIRECT_URI", "http://localhost:8080/auth/callback")]);
        assert!(matches!(result, Err(ConfigError::Missing("IDP_CLIENT_ID"))));
    }

    #[test]
    fn test_missing_endpoints_without_keycloak() {
        let result = load(&BASE);
        assert!(matches!(result, Err(ConfigError::Missing("IDP_AUTH_URL"))));
    }

    #[test]
    fn test_invalid_numbers_and_flags() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("KEYCLOAK_URL", "http://localhost:8180"),
            ("KEYCLOAK_REALM", "todo"),
            ("SESSION_TTL_SECS", "soon"),
        ]);
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "SESSION_TTL_SECS", .. })
        ));

        vars.pop();
        vars.push(("SESSION_COOKIE_SECURE", "maybe"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "SESSION_COOKIE_SECURE", .. })
        ));
    }
}
