use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::ExchangeError;

/// Default bound on the token endpoint round trip
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct IdpConfig {
    pub client_id: String,
    pub client_secret: Option<String>, // Confidential clients only
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub timeout: Duration,
}

impl IdpConfig {
    /// Keycloak realm configuration
    ///
    /// Endpoints follow the realm layout:
    /// `{base_url}/realms/{realm}/protocol/openid-connect/{auth,token}`
    pub fn keycloak(
        base_url: &str,
        realm: &str,
        client_id: &str,
        client_secret: Option<String>,
        redirect_uri: &str,
    ) -> Self {
        let realm_base = format!(
            "{}/realms/{}/protocol/openid-connect",
            base_url.trim_end_matches('/'),
            realm
        );

        Self {
            client_id: client_id.to_string(),
            client_secret,
            auth_url: format!("{}/auth", realm_base),
            token_url: format!("{}/token", realm_base),
            redirect_uri: redirect_uri.to_string(),
            scopes: vec!["openid".to_string()],
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// The two calls the gateway makes against the identity provider.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Browser redirect target for the IdP login page.
    fn authorization_url(&self) -> &str;

    /// Redeem a single-use authorization code for a bearer token.
    async fn exchange_code_for_token(&self, code: &str) -> Result<String, ExchangeError>;
}

/// OAuth2 authorization-code client over reqwest
pub struct OidcClient {
    config: IdpConfig,
    authorization_url: String,
    http_client: reqwest::Client,
}

impl OidcClient {
    /// Create a new client. The authorization URL is fixed at construction.
    pub fn new(config: IdpConfig) -> Result<Self, ExchangeError> {
        let mut url = url::Url::parse(&config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("scope", &config.scopes.join(" "));

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            authorization_url: url.to_string(),
            config,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProviderClient for OidcClient {
    fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    async fn exchange_code_for_token(&self, code: &str) -> Result<String, ExchangeError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
        }

        let mut form_params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form_params.push(("client_secret", secret));
        }

        debug!(
            token_url = %self.config.token_url,
            client_id = %self.config.client_id,
            "Exchanging authorization code"
        );

        let response = self
            .http_client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&form_params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected { status, body });
        }

        let response_text = response.text().await?;
        let token_response: TokenResponse = serde_json::from_str(&response_text)
            .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))?;

        match token_response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ExchangeError::MalformedResponse(
                "access_token missing from token response".to_string(),
            )),
        }
    }
}
