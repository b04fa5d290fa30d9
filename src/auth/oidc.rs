use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::callback::CallbackServer;
use super::pkce::{PkcePair, CHALLENGE_METHOD};
use super::session::User;
use super::AuthError;
use crate::config::OidcSettings;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// The parts of the discovery document the login flow needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OidcClient {
    http: Client,
    settings: OidcSettings,
}

impl OidcClient {
    pub fn new(settings: OidcSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    pub async fn discover(&self) -> Result<ProviderMetadata, AuthError> {
        let url = format!(
            "{}{}",
            self.settings.authority.as_str().trim_end_matches('/'),
            DISCOVERY_PATH
        );
        debug!(%url, "fetching OIDC discovery document");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::Discovery {
                url,
                status: response.status(),
            });
        }

        Ok(response.json().await?)
    }

    pub fn authorization_url(&self, metadata: &ProviderMetadata, pkce: &PkcePair) -> String {
        let params = [
            ("response_type", "code".to_string()),
            ("client_id", self.settings.client_id.clone()),
            ("redirect_uri", self.settings.redirect_uri.to_string()),
            ("scope", self.settings.scope_string()),
            ("state", pkce.state.clone()),
            ("code_challenge", pkce.challenge.clone()),
            ("code_challenge_method", CHALLENGE_METHOD.to_string()),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if metadata.authorization_endpoint.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{}{}", metadata.authorization_endpoint, separator, query)
    }

    pub async fn exchange_code(
        &self,
        metadata: &ProviderMetadata,
        code: &str,
        pkce: &PkcePair,
    ) -> Result<User, AuthError> {
        let redirect_uri = self.settings.redirect_uri.to_string();
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.settings.client_id.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
        ];

        let response = self
            .http
            .post(&metadata.token_endpoint)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(desc),
                }) => format!("{}: {}", error, desc),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(AuthError::TokenExchange(message));
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(User::new(tokens.access_token, tokens.id_token, tokens.expires_in))
    }

    /// Discover the provider, start the loopback listener and build the
    /// authorization URL. The returned login waits for the browser.
    pub async fn begin_signin(&self) -> Result<PendingSignin, AuthError> {
        let metadata = self.discover().await?;
        let pkce = PkcePair::generate();
        let server = CallbackServer::start(&self.settings.redirect_uri, pkce.state.clone()).await?;
        let authorization_url = self.authorization_url(&metadata, &pkce);

        Ok(PendingSignin {
            client: self.clone(),
            metadata,
            pkce,
            server,
            authorization_url,
        })
    }
}

/// A login whose authorization URL has been built but not yet visited.
pub struct PendingSignin {
    client: OidcClient,
    metadata: ProviderMetadata,
    pkce: PkcePair,
    server: CallbackServer,
    authorization_url: String,
}

impl PendingSignin {
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    pub fn callback_server(&self) -> &CallbackServer {
        &self.server
    }

    pub async fn finish(self, timeout: Duration) -> Result<User, AuthError> {
        let PendingSignin {
            client,
            metadata,
            pkce,
            mut server,
            ..
        } = self;

        let code = server.wait_for_code(timeout).await;
        server.shutdown().await;
        let user = client.exchange_code(&metadata, &code?, &pkce).await?;
        info!(user = user.display_name().unwrap_or("unknown"), "signed in");
        Ok(user)
    }
}
