//! Authorization code exchange against the provider's `/oauth2/token` endpoint.

use super::{IdpError, TokenSet, http_client};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;

const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

pub struct TokenExchanger {
    client: Client,
    endpoint: Url,
    client_id: String,
    client_secret: Option<SecretString>,
    redirect_uri: String,
}

impl TokenExchanger {
    /// Build an exchanger for the given token endpoint.
    ///
    /// `redirect_uri` must be the exact string sent in the authorize request;
    /// the provider compares both byte for byte.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: Url,
        client_id: String,
        client_secret: Option<SecretString>,
        redirect_uri: String,
    ) -> Result<Self, IdpError> {
        Ok(Self {
            client: http_client()?,
            endpoint,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Exchange an authorization code for tokens. Exactly one request is sent;
    /// failures are not retried.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status, or an
    /// undecodable response body.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn exchange(&self, code: &str) -> Result<TokenSet, IdpError> {
        let form = [
            ("grant_type", GRANT_TYPE_AUTHORIZATION_CODE),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let mut request = self.client.post(self.endpoint.clone()).form(&form);

        // Confidential clients authenticate with HTTP Basic.
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret.expose_secret()));
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (kind, message) = parse_oauth_error(&body);
            return Err(IdpError::Service {
                status: status.as_u16(),
                kind,
                message,
            });
        }

        let tokens = response.json::<TokenSet>().await?;

        debug!(token_type = ?tokens.token_type, "authorization code exchanged");

        Ok(tokens)
    }
}

impl std::fmt::Debug for TokenExchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchanger")
            .field("endpoint", &self.endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// RFC 6749 §5.2 error body: `{"error": "...", "error_description": "..."}`.
fn parse_oauth_error(body: &str) -> (String, String) {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let kind = value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("token_endpoint_error")
        .to_string();
    let message = value
        .get("error_description")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    (kind, message)
}
