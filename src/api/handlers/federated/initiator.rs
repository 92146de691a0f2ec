//! Login Initiator: build the authorize request and send the browser away.

use super::{
    config::{FederationConfig, Provider},
    nonce::generate_nonce,
    state::FederationState,
};
use crate::api::handlers::{ErrorBody, cookies::OAUTH_STATE_COOKIE, error_response};
use anyhow::Result;
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, info, instrument};
use url::Url;

pub const RESPONSE_TYPE_CODE: &str = "code";

/// One authorization request, built fresh per login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub identity_provider: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub response_type: &'static str,
    pub state: String,
    pub directives: Vec<(String, String)>,
}

impl AuthorizationRequest {
    /// `None` when the provider has no configured policy.
    #[must_use]
    pub fn new(config: &FederationConfig, provider: Provider, state: String) -> Option<Self> {
        let settings = config.provider(provider)?;
        Some(Self {
            identity_provider: settings.identity_provider().to_string(),
            client_id: config.client_id().to_string(),
            redirect_uri: config.redirect_uri().to_string(),
            scopes: config.scopes().to_vec(),
            response_type: RESPONSE_TYPE_CODE,
            state,
            directives: settings.directives().to_vec(),
        })
    }

    /// Render onto the authorize endpoint. Values are form-urlencoded.
    #[must_use]
    pub fn to_url(&self, authorize_endpoint: &Url) -> Url {
        let mut url = authorize_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("identity_provider", &self.identity_provider)
                .append_pair("response_type", self.response_type)
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("state", &self.state);
            for (key, value) in &self.directives {
                query.append_pair(key, value);
            }
        }
        url
    }
}

/// Build the authorize URL for `provider` with a fresh nonce.
///
/// Returns the URL together with the nonce that must be stored.
pub(crate) fn begin(config: &FederationConfig, provider: Provider) -> Result<Option<(Url, String)>> {
    let nonce = generate_nonce()?;
    let Some(request) = AuthorizationRequest::new(config, provider, nonce.clone()) else {
        return Ok(None);
    };
    let url = request.to_url(&config.authorize_endpoint()?);
    Ok(Some((url, nonce)))
}

#[utoipa::path(
    get,
    path = "/sign-in/{provider}",
    params(
        ("provider" = String, Path, description = "Identity provider: google or microsoft")
    ),
    responses(
        (status = 303, description = "Redirect to the identity provider; sets the anti-forgery nonce cookie"),
        (status = 404, description = "Unknown identity provider", body = ErrorBody),
        (status = 500, description = "Nonce or authorize URL could not be built", body = ErrorBody)
    ),
    tag = "federated"
)]
#[instrument(skip(federation))]
pub async fn federated_sign_in(
    Path(provider): Path<String>,
    federation: Extension<Arc<FederationState>>,
) -> Response {
    let Some(provider) = Provider::from_slug(&provider) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "unknown_provider",
            "Unknown identity provider",
        );
    };

    let (url, nonce) = match begin(federation.config(), provider) {
        Ok(Some(begun)) => begun,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "unknown_provider",
                "Identity provider is not configured",
            );
        }
        Err(err) => {
            error!("Failed to build authorization request: {err:#}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Could not start sign-in",
            );
        }
    };

    // Overwrites any pending nonce: only the latest attempt can complete.
    let cookie = match federation.cookies().session(OAUTH_STATE_COOKIE, &nonce) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build nonce cookie: {err}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Could not start sign-in",
            );
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    info!(provider = provider.slug(), "redirecting to identity provider");

    (headers, Redirect::to(url.as_str())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::federated::config::ProviderSettings;

    fn config() -> Result<FederationConfig> {
        FederationConfig::new(
            "tenant.auth.us-east-1.amazoncognito.com",
            "client-123".to_string(),
            "https://app.example.com/callback".to_string(),
        )
    }

    fn query(url: &Url, key: &str) -> Vec<String> {
        url.query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    #[test]
    fn authorize_url_carries_oauth_parameters() -> Result<()> {
        let config = config()?;
        let (url, nonce) = begin(&config, Provider::Google)?
            .ok_or_else(|| anyhow::anyhow!("google should be configured"))?;

        assert_eq!(
            format!("{}://{}{}", url.scheme(), url.host_str().unwrap_or(""), url.path()),
            "https://tenant.auth.us-east-1.amazoncognito.com/oauth2/authorize"
        );
        assert_eq!(query(&url, "identity_provider"), ["Google"]);
        assert_eq!(query(&url, "response_type"), ["code"]);
        assert_eq!(query(&url, "client_id"), ["client-123"]);
        assert_eq!(
            query(&url, "redirect_uri"),
            ["https://app.example.com/callback"]
        );
        assert_eq!(query(&url, "scope"), ["openid email profile"]);
        assert_eq!(query(&url, "state"), [nonce]);
        assert!(query(&url, "prompt").is_empty());
        Ok(())
    }

    #[test]
    fn microsoft_forces_account_selection() -> Result<()> {
        let config = config()?;
        let (url, _) = begin(&config, Provider::Microsoft)?
            .ok_or_else(|| anyhow::anyhow!("microsoft should be configured"))?;
        assert_eq!(query(&url, "identity_provider"), ["Microsoft"]);
        assert_eq!(query(&url, "prompt"), ["select_account"]);
        Ok(())
    }

    #[test]
    fn every_provider_gets_exactly_one_state() -> Result<()> {
        let config = config()?;
        for provider in Provider::ALL {
            let (url, nonce) = begin(&config, provider)?
                .ok_or_else(|| anyhow::anyhow!("{provider:?} should be configured"))?;
            assert_eq!(query(&url, "state"), [nonce]);
        }
        Ok(())
    }

    #[test]
    fn redirect_uri_is_percent_encoded_in_raw_query() -> Result<()> {
        let config = config()?;
        let (url, _) = begin(&config, Provider::Google)?
            .ok_or_else(|| anyhow::anyhow!("google should be configured"))?;
        let raw = url.query().unwrap_or_default();
        assert!(raw.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback"));
        assert!(raw.contains("scope=openid+email+profile"));
        Ok(())
    }

    #[test]
    fn custom_directives_are_appended() -> Result<()> {
        let config = config()?.with_provider(
            Provider::Google,
            ProviderSettings::new("Google").with_directive("login_hint", "a@b.c"),
        );
        let request = AuthorizationRequest::new(&config, Provider::Google, "n".to_string())
            .ok_or_else(|| anyhow::anyhow!("google should be configured"))?;
        let url = request.to_url(&config.authorize_endpoint()?);
        assert_eq!(query(&url, "login_hint"), ["a@b.c"]);
        Ok(())
    }
}
