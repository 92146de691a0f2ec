//! Immutable federation configuration shared by the initiator and the callback.

use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use utoipa::ToSchema;

pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "email", "profile"];
const AUTHORIZE_PATH: &str = "/oauth2/authorize";
const TOKEN_PATH: &str = "/oauth2/token";

/// Supported external identity providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Microsoft,
}

impl Provider {
    pub const ALL: [Self; 2] = [Self::Google, Self::Microsoft];

    /// Path segment used in `/sign-in/{provider}`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Microsoft => "Microsoft",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.slug().eq_ignore_ascii_case(slug))
    }
}

/// Per-provider policy: the name the hosted identity service knows the
/// provider by, plus extra query directives for the authorize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    identity_provider: String,
    directives: Vec<(String, String)>,
}

impl ProviderSettings {
    #[must_use]
    pub fn new(identity_provider: impl Into<String>) -> Self {
        Self {
            identity_provider: identity_provider.into(),
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_directive(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn identity_provider(&self) -> &str {
        &self.identity_provider
    }

    #[must_use]
    pub fn directives(&self) -> &[(String, String)] {
        &self.directives
    }
}

fn default_providers() -> BTreeMap<Provider, ProviderSettings> {
    BTreeMap::from([
        (Provider::Google, ProviderSettings::new("Google")),
        (
            Provider::Microsoft,
            ProviderSettings::new("Microsoft").with_directive("prompt", "select_account"),
        ),
    ])
}

#[derive(Clone, Debug)]
pub struct FederationConfig {
    base_url: Url,
    client_id: String,
    client_secret: Option<SecretString>,
    redirect_uri: String,
    redirect_https: bool,
    scopes: Vec<String>,
    providers: BTreeMap<Provider, ProviderSettings>,
}

impl FederationConfig {
    /// `domain` is the hosted identity service domain, either a bare host
    /// (`https` is assumed) or a full base URL.
    ///
    /// # Errors
    /// Returns an error if the domain or redirect URI are not valid absolute URLs.
    pub fn new(domain: &str, client_id: String, redirect_uri: String) -> Result<Self> {
        let base_url = normalize_domain(domain)?;

        let parsed = Url::parse(&redirect_uri)
            .with_context(|| format!("Invalid redirect URI: {redirect_uri}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("Redirect URI must use http or https: {redirect_uri}"));
        }

        if client_id.trim().is_empty() {
            return Err(anyhow!("Client id must not be empty"));
        }

        Ok(Self {
            base_url,
            client_id,
            client_secret: None,
            redirect_https: parsed.scheme() == "https",
            redirect_uri,
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            providers: default_providers(),
        })
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: Option<SecretString>) -> Self {
        self.client_secret = secret;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Provider, settings: ProviderSettings) -> Self {
        self.providers.insert(provider, settings);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> Option<&SecretString> {
        self.client_secret.as_ref()
    }

    /// Redirect URI exactly as configured; used verbatim by both the authorize
    /// request and the token exchange.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn provider(&self, provider: Provider) -> Option<&ProviderSettings> {
        self.providers.get(&provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.providers.keys().copied()
    }

    /// # Errors
    /// Returns an error if the endpoint cannot be joined onto the base URL.
    pub fn authorize_endpoint(&self) -> Result<Url> {
        self.base_url
            .join(AUTHORIZE_PATH)
            .context("Failed to build authorize endpoint")
    }

    /// # Errors
    /// Returns an error if the endpoint cannot be joined onto the base URL.
    pub fn token_endpoint(&self) -> Result<Url> {
        self.base_url
            .join(TOKEN_PATH)
            .context("Failed to build token endpoint")
    }

    /// Cookies are only marked `Secure` when the browser comes back over HTTPS.
    #[must_use]
    pub fn cookies_secure(&self) -> bool {
        self.redirect_https
    }
}

fn normalize_domain(domain: &str) -> Result<Url> {
    let domain = domain.trim().trim_end_matches('/');
    if domain.is_empty() {
        return Err(anyhow!("Identity provider domain must not be empty"));
    }
    let base = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    let url = Url::parse(&base).with_context(|| format!("Invalid identity provider domain: {domain}"))?;
    if url.host_str().is_none() {
        return Err(anyhow!("Identity provider domain must include a host: {domain}"));
    }
    Ok(url)
}
