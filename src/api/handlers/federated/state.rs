use super::config::FederationConfig;
use crate::{api::handlers::cookies::CookiePolicy, idp::TokenExchanger};
use anyhow::{Context, Result};

/// Shared state for the federated sign-in routes.
#[derive(Debug)]
pub struct FederationState {
    config: FederationConfig,
    exchanger: TokenExchanger,
    cookies: CookiePolicy,
}

impl FederationState {
    /// # Errors
    /// Returns an error if the token endpoint or its HTTP client cannot be built.
    pub fn new(config: FederationConfig, token_ttl_seconds: i64) -> Result<Self> {
        let exchanger = TokenExchanger::new(
            config.token_endpoint()?,
            config.client_id().to_string(),
            config.client_secret().cloned(),
            config.redirect_uri().to_string(),
        )
        .context("Failed to build token exchanger")?;
        let cookies = CookiePolicy::new(config.cookies_secure(), token_ttl_seconds);

        Ok(Self {
            config,
            exchanger,
            cookies,
        })
    }

    #[must_use]
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    #[must_use]
    pub fn exchanger(&self) -> &TokenExchanger {
        &self.exchanger
    }

    #[must_use]
    pub fn cookies(&self) -> CookiePolicy {
        self.cookies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_wires_exchanger_from_config() -> Result<()> {
        let config = FederationConfig::new(
            "idp.example.com",
            "client".to_string(),
            "https://app.example.com/callback".to_string(),
        )?;
        let state = FederationState::new(config, 900)?;
        assert_eq!(
            state.exchanger().endpoint().as_str(),
            "https://idp.example.com/oauth2/token"
        );
        assert!(state.cookies().secure());
        assert_eq!(state.cookies().token_ttl_seconds(), 900);
        Ok(())
    }
}
