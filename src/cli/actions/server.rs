use crate::{
    api::{
        self,
        handlers::{
            account::AccountState,
            cookies::CookiePolicy,
            federated::{FederationConfig, FederationState},
        },
    },
    idp::{UserPoolClient, user_pool},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub idp_domain: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub user_pool_id: String,
    pub idp_api_url: Option<String>,
    pub token_ttl_seconds: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let port = args.port;
    let (federation, account) = build_state(args)?;

    api::new(port, federation, account).await
}

/// Configuration is resolved once; handlers only ever see these records.
pub(crate) fn build_state(args: Args) -> Result<(Arc<FederationState>, Arc<AccountState>)> {
    let config = FederationConfig::new(&args.idp_domain, args.client_id.clone(), args.redirect_uri)?
        .with_client_secret(args.client_secret)
        .with_scopes(args.scopes);

    let cookies = CookiePolicy::new(config.cookies_secure(), args.token_ttl_seconds);

    let endpoint = match args.idp_api_url {
        Some(url) => Url::parse(&url).with_context(|| format!("Invalid user-pool API URL: {url}"))?,
        None => user_pool::default_endpoint(&args.user_pool_id)
            .context("Failed to derive the user-pool API endpoint")?,
    };
    let idp = UserPoolClient::new(endpoint, args.client_id)
        .context("Failed to build user-pool client")?;

    let federation = FederationState::new(config, args.token_ttl_seconds)?;

    debug!(
        authorize = %federation.config().authorize_endpoint()?,
        token = %federation.exchanger().endpoint(),
        user_pool = %idp.endpoint(),
        "identity provider endpoints"
    );

    Ok((
        Arc::new(federation),
        Arc::new(AccountState::new(idp, cookies)),
    ))
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        idp_domain = %args.idp_domain,
        client_id = %args.client_id,
        confidential_client = args.client_secret.is_some(),
        redirect_uri = %args.redirect_uri,
        scopes = %args.scopes.join(" "),
        user_pool_id = %args.user_pool_id,
        token_ttl_seconds = args.token_ttl_seconds,
        "starting authgate"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            port: 8080,
            idp_domain: "tenant.auth.us-east-1.amazoncognito.com".to_string(),
            client_id: "client-123".to_string(),
            client_secret: None,
            redirect_uri: "https://app.example.com/callback".to_string(),
            scopes: vec!["openid".to_string()],
            user_pool_id: "us-east-1_AbCdEf123".to_string(),
            idp_api_url: None,
            token_ttl_seconds: 600,
        }
    }

    #[test]
    fn state_uses_regional_endpoint_by_default() -> Result<()> {
        let (federation, account) = build_state(args())?;
        assert_eq!(federation.config().scopes(), ["openid"]);
        assert_eq!(
            account.idp().endpoint().as_str(),
            "https://cognito-idp.us-east-1.amazonaws.com/"
        );
        assert!(account.cookies().secure());
        assert_eq!(account.cookies().token_ttl_seconds(), 600);
        Ok(())
    }

    #[test]
    fn explicit_api_url_wins() -> Result<()> {
        let mut args = args();
        args.idp_api_url = Some("http://127.0.0.1:9229/".to_string());
        let (_, account) = build_state(args)?;
        assert_eq!(account.idp().endpoint().as_str(), "http://127.0.0.1:9229/");
        Ok(())
    }

    #[test]
    fn pool_id_without_region_fails_startup() {
        let mut args = args();
        args.user_pool_id = "AbCdEf123".to_string();
        let err = build_state(args).err().map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| {
            e.contains("Failed to derive the user-pool API endpoint") && e.contains("AbCdEf123")
        }));
    }

    #[test]
    fn invalid_redirect_uri_fails() {
        let mut args = args();
        args.redirect_uri = "callback".to_string();
        assert!(build_state(args).is_err());
    }
}
