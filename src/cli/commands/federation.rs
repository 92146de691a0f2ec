//! Hosted identity provider and `OAuth2` client registration.

use anyhow::{Result, bail};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_IDP_DOMAIN: &str = "idp-domain";
pub const ARG_CLIENT_ID: &str = "client-id";
pub const ARG_CLIENT_SECRET: &str = "client-secret";
pub const ARG_REDIRECT_URI: &str = "redirect-uri";
pub const ARG_SCOPES: &str = "scopes";

#[derive(Debug, Clone)]
pub struct Options {
    pub idp_domain: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl Options {
    /// Parse federation arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or empty.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        // clap passes "" through when the env var is set but empty
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |id: &str| match get_non_empty(id) {
            Some(value) => Ok(value),
            None => bail!("missing required argument: --{id}"),
        };

        let scopes: Vec<String> = get_non_empty(ARG_SCOPES)
            .unwrap_or_default()
            .split_whitespace()
            .map(ToString::to_string)
            .collect();
        if scopes.is_empty() {
            bail!("missing required argument: --{ARG_SCOPES}");
        }

        Ok(Self {
            idp_domain: required(ARG_IDP_DOMAIN)?,
            client_id: required(ARG_CLIENT_ID)?,
            client_secret: get_non_empty(ARG_CLIENT_SECRET).map(SecretString::from),
            redirect_uri: required(ARG_REDIRECT_URI)?,
            scopes,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDP_DOMAIN)
                .long(ARG_IDP_DOMAIN)
                .help("Hosted identity provider domain, example: tenant.auth.us-east-1.amazoncognito.com")
                .long_help(
                    "Hosted identity provider domain. The authorize and token endpoints are\n`https://{domain}/oauth2/authorize` and `https://{domain}/oauth2/token`.\nA full base URL (with scheme) is also accepted.",
                )
                .env("AUTHGATE_IDP_DOMAIN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("OAuth2 client id registered with the identity provider")
                .env("AUTHGATE_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_SECRET)
                .long(ARG_CLIENT_SECRET)
                .help("OAuth2 client secret, sent with HTTP Basic on the token endpoint")
                .env("AUTHGATE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URI)
                .long(ARG_REDIRECT_URI)
                .help("Callback URL registered with the identity provider, example: https://app.tld/callback")
                .env("AUTHGATE_REDIRECT_URI")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SCOPES)
                .long(ARG_SCOPES)
                .help("Space separated OAuth2 scopes")
                .env("AUTHGATE_SCOPES")
                .default_value("openid email profile"),
        )
}
