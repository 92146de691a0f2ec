//! User-pool API used by the credential screens, and token cookie lifetime.

use anyhow::{Result, bail};
use clap::{Arg, ArgMatches, Command};

pub const ARG_USER_POOL_ID: &str = "user-pool-id";
pub const ARG_IDP_API_URL: &str = "idp-api-url";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub user_pool_id: String,
    pub idp_api_url: Option<String>,
    pub token_ttl_seconds: i64,
}

impl Options {
    /// Parse account arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the user pool id is missing or the TTL is not positive.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(user_pool_id) = get_non_empty(ARG_USER_POOL_ID) else {
            bail!("missing required argument: --{ARG_USER_POOL_ID}");
        };

        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(3600);
        if token_ttl_seconds <= 0 {
            bail!("--{ARG_TOKEN_TTL_SECONDS} must be greater than zero");
        }

        Ok(Self {
            user_pool_id,
            idp_api_url: get_non_empty(ARG_IDP_API_URL),
            token_ttl_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_USER_POOL_ID)
                .long(ARG_USER_POOL_ID)
                .help("User pool id, example: us-east-1_AbCdEf123")
                .env("AUTHGATE_USER_POOL_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDP_API_URL)
                .long(ARG_IDP_API_URL)
                .help("User-pool API endpoint (default: derived from the user pool region)")
                .env("AUTHGATE_IDP_API_URL"),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Lifetime of the access and identity token cookies in seconds")
                .env("AUTHGATE_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
}
