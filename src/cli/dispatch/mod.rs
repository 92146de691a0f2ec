//! Map parsed CLI arguments to an action.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, account, federation};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let federation_opts = federation::Options::parse(matches)?;
    let account_opts = account::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        idp_domain: federation_opts.idp_domain,
        client_id: federation_opts.client_id,
        client_secret: federation_opts.client_secret,
        redirect_uri: federation_opts.redirect_uri,
        scopes: federation_opts.scopes,
        user_pool_id: account_opts.user_pool_id,
        idp_api_url: account_opts.idp_api_url,
        token_ttl_seconds: account_opts.token_ttl_seconds,
    }))
}
