//! Clients for the hosted identity provider.
//!
//! Two surfaces are used: the `OAuth2` token endpoint (authorization code
//! exchange) and the user-pool JSON API behind the credential screens.

mod error;
pub mod oauth;
pub mod user_pool;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::IdpError;
pub use oauth::TokenExchanger;
pub use user_pool::UserPoolClient;

/// Tokens issued by the identity provider. Opaque to this service.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"***")
            .field("id_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

fn http_client() -> Result<Client, IdpError> {
    Ok(Client::builder()
        .user_agent(crate::APP_USER_AGENT)
        .build()?)
}
