use thiserror::Error;

/// Failure talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdpError {
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider returned {status}: {kind}: {message}")]
    Service {
        status: u16,
        kind: String,
        message: String,
    },
    #[error("invalid identity provider payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid identity provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("cannot derive a region from user pool id {0}")]
    InvalidUserPoolId(String),
}

impl IdpError {
    /// Provider error kind (e.g. `NotAuthorizedException`), if the provider answered.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Service { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Human readable message; provider messages are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Service { message, .. } if !message.is_empty() => message.clone(),
            Self::Service { kind, .. } => kind.clone(),
            _ => "Identity provider is unavailable, please try again".to_string(),
        }
    }
}
