//! Callback Receiver: validate the provider redirect and exchange the code.
//!
//! Evaluation order is fixed: provider error, then nonce, then code. The
//! nonce cookie is cleared on every response, whichever branch runs.

use super::{nonce::nonce_matches, state::FederationState};
use crate::api::handlers::{
    LANDING_PATH, SIGN_IN_PATH,
    cookies::{CookieError, OAUTH_STATE_COOKIE, read_cookie},
};
use crate::idp::{IdpError, TokenSet};
use axum::{
    extract::{Extension, RawQuery},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::form_urlencoded;
use utoipa::IntoParams;

pub const ERROR_INVALID_STATE: &str = "invalid_state";
pub const ERROR_MISSING_CODE: &str = "no_code";
pub const ERROR_TOKEN_EXCHANGE_FAILED: &str = "token_exchange_failed";

/// Query parameters delivered by the identity provider.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Anti-forgery nonce echoed back by the provider
    pub state: Option<String>,
    /// Provider error code, e.g. `access_denied`
    pub error: Option<String>,
    /// Human readable provider error
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string. The first occurrence of each key wins and
    /// empty values count as absent, so parsing never fails.
    #[must_use]
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Result of evaluating a callback before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    ProviderError {
        error: String,
        description: Option<String>,
    },
    InvalidState,
    MissingCode,
    Proceed {
        code: String,
    },
}

impl CallbackOutcome {
    /// Precedence: provider error, then nonce, then code. The pending nonce is
    /// not consulted when the provider reported an error.
    #[must_use]
    pub fn evaluate(params: &CallbackParams, pending_nonce: Option<&str>) -> Self {
        if let Some(error) = &params.error {
            return Self::ProviderError {
                error: error.clone(),
                description: params.error_description.clone(),
            };
        }

        let state_valid = match (pending_nonce, params.state.as_deref()) {
            (Some(pending), Some(returned)) => nonce_matches(pending, returned),
            _ => false,
        };
        if !state_valid {
            return Self::InvalidState;
        }

        match &params.code {
            Some(code) => Self::Proceed { code: code.clone() },
            None => Self::MissingCode,
        }
    }
}

/// Terminal failure of a callback. Never retried.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("identity provider returned {error}")]
    Provider {
        error: String,
        description: Option<String>,
    },
    #[error("anti-forgery state is missing or does not match")]
    InvalidState,
    #[error("callback carried neither a code nor an error")]
    MissingCode,
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(#[from] IdpError),
    #[error("issued tokens cannot be stored as cookies: {0}")]
    TokenStorage(#[from] CookieError),
}

impl CallbackError {
    /// Value of the `error` query parameter on the sign-in screen.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Provider { error, .. } => error,
            Self::InvalidState => ERROR_INVALID_STATE,
            Self::MissingCode => ERROR_MISSING_CODE,
            Self::TokenExchangeFailed(_) | Self::TokenStorage(_) => ERROR_TOKEN_EXCHANGE_FAILED,
        }
    }

    /// Sign-in screen location carrying this error for display.
    #[must_use]
    pub fn sign_in_location(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("error", self.code());
        if let Self::Provider { description, .. } = self {
            query.append_pair("description", description.as_deref().unwrap_or_default());
        }
        format!("{SIGN_IN_PATH}?{}", query.finish())
    }
}

/// Run the callback to completion: evaluate, then exchange when allowed.
pub(crate) async fn complete(
    federation: &FederationState,
    params: &CallbackParams,
    pending_nonce: Option<&str>,
) -> Result<TokenSet, CallbackError> {
    match CallbackOutcome::evaluate(params, pending_nonce) {
        CallbackOutcome::ProviderError { error, description } => {
            Err(CallbackError::Provider { error, description })
        }
        CallbackOutcome::InvalidState => Err(CallbackError::InvalidState),
        CallbackOutcome::MissingCode => Err(CallbackError::MissingCode),
        CallbackOutcome::Proceed { code } => Ok(federation.exchanger().exchange(&code).await?),
    }
}

#[utoipa::path(
    get,
    path = "/callback",
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to /dashboard with token cookies, or to /sign-in?error=... on failure; always clears the nonce cookie")
    ),
    tag = "federated"
)]
#[instrument(skip_all)]
pub async fn callback(
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    federation: Extension<Arc<FederationState>>,
) -> Response {
    let params = CallbackParams::from_query(query.as_deref());
    let cookies = federation.cookies();

    // Read once, clear unconditionally: the nonce is single-use.
    let pending_nonce = read_cookie(&headers, OAUTH_STATE_COOKIE);
    let mut response_headers = HeaderMap::new();
    match cookies.clear(OAUTH_STATE_COOKIE) {
        Ok(cookie) => {
            response_headers.append(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build nonce clearing cookie: {err}"),
    }

    let result = complete(&federation, &params, pending_nonce.as_deref())
        .await
        .and_then(|tokens| {
            cookies
                .append_tokens(&mut response_headers, &tokens)
                .map_err(CallbackError::from)
        });

    match result {
        Ok(()) => {
            info!("federated sign-in completed");
            (response_headers, Redirect::to(LANDING_PATH)).into_response()
        }
        Err(err) => {
            match &err {
                CallbackError::TokenExchangeFailed(_) | CallbackError::TokenStorage(_) => {
                    error!("Federated sign-in failed: {err}");
                }
                _ => warn!(error = err.code(), "Federated sign-in rejected: {err}"),
            }
            (response_headers, Redirect::to(&err.sign_in_location())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> CallbackParams {
        CallbackParams::from_query(Some(query))
    }

    #[test]
    fn from_query_parses_known_keys() {
        let parsed = params("code=abc&state=xyz&foo=bar");
        assert_eq!(parsed.code.as_deref(), Some("abc"));
        assert_eq!(parsed.state.as_deref(), Some("xyz"));
        assert_eq!(parsed.error, None);
    }

    #[test]
    fn from_query_first_value_wins_and_empty_is_absent() {
        let parsed = params("state=first&state=second&code=");
        assert_eq!(parsed.state.as_deref(), Some("first"));
        assert_eq!(parsed.code, None);
        assert_eq!(CallbackParams::from_query(None), CallbackParams::default());
    }

    #[test]
    fn from_query_decodes_description() {
        let parsed = params("error=access_denied&error_description=User+cancelled%21");
        assert_eq!(parsed.error_description.as_deref(), Some("User cancelled!"));
    }

    #[test]
    fn provider_error_wins_without_nonce() {
        let outcome = CallbackOutcome::evaluate(&params("error=access_denied"), None);
        assert_eq!(
            outcome,
            CallbackOutcome::ProviderError {
                error: "access_denied".to_string(),
                description: None,
            }
        );
    }

    #[test]
    fn provider_error_wins_over_code_and_bad_state() {
        let outcome = CallbackOutcome::evaluate(
            &params("error=server_error&error_description=boom&code=abc&state=wrong"),
            Some("nonce"),
        );
        assert_eq!(
            outcome,
            CallbackOutcome::ProviderError {
                error: "server_error".to_string(),
                description: Some("boom".to_string()),
            }
        );
    }

    #[test]
    fn missing_or_mismatched_nonce_is_invalid_state() {
        let query = params("code=abc&state=nonce");
        assert_eq!(
            CallbackOutcome::evaluate(&query, None),
            CallbackOutcome::InvalidState
        );
        assert_eq!(
            CallbackOutcome::evaluate(&query, Some("other")),
            CallbackOutcome::InvalidState
        );
        assert_eq!(
            CallbackOutcome::evaluate(&params("code=abc"), Some("nonce")),
            CallbackOutcome::InvalidState
        );
    }

    #[test]
    fn nonce_is_checked_before_code() {
        assert_eq!(
            CallbackOutcome::evaluate(&params("state=wrong"), Some("nonce")),
            CallbackOutcome::InvalidState
        );
    }

    #[test]
    fn valid_nonce_without_code_is_missing_code() {
        assert_eq!(
            CallbackOutcome::evaluate(&params("state=nonce"), Some("nonce")),
            CallbackOutcome::MissingCode
        );
    }

    #[test]
    fn valid_nonce_with_code_proceeds() {
        assert_eq!(
            CallbackOutcome::evaluate(&params("code=abc&state=nonce"), Some("nonce")),
            CallbackOutcome::Proceed {
                code: "abc".to_string()
            }
        );
    }

    #[test]
    fn superseded_nonce_no_longer_validates() {
        // attempt 2 overwrote the slot; a callback for attempt 1 must fail
        assert_eq!(
            CallbackOutcome::evaluate(&params("code=abc&state=first"), Some("second")),
            CallbackOutcome::InvalidState
        );
    }

    #[test]
    fn sign_in_locations_encode_error_kind() {
        assert_eq!(
            CallbackError::InvalidState.sign_in_location(),
            "/sign-in?error=invalid_state"
        );
        assert_eq!(
            CallbackError::MissingCode.sign_in_location(),
            "/sign-in?error=no_code"
        );
        assert_eq!(
            CallbackError::TokenExchangeFailed(IdpError::Service {
                status: 400,
                kind: "invalid_grant".to_string(),
                message: String::new(),
            })
            .sign_in_location(),
            "/sign-in?error=token_exchange_failed"
        );
        assert_eq!(
            CallbackError::Provider {
                error: "access_denied".to_string(),
                description: Some("User said no".to_string()),
            }
            .sign_in_location(),
            "/sign-in?error=access_denied&description=User+said+no"
        );
        assert_eq!(
            CallbackError::Provider {
                error: "access_denied".to_string(),
                description: None,
            }
            .sign_in_location(),
            "/sign-in?error=access_denied&description="
        );
    }
}
