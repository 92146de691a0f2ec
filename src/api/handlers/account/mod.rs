//! Credential screens backed by the identity provider's user-pool API.
//!
//! Every handler validates its input, makes exactly one provider call and
//! tells the browser where to go next. Provider messages are passed through
//! verbatim where the screen shows them; sign-in failures are collapsed into
//! one message so usernames cannot be probed.

pub(crate) mod credentials;
pub(crate) mod dashboard;
pub(crate) mod password;
pub(crate) mod registration;
mod state;
pub(crate) mod types;

pub use state::AccountState;

use super::error_response;
use crate::idp::IdpError;
use axum::{http::StatusCode, response::Response};
use regex::Regex;
use tracing::{error, warn};
use url::form_urlencoded;

/// Basic email format check.
pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// One-time passcodes are six digits.
pub(crate) fn valid_otp(code: &str) -> bool {
    Regex::new(r"^\d{6}$").is_ok_and(|re| re.is_match(code))
}

/// `path?key=value&...` with form-urlencoded values.
pub(crate) fn location(path: &str, pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

pub(crate) fn missing_payload() -> Response {
    error_response(StatusCode::BAD_REQUEST, "missing_payload", "Missing payload")
}

/// Map a provider failure: rejections become `400` with the provider message,
/// anything else means the provider could not be reached.
pub(crate) fn idp_error_response(operation: &str, err: &IdpError) -> Response {
    match err.kind() {
        Some(kind) => {
            warn!(operation, kind, "identity provider rejected request");
            error_response(StatusCode::BAD_REQUEST, kind, &err.user_message())
        }
        None => {
            error!("{operation} failed: {err}");
            error_response(
                StatusCode::BAD_GATEWAY,
                "idp_unavailable",
                &err.user_message(),
            )
        }
    }
}
