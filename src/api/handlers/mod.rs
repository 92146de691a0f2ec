//! API handlers and shared response helpers.

pub mod account;
pub mod cookies;
pub mod federated;
pub mod health;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where the browser lands after a successful sign-in.
pub(crate) const LANDING_PATH: &str = "/dashboard";
/// Sign-in screen; failures are reported here through `?error=`.
pub(crate) const SIGN_IN_PATH: &str = "/sign-in";

/// JSON body returned by every non-redirect failure.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub(crate) fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn error_response_is_json() -> Result<()> {
        let response = error_response(StatusCode::NOT_FOUND, "unknown_provider", "nope");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let decoded: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(decoded.error, "unknown_provider");
        assert_eq!(decoded.message, "nope");
        Ok(())
    }
}
