//! Forgotten password: request a reset code, then set a new password with it.

use super::{
    AccountState, idp_error_response, location, missing_payload,
    types::{RedirectResponse, ResetPasswordRequest, UsernameRequest},
    valid_otp,
};
use crate::api::handlers::{ErrorBody, SIGN_IN_PATH, error_response};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, instrument};

const RESET_PASSWORD_PATH: &str = "/reset-password";

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = UsernameRequest,
    responses(
        (status = 202, description = "Reset code sent", body = RedirectResponse),
        (status = 400, description = "Missing username or rejected", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn forgot_password(
    account: Extension<Arc<AccountState>>,
    payload: Option<Json<UsernameRequest>>,
) -> Response {
    let request: UsernameRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let username = request.username.trim();
    if username.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_username",
            "Please enter your username.",
        );
    }

    match account.idp().forgot_password(username).await {
        Ok(delivery) => {
            info!(
                medium = delivery.and_then(|d| d.delivery_medium).as_deref(),
                "password reset code sent"
            );
            (
                StatusCode::ACCEPTED,
                Json(RedirectResponse {
                    redirect: location(RESET_PASSWORD_PATH, &[("username", username)]),
                }),
            )
                .into_response()
        }
        Err(err) => idp_error_response("forgot-password", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = RedirectResponse),
        (status = 400, description = "Invalid input, code or password rejected", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn reset_password(
    account: Extension<Arc<AccountState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Response {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let username = request.username.trim();
    let code = request.code.trim();
    if username.is_empty() || code.is_empty() || request.new_password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_fields",
            "Please fill in all fields.",
        );
    }

    if !valid_otp(code) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_code",
            "Please enter the 6-digit verification code.",
        );
    }

    match account
        .idp()
        .confirm_forgot_password(username, code, &request.new_password)
        .await
    {
        Ok(()) => {
            info!("password reset completed");
            Json(RedirectResponse {
                redirect: SIGN_IN_PATH.to_string(),
            })
            .into_response()
        }
        Err(err) => idp_error_response("reset-password", &err),
    }
}
