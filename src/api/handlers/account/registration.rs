//! Sign-up and one-time-passcode confirmation.

use super::{
    AccountState, idp_error_response, location, missing_payload,
    types::{
        CodeDeliveryResponse, RedirectResponse, SignUpRequest, SignUpResponse, UsernameRequest,
        VerifyOtpRequest,
    },
    valid_email, valid_otp,
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

const VERIFY_OTP_PATH: &str = "/verify-otp";

#[utoipa::path(
    post,
    path = "/v1/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Invalid input or rejected by the identity provider", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn sign_up(
    account: Extension<Arc<AccountState>>,
    payload: Option<Json<SignUpRequest>>,
) -> Response {
    let request: SignUpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() || email.is_empty() || request.password.is_empty() || !request.accept_terms
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_fields",
            "Please fill all required fields and accept the terms.",
        );
    }

    if !valid_email(email) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_email",
            "Please enter a valid email address.",
        );
    }

    match account.idp().sign_up(username, &request.password, email).await {
        Ok(result) => {
            info!(confirmed = result.user_confirmed, "account created");
            // Pools that auto-confirm skip the passcode screen.
            let redirect = if result.user_confirmed {
                SIGN_IN_PATH.to_string()
            } else {
                location(VERIFY_OTP_PATH, &[("email", email), ("username", username)])
            };
            (
                StatusCode::CREATED,
                Json(SignUpResponse {
                    redirect,
                    confirmed: result.user_confirmed,
                }),
            )
                .into_response()
        }
        Err(err) => idp_error_response("sign-up", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account confirmed", body = RedirectResponse),
        (status = 400, description = "Invalid input or code rejected", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    account: Extension<Arc<AccountState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let username = request.username.trim();
    if username.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_username",
            "Username is required to verify your account",
        );
    }

    let code = request.code.trim();
    if !valid_otp(code) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_code",
            "Please enter the 6-digit verification code.",
        );
    }

    match account.idp().confirm_sign_up(username, code).await {
        Ok(()) => {
            info!("account confirmed");
            Json(RedirectResponse {
                redirect: SIGN_IN_PATH.to_string(),
            })
            .into_response()
        }
        Err(err) => idp_error_response("verify-otp", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/resend-code",
    request_body = UsernameRequest,
    responses(
        (status = 200, description = "Code sent", body = CodeDeliveryResponse),
        (status = 400, description = "Missing username or rejected", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn resend_code(
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
            "Username is required to resend verification code",
        );
    }

    match account.idp().resend_confirmation_code(username).await {
        Ok(delivery) => {
            let delivery = delivery.unwrap_or_default();
            Json(CodeDeliveryResponse {
                destination: delivery.destination,
                delivery_medium: delivery.delivery_medium,
            })
            .into_response()
        }
        Err(err) => idp_error_response("resend-code", &err),
    }
}
