//! Username/password sign-in and sign-out.

use super::{
    AccountState, idp_error_response, missing_payload,
    types::{ChallengeResponse, RedirectResponse, SignInRequest},
};
use crate::{
    api::handlers::{ErrorBody, LANDING_PATH, error_response},
    idp::user_pool::SignInResult,
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const MISSING_FIELDS: &str = "Please fill in all fields.";
const INVALID_CREDENTIALS: &str = "Incorrect username or password.";

#[utoipa::path(
    post,
    path = "/v1/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; token cookies set", body = RedirectResponse),
        (status = 400, description = "Missing username or password", body = ErrorBody),
        (status = 401, description = "Incorrect username or password", body = ErrorBody),
        (status = 409, description = "Identity provider requires a challenge", body = ChallengeResponse),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    account: Extension<Arc<AccountState>>,
    payload: Option<Json<SignInRequest>>,
) -> Response {
    let request: SignInRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "missing_fields", MISSING_FIELDS);
    }

    match account.idp().sign_in(username, &request.password).await {
        Ok(SignInResult::Authenticated(tokens)) => {
            let mut headers = HeaderMap::new();
            if let Err(err) = account.cookies().append_tokens(&mut headers, &tokens) {
                error!("Failed to build token cookies: {err}");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Sign-in failed",
                );
            }
            info!("credential sign-in completed");
            (
                StatusCode::OK,
                headers,
                Json(RedirectResponse {
                    redirect: LANDING_PATH.to_string(),
                }),
            )
                .into_response()
        }
        Ok(SignInResult::Challenge { name }) => {
            info!(challenge = %name, "identity provider requested a challenge");
            (
                StatusCode::CONFLICT,
                Json(ChallengeResponse { challenge: name }),
            )
                .into_response()
        }
        // Every rejection reads the same so usernames cannot be probed.
        Err(err) if err.kind().is_some() => {
            warn!(kind = err.kind(), "credential sign-in rejected");
            error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                INVALID_CREDENTIALS,
            )
        }
        Err(err) => idp_error_response("sign-in", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/sign-out",
    responses(
        (status = 204, description = "Token cookies cleared")
    ),
    tag = "account"
)]
pub async fn sign_out(account: Extension<Arc<AccountState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    account.cookies().append_clear_tokens(&mut headers);
    (StatusCode::NO_CONTENT, headers)
}
