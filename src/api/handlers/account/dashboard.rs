//! Authenticated landing page.

use super::{AccountState, types::ProfileResponse};
use crate::{
    api::handlers::{
        SIGN_IN_PATH,
        cookies::{ACCESS_TOKEN_COOKIE, read_cookie},
    },
    idp::user_pool::UserProfile,
};
use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        let attribute = |name: &str| profile.attributes.get(name).cloned().unwrap_or_default();

        let email = attribute("email");
        let given_name = attribute("given_name");
        let family_name = attribute("family_name");
        // Federated accounts often only carry given/family names.
        let name = profile
            .attributes
            .get("name")
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("{given_name} {family_name}").trim().to_string());
        let display_name = profile
            .attributes
            .get("custom:display_name")
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| attribute("name"));

        Self {
            username: profile.username,
            email,
            name,
            given_name,
            family_name,
            display_name,
            attributes: profile.attributes,
        }
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Profile of the signed-in user", body = ProfileResponse),
        (status = 303, description = "Not signed in; redirect to /sign-in")
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn dashboard(headers: HeaderMap, account: Extension<Arc<AccountState>>) -> Response {
    let Some(access_token) = read_cookie(&headers, ACCESS_TOKEN_COOKIE) else {
        debug!("no access token cookie");
        return Redirect::to(SIGN_IN_PATH).into_response();
    };

    match account.idp().get_user(&access_token).await {
        Ok(profile) => Json(ProfileResponse::from(profile)).into_response(),
        Err(err) if err.kind().is_some() => {
            // Expired or revoked: drop the stale tokens.
            warn!(kind = err.kind(), "access token rejected");
            let mut clear = HeaderMap::new();
            account.cookies().append_clear_tokens(&mut clear);
            (clear, Redirect::to(SIGN_IN_PATH)).into_response()
        }
        Err(err) => {
            error!("Failed to load user profile: {err}");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
    }
}
