//! State of the sign-in screen: the error a failed attempt left behind and the
//! federated providers the browser can pick from.

use super::{config::Provider, state::FederationState};
use axum::{
    Json,
    extract::{Extension, RawQuery},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::form_urlencoded;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProviderLink {
    pub provider: Provider,
    pub label: String,
    /// Login Initiator route for this provider
    pub href: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignInScreen {
    pub error: Option<String>,
    pub description: Option<String>,
    pub providers: Vec<ProviderLink>,
}

impl SignInScreen {
    fn new(query: Option<&str>, providers: impl Iterator<Item = Provider>) -> Self {
        let mut error = None;
        let mut description = None;
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "error" => &mut error,
                "description" => &mut description,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        Self {
            error,
            description,
            providers: providers
                .map(|provider| ProviderLink {
                    provider,
                    label: provider.label().to_string(),
                    href: format!("/sign-in/{}", provider.slug()),
                })
                .collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/sign-in",
    params(
        ("error" = Option<String>, Query, description = "Error kind left by a failed sign-in"),
        ("description" = Option<String>, Query, description = "Provider error description")
    ),
    responses(
        (status = 200, description = "Sign-in screen state", body = SignInScreen)
    ),
    tag = "federated"
)]
pub async fn sign_in_screen(
    RawQuery(query): RawQuery,
    federation: Extension<Arc<FederationState>>,
) -> impl IntoResponse {
    Json(SignInScreen::new(
        query.as_deref(),
        federation.config().providers(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_echoes_error_and_lists_providers() {
        let screen = SignInScreen::new(
            Some("error=access_denied&description=User+cancelled"),
            Provider::ALL.into_iter(),
        );
        assert_eq!(screen.error.as_deref(), Some("access_denied"));
        assert_eq!(screen.description.as_deref(), Some("User cancelled"));
        let hrefs: Vec<_> = screen.providers.iter().map(|p| p.href.as_str()).collect();
        assert_eq!(hrefs, ["/sign-in/google", "/sign-in/microsoft"]);
    }

    #[test]
    fn screen_without_query_has_no_error() {
        let screen = SignInScreen::new(None, std::iter::empty());
        assert_eq!(screen.error, None);
        assert_eq!(screen.description, None);
        assert!(screen.providers.is_empty());
    }

    #[test]
    fn empty_description_is_absent() {
        let screen = SignInScreen::new(Some("error=access_denied&description="), std::iter::empty());
        assert_eq!(screen.error.as_deref(), Some("access_denied"));
        assert_eq!(screen.description, None);
    }
}
