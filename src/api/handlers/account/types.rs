//! Request/response types for the credential screens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub accept_terms: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct VerifyOtpRequest {
    pub username: String,
    pub code: String,
}

/// Body shared by resend-code and forgot-password.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub code: String,
    pub new_password: String,
}

/// Where the browser should go next.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RedirectResponse {
    pub redirect: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SignUpResponse {
    pub redirect: String,
    pub confirmed: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CodeDeliveryResponse {
    /// Masked destination, e.g. `b***@e***.com`
    pub destination: Option<String>,
    pub delivery_medium: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub display_name: String,
    pub attributes: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn missing_fields_default_to_empty() -> Result<()> {
        let request: SignUpRequest = serde_json::from_str(r#"{"username":"bob"}"#)?;
        assert_eq!(request.username, "bob");
        assert!(request.email.is_empty());
        assert!(!request.accept_terms);
        Ok(())
    }
}
