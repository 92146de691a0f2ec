//! User-pool JSON API (sign-in, sign-up, passcode and password flows).
//!
//! Every call is a `POST` to the regional endpoint with an
//! `X-Amz-Target: AWSCognitoIdentityProviderService.<Operation>` header and an
//! `application/x-amz-json-1.1` body. Public app clients need no request
//! signing.

use super::{IdpError, TokenSet, http_client};
use regex::Regex;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned, de::IgnoredAny};
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use url::Url;

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

/// Extract the region from a user-pool id such as `us-east-1_AbCdEf123`.
#[must_use]
pub fn region_from_user_pool_id(user_pool_id: &str) -> Option<&str> {
    let valid = Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+_[0-9A-Za-z]+$")
        .is_ok_and(|re| re.is_match(user_pool_id));
    if !valid {
        return None;
    }
    user_pool_id.split('_').next()
}

/// Default regional endpoint for a user pool.
///
/// # Errors
/// Returns an error if the user-pool id does not carry a region.
pub fn default_endpoint(user_pool_id: &str) -> Result<Url, IdpError> {
    let region = region_from_user_pool_id(user_pool_id)
        .ok_or_else(|| IdpError::InvalidUserPoolId(user_pool_id.to_string()))?;
    Ok(Url::parse(&format!(
        "https://cognito-idp.{region}.amazonaws.com/"
    ))?)
}

/// Outcome of a credential sign-in.
#[derive(Debug)]
pub enum SignInResult {
    Authenticated(TokenSet),
    /// The provider wants more (MFA, new password, ...) before issuing tokens.
    Challenge { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResult {
    pub user_confirmed: bool,
    pub user_sub: Option<String>,
    pub delivery: Option<CodeDelivery>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeDelivery {
    pub destination: Option<String>,
    pub delivery_medium: Option<String>,
    pub attribute_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Attribute {
    name: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
}

impl From<AuthenticationResult> for TokenSet {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
            token_type: result.token_type,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    #[serde(default)]
    user_confirmed: bool,
    user_sub: Option<String>,
    code_delivery_details: Option<CodeDelivery>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeliveryResponse {
    code_delivery_details: Option<CodeDelivery>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<Attribute>,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

pub struct UserPoolClient {
    client: Client,
    endpoint: Url,
    client_id: String,
}

impl UserPoolClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url, client_id: String) -> Result<Self, IdpError> {
        Ok(Self {
            client: http_client()?,
            endpoint,
            client_id,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<T, IdpError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let error: ServiceError = serde_json::from_slice(&bytes).unwrap_or(ServiceError {
                kind: String::new(),
                message: String::new(),
            });
            // `__type` may be namespaced: `com.amazonaws...#NotAuthorizedException`
            let kind = error
                .kind
                .rsplit('#')
                .next()
                .filter(|kind| !kind.is_empty())
                .unwrap_or("UnknownError")
                .to_string();
            debug!(operation, %status, kind = %kind, "user pool call rejected");
            return Err(IdpError::Service {
                status: status.as_u16(),
                kind,
                message: error.message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `InitiateAuth` with `USER_PASSWORD_AUTH`.
    ///
    /// # Errors
    /// Returns the provider rejection (e.g. `NotAuthorizedException`) or a transport error.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SignInResult, IdpError> {
        let body = serde_json::json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "USERNAME": username,
                "PASSWORD": password,
            },
        });
        let response: InitiateAuthResponse = self.call("InitiateAuth", &body).await?;

        match (response.authentication_result, response.challenge_name) {
            (Some(result), _) => Ok(SignInResult::Authenticated(result.into())),
            (None, Some(name)) => Ok(SignInResult::Challenge { name }),
            (None, None) => Err(IdpError::Service {
                status: 200,
                kind: "EmptyAuthenticationResult".to_string(),
                message: "identity provider returned neither tokens nor a challenge".to_string(),
            }),
        }
    }

    /// `SignUp` with the `email` attribute.
    ///
    /// # Errors
    /// Returns the provider rejection (e.g. `UsernameExistsException`) or a transport error.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<SignUpResult, IdpError> {
        let attributes = vec![Attribute {
            name: "email".to_string(),
            value: email.to_string(),
        }];
        let body = serde_json::json!({
            "ClientId": self.client_id,
            "Username": username,
            "Password": password,
            "UserAttributes": attributes,
        });
        let response: SignUpResponse = self.call("SignUp", &body).await?;

        Ok(SignUpResult {
            user_confirmed: response.user_confirmed,
            user_sub: response.user_sub,
            delivery: response.code_delivery_details,
        })
    }

    /// `ConfirmSignUp` with the one-time passcode sent at sign-up.
    ///
    /// # Errors
    /// Returns the provider rejection (e.g. `CodeMismatchException`) or a transport error.
    #[instrument(skip(self, code))]
    pub async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<(), IdpError> {
        let body = serde_json::json!({
            "ClientId": self.client_id,
            "Username": username,
            "ConfirmationCode": code,
        });
        let _: IgnoredAny = self.call("ConfirmSignUp", &body).await?;
        Ok(())
    }

    /// # Errors
    /// Returns the provider rejection or a transport error.
    #[instrument(skip(self))]
    pub async fn resend_confirmation_code(
        &self,
        username: &str,
    ) -> Result<Option<CodeDelivery>, IdpError> {
        let body = serde_json::json!({
            "ClientId": self.client_id,
            "Username": username,
        });
        let response: DeliveryResponse = self.call("ResendConfirmationCode", &body).await?;
        Ok(response.code_delivery_details)
    }

    /// # Errors
    /// Returns the provider rejection or a transport error.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, username: &str) -> Result<Option<CodeDelivery>, IdpError> {
        let body = serde_json::json!({
            "ClientId": self.client_id,
            "Username": username,
        });
        let response: DeliveryResponse = self.call("ForgotPassword", &body).await?;
        Ok(response.code_delivery_details)
    }

    /// # Errors
    /// Returns the provider rejection (e.g. `InvalidPasswordException`) or a transport error.
    #[instrument(skip(self, code, new_password))]
    pub async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), IdpError> {
        let body = serde_json::json!({
            "ClientId": self.client_id,
            "Username": username,
            "ConfirmationCode": code,
            "Password": new_password,
        });
        let _: IgnoredAny = self.call("ConfirmForgotPassword", &body).await?;
        Ok(())
    }

    /// `GetUser` authorized by the caller's access token.
    ///
    /// # Errors
    /// Returns the provider rejection (expired or revoked token) or a transport error.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<UserProfile, IdpError> {
        let body = serde_json::json!({ "AccessToken": access_token });
        let response: GetUserResponse = self.call("GetUser", &body).await?;

        Ok(UserProfile {
            username: response.username,
            attributes: response
                .user_attributes
                .into_iter()
                .map(|attribute| (attribute.name, attribute.value))
                .collect(),
        })
    }
}

impl std::fmt::Debug for UserPoolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPoolClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn target(operation: &str) -> String {
        format!("{TARGET_PREFIX}.{operation}")
    }

    async fn client(server: &MockServer) -> Result<UserPoolClient> {
        Ok(UserPoolClient::new(
            Url::parse(&format!("{}/", server.uri()))?,
            "client-123".to_string(),
        )?)
    }

    #[test]
    fn region_is_derived_from_pool_id() {
        assert_eq!(region_from_user_pool_id("us-east-1_iVomSPj8O"), Some("us-east-1"));
        assert_eq!(
            region_from_user_pool_id("ap-southeast-2_abc123"),
            Some("ap-southeast-2")
        );
        assert_eq!(region_from_user_pool_id("pool"), None);
        assert_eq!(region_from_user_pool_id("us-east-1"), None);
    }

    #[test]
    fn default_endpoint_is_regional() -> Result<()> {
        let url = default_endpoint("eu-west-1_XyZ")?;
        assert_eq!(url.as_str(), "https://cognito-idp.eu-west-1.amazonaws.com/");
        Ok(())
    }

    #[test]
    fn bad_pool_id_is_a_configuration_error() {
        let err = default_endpoint("bogus").err();
        assert!(matches!(&err, Some(IdpError::InvalidUserPoolId(id)) if id == "bogus"));
        assert_eq!(err.and_then(|e| e.kind().map(str::to_string)), None);
    }

    #[tokio::test]
    async fn sign_in_returns_tokens() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", target("InitiateAuth").as_str()))
            .and(header("content-type", AMZ_JSON))
            .and(body_partial_json(json!({
                "AuthFlow": "USER_PASSWORD_AUTH",
                "ClientId": "client-123",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "pw"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "AuthenticationResult": {
                    "AccessToken": "access",
                    "IdToken": "identity",
                    "RefreshToken": "refresh",
                    "ExpiresIn": 3600,
                    "TokenType": "Bearer"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).await?.sign_in("alice", "pw").await?;
        match result {
            SignInResult::Authenticated(tokens) => {
                assert_eq!(tokens.access_token, "access");
                assert_eq!(tokens.id_token, "identity");
            }
            SignInResult::Challenge { name } => panic!("unexpected challenge {name}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_surfaces_challenges() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", target("InitiateAuth").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ChallengeName": "SOFTWARE_TOKEN_MFA",
                "Session": "opaque"
            })))
            .mount(&server)
            .await;

        let result = client(&server).await?.sign_in("alice", "pw").await?;
        assert!(matches!(
            result,
            SignInResult::Challenge { ref name } if name == "SOFTWARE_TOKEN_MFA"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn service_errors_are_normalized() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", target("InitiateAuth").as_str()))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazonaws.cognito#NotAuthorizedException",
                "message": "Incorrect username or password."
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await?
            .sign_in("alice", "wrong")
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
        assert_eq!(err.kind(), Some("NotAuthorizedException"));
        assert_eq!(err.user_message(), "Incorrect username or password.");
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_sends_email_attribute() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", target("SignUp").as_str()))
            .and(body_partial_json(json!({
                "Username": "bob",
                "UserAttributes": [{"Name": "email", "Value": "bob@example.com"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "UserConfirmed": false,
                "UserSub": "sub-1",
                "CodeDeliveryDetails": {
                    "Destination": "b***@e***.com",
                    "DeliveryMedium": "EMAIL",
                    "AttributeName": "email"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .await?
            .sign_up("bob", "Secret123!", "bob@example.com")
            .await?;
        assert!(!result.user_confirmed);
        assert_eq!(result.user_sub.as_deref(), Some("sub-1"));
        assert_eq!(
            result.delivery.and_then(|d| d.delivery_medium).as_deref(),
            Some("EMAIL")
        );
        Ok(())
    }

    #[tokio::test]
    async fn confirm_and_password_flows_accept_empty_bodies() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", target("ConfirmSignUp").as_str()))
            .and(body_partial_json(json!({"ConfirmationCode": "123456"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", target("ConfirmForgotPassword").as_str()))
            .and(body_partial_json(json!({"Password": "N3wSecret!"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await?;
        client.confirm_sign_up("bob", "123456").await?;
        client
            .confirm_forgot_password("bob", "654321", "N3wSecret!")
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn get_user_collects_attributes() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", target("GetUser").as_str()))
            .and(body_partial_json(json!({"AccessToken": "access"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Username": "bob",
                "UserAttributes": [
                    {"Name": "email", "Value": "bob@example.com"},
                    {"Name": "given_name", "Value": "Bob"}
                ]
            })))
            .mount(&server)
            .await;

        let profile = client(&server).await?.get_user("access").await?;
        assert_eq!(profile.username, "bob");
        assert_eq!(
            profile.attributes.get("email").map(String::as_str),
            Some("bob@example.com")
        );
        assert_eq!(
            profile.attributes.get("given_name").map(String::as_str),
            Some("Bob")
        );
        Ok(())
    }
}
