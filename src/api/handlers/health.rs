use super::federated::FederationState;
use crate::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    identity_provider: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Service is up", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(
    method: Method,
    federation: Extension<Arc<FederationState>>,
) -> impl IntoResponse {
    // Only the configured provider host is reported; the provider itself is not probed.
    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        identity_provider: federation
            .config()
            .base_url()
            .host_str()
            .unwrap_or_default()
            .to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    (StatusCode::OK, headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::federated::FederationConfig;
    use anyhow::Result;
    use axum::body::to_bytes;

    fn federation() -> Result<Arc<FederationState>> {
        let config = FederationConfig::new(
            "tenant.auth.eu-west-1.amazoncognito.com",
            "client".to_string(),
            "https://app.example.com/callback".to_string(),
        )?;
        Ok(Arc::new(FederationState::new(config, 3600)?))
    }

    #[tokio::test]
    async fn get_reports_identity_provider() -> Result<()> {
        let response = health(Method::GET, Extension(federation()?))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(
            value.get("identity_provider").and_then(|v| v.as_str()),
            Some("tenant.auth.eu-west-1.amazoncognito.com")
        );
        assert_eq!(
            value.get("name").and_then(|v| v.as_str()),
            Some(env!("CARGO_PKG_NAME"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn options_has_empty_body() -> Result<()> {
        let response = health(Method::OPTIONS, Extension(federation()?))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(body.is_empty());
        Ok(())
    }
}
