// @awa-component: CAP-ApiClient
//
//! Capability API client.
//!
//! Thin typed wrapper over the external request/response API that owns
//! persistence and test execution. One request per call, no retries.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ApiConfig;
use crate::models::capability::{Capability, TestExecutionRequest, TestExecutionResponse};

/// Errors from the capability API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Client for `capability/...` endpoints.
#[derive(Debug, Clone)]
pub struct CapabilityClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl CapabilityClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Build on an existing `reqwest` client (shared pool, custom timeouts).
    pub fn with_client(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{path}", self.base_url);
        tracing::info!(%method, %url, "capability api request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `GET capability/{id}`
    pub async fn get_capability(&self, id: &str) -> Result<Capability, ApiError> {
        let resp = self
            .request(Method::GET, &format!("capability/{id}"))
            .send()
            .await?;
        read_json(resp).await
    }

    /// `PUT capability/{id}`. Replaces the capability wholesale.
    pub async fn update_capability(
        &self,
        id: &str,
        capability: &Capability,
    ) -> Result<Capability, ApiError> {
        let resp = self
            .request(Method::PUT, &format!("capability/{id}"))
            .json(capability)
            .send()
            .await?;
        read_json(resp).await
    }

    /// `POST capability/{id}/test` with collected params.
    pub async fn test_capability(
        &self,
        id: &str,
        params: &Map<String, Value>,
    ) -> Result<TestExecutionResponse, ApiError> {
        let resp = self
            .request(Method::POST, &format!("capability/{id}/test"))
            .json(&TestExecutionRequest {
                params: params.clone(),
            })
            .send()
            .await?;
        read_json(resp).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        tracing::warn!(status = status.as_u16(), "capability api error");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}
