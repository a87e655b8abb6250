//! HTTPS implementation of the REST port

use std::time::Duration;

use async_trait::async_trait;
use bot_common::DiscordConfig;
use bot_core::{DomainError, RepoResult, RestClient, RestMethod, RestResponse};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::Value;

/// Authenticated client for the platform's REST API
#[derive(Debug, Clone)]
pub struct HttpRestClient {
    client: Client,
    base_url: String,
}

impl HttpRestClient {
    pub fn new(
        base_url: impl Into<String>,
        token: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> RepoResult<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| DomainError::Transport(format!("invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| DomainError::Transport(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &DiscordConfig) -> RepoResult<Self> {
        Self::new(
            config.api_base_url.clone(),
            &config.token,
            &config.user_agent,
            config.rest_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

fn to_method(method: RestMethod) -> Method {
    match method {
        RestMethod::Get => Method::GET,
        RestMethod::Post => Method::POST,
        RestMethod::Put => Method::PUT,
        RestMethod::Patch => Method::PATCH,
        RestMethod::Delete => Method::DELETE,
    }
}

/// Pull `message` out of an error body, if it has one
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn request(
        &self,
        method: RestMethod,
        path: &str,
        body: Option<Value>,
    ) -> RepoResult<RestResponse> {
        let mut request = self.client.request(to_method(method), self.url(path));
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "REST request failed");
            DomainError::Transport(e.to_string())
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        let error = if status.is_success() {
            None
        } else {
            let message = error_message(&text)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            tracing::warn!(method = %method, path, status = status.as_u16(), message = %message, "REST request rejected");
            Some(message)
        };
        tracing::trace!(method = %method, path, status = status.as_u16(), "REST request done");

        Ok(RestResponse {
            status: status.as_u16(),
            body: text,
            error,
        })
    }
}
