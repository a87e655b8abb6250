//! REST collaborator port

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RepoResult;
use crate::error::DomainError;

/// HTTP verbs the core issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completed HTTP exchange: `{status, body, error}`
///
/// A non-2xx status is not an `Err`; callers inspect it and decide.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
    pub error: Option<String>,
}

impl RestResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            error: None,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body of a successful response
    pub fn json<T: DeserializeOwned>(&self) -> RepoResult<T> {
        if !self.is_success() {
            return Err(self.to_error());
        }
        serde_json::from_str(&self.body).map_err(DomainError::from)
    }

    /// Turn a failed response into an error carrying status and message
    pub fn to_error(&self) -> DomainError {
        DomainError::Http {
            status: self.status,
            message: self
                .error
                .clone()
                .unwrap_or_else(|| self.body.chars().take(200).collect()),
        }
    }
}

/// Authenticated REST layer. Paths are relative to the API base URL.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Perform a request. Transport failures are `Err`; HTTP failures are
    /// reported through [`RestResponse::status`].
    async fn request(
        &self,
        method: RestMethod,
        path: &str,
        body: Option<Value>,
    ) -> RepoResult<RestResponse>;

    async fn get(&self, path: &str) -> RepoResult<RestResponse> {
        self.request(RestMethod::Get, path, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> RepoResult<RestResponse> {
        self.request(RestMethod::Post, path, body).await
    }

    async fn put(&self, path: &str, body: Option<Value>) -> RepoResult<RestResponse> {
        self.request(RestMethod::Put, path, body).await
    }

    async fn patch(&self, path: &str, body: Option<Value>) -> RepoResult<RestResponse> {
        self.request(RestMethod::Patch, path, body).await
    }

    async fn delete(&self, path: &str) -> RepoResult<RestResponse> {
        self.request(RestMethod::Delete, path, None).await
    }
}
