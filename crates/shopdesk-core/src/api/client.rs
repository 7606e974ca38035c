//! API client for the shopdesk REST API.
//!
//! This module provides the `ApiClient` struct for making API requests.
//! Every call is bracketed by a progress indicator start/finish pair and
//! carries the process-wide default headers (including the bearer token
//! the session store installs).

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::auth::User;

use super::progress::{ProgressGuard, ProgressIndicator};
use super::{ApiError, Resource};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const VERIFY_PATH: &str = "/auth/verify";

/// Successful authentication payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    /// Absolute expiry in epoch milliseconds, when the server issues one.
    #[serde(rename = "expirationTime", default)]
    pub expiration_time: Option<i64>,
}

/// Registration / verification payload. Token and user are only present
/// when the server signs the account in straight away.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(rename = "expirationTime", default)]
    pub expiration_time: Option<i64>,
}

impl AccountResponse {
    /// Split into an `AuthResponse` if the server issued a token.
    pub fn into_auth(self) -> Option<AuthResponse> {
        match (self.token, self.user) {
            (Some(token), Some(user)) => Some(AuthResponse {
                token,
                user,
                expiration_time: self.expiration_time,
            }),
            _ => None,
        }
    }
}

/// Sign-up details.
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
    code: &'a str,
}

/// API client for the dashboard backend.
/// Clone is cheap - clones share the connection pool, default headers and
/// progress indicator.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    default_headers: Arc<RwLock<header::HeaderMap>>,
    progress: Arc<dyn ProgressIndicator>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, progress: Arc<dyn ProgressIndicator>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: Arc::new(RwLock::new(headers)),
            progress,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== Default Headers =====

    /// Set a header sent with every subsequent request from any clone.
    pub fn set_default_header(
        &self,
        name: header::HeaderName,
        value: &str,
    ) -> Result<(), ApiError> {
        let value = header::HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        let mut headers = self
            .default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.insert(name, value);
        Ok(())
    }

    pub fn remove_default_header(&self, name: &header::HeaderName) {
        let mut headers = self
            .default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.remove(name);
    }

    /// Set the bearer token for authenticated requests
    pub fn set_bearer(&self, token: &str) -> Result<(), ApiError> {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        let mut headers = self
            .default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    pub fn clear_bearer(&self) {
        self.remove_default_header(&header::AUTHORIZATION);
    }

    pub fn has_bearer(&self) -> bool {
        self.default_headers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(header::AUTHORIZATION)
    }

    fn default_headers(&self) -> header::HeaderMap {
        self.default_headers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ===== Request Plumbing =====

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, body))
        }
    }

    /// Send a request and decode its JSON body. An empty body decodes as
    /// JSON `null`, so `()` and `Option<_>` work for bodiless responses.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let _progress = ProgressGuard::begin(self.progress.clone());

        let response = builder.headers(self.default_headers()).send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        debug!(%method, path, bytes = text.len(), "API call succeeded");

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.client.get(self.url(path));
        self.send(Method::GET, path, builder).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.client.post(self.url(path)).json(body);
        self.send(Method::POST, path, builder).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.client.put(self.url(path)).json(body);
        self.send(Method::PUT, path, builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.client.delete(self.url(path));
        self.send(Method::DELETE, path, builder).await
    }

    // ===== Authentication =====

    /// Exchange credentials for a token and identity.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.post(LOGIN_PATH, &LoginRequest { email, password }).await
    }

    pub async fn register(&self, account: &NewAccount) -> Result<AccountResponse, ApiError> {
        self.post(REGISTER_PATH, account).await
    }

    /// Confirm a registration with the emailed code.
    pub async fn verify(&self, email: &str, code: &str) -> Result<AccountResponse, ApiError> {
        self.post(VERIFY_PATH, &VerifyRequest { email, code }).await
    }

    // ===== Resources =====

    pub async fn fetch_list<T: DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>, ApiError> {
        self.get(&resource.path()).await
    }

    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        body: &B,
    ) -> Result<T, ApiError> {
        self.post(&resource.path(), body).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.put(&resource.item_path(id), body).await
    }

    pub async fn remove(&self, resource: Resource, id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.delete(&resource.item_path(id)).await?;
        Ok(())
    }
}
