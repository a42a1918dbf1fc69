//! REST-backed result store.
//!
//! Talks to any durable record store exposing the per-user endpoints
//! described in the trait docs. Failures are classified into
//! `StoreError` variants so the coordinator can make retry decisions
//! without string matching.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use examkit_core::error::StoreError;
use examkit_core::history::HistoryRecord;
use examkit_core::model::{RotationState, Tier, UserId};
use examkit_core::traits::ResultStore;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A `ResultStore` over HTTP.
pub struct RestStore {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                StoreError::Network(e.to_string())
            }
        })?;
        Ok(response)
    }

    /// Classify a non-success response. The caller has already handled
    /// any status it treats specially (e.g. 404 on a rotation read).
    async fn fail(&self, response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StoreError::AuthenticationFailed(body)
            }
            StatusCode::NOT_FOUND => StoreError::NotFound(body),
            _ => {
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                StoreError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ApiError {
    error: String,
}

#[async_trait]
impl ResultStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self), fields(user = %user, tier = %tier))]
    async fn get_rotation(
        &self,
        user: &UserId,
        tier: Tier,
    ) -> Result<Option<RotationState>, StoreError> {
        let path = format!("/users/{user}/rotation/{tier}");
        let response = self.send(self.request(Method::GET, &path)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        Ok(Some(self.decode(response).await?))
    }

    #[instrument(skip(self, state), fields(user = %user, tier = %tier))]
    async fn put_rotation(
        &self,
        user: &UserId,
        tier: Tier,
        state: &RotationState,
    ) -> Result<(), StoreError> {
        let path = format!("/users/{user}/rotation/{tier}");
        let response = self
            .send(self.request(Method::PUT, &path).json(state))
            .await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self, record), fields(user = %record.user))]
    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let path = format!("/users/{}/history", record.user);
        let response = self
            .send(self.request(Method::POST, &path).json(record))
            .await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn list_history(&self, user: &UserId) -> Result<Vec<HistoryRecord>, StoreError> {
        let path = format!("/users/{user}/history");
        let response = self.send(self.request(Method::GET, &path)).await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        self.decode(response).await
    }

    #[instrument(skip(self), fields(user = %user, id = %id))]
    async fn delete_history(&self, user: &UserId, id: Uuid) -> Result<(), StoreError> {
        let path = format!("/users/{user}/history/{id}");
        let response = self.send(self.request(Method::DELETE, &path)).await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn add_favorite(&self, user: &UserId, question_id: &str) -> Result<(), StoreError> {
        let path = format!("/users/{user}/favorites/{question_id}");
        let response = self.send(self.request(Method::PUT, &path)).await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn remove_favorite(
        &self,
        user: &UserId,
        question_id: &str,
    ) -> Result<(), StoreError> {
        let path = format!("/users/{user}/favorites/{question_id}");
        let response = self.send(self.request(Method::DELETE, &path)).await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn list_favorites(&self, user: &UserId) -> Result<Vec<String>, StoreError> {
        let path = format!("/users/{user}/favorites");
        let response = self.send(self.request(Method::GET, &path)).await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        self.decode(response).await
    }
}
