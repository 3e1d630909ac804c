//! HTTP collaborator for the chat API.
//!
//! A thin reqwest wrapper over the four chat endpoints. The raw bearer token
//! goes out with every request. The server revalidates it each time; the
//! client never acts on locally decoded claims.

use haggle_proto::{
    model::Chat,
    rest::{ChatList, CreateChat},
};
use thiserror::Error;

/// REST errors.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport-level failure (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered outside the 2xx range.
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Endpoint path that failed.
        endpoint: String,
    },
}

/// Client for the chat REST endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    /// Create a client for `base_url` (origin, no trailing slash) using the
    /// given bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// `GET /api/chat`: every conversation plus the total unread badge.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] on transport failure or a non-2xx status.
    pub async fn list_chats(&self) -> Result<ChatList, RestError> {
        let endpoint = "/api/chat";
        let response = self
            .http
            .get(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&response, endpoint)?;
        Ok(response.json().await?)
    }

    /// `GET /api/chat/:id`: a single conversation (degraded-mode polling).
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] on transport failure or a non-2xx status.
    pub async fn fetch_chat(&self, chat_id: &str) -> Result<Chat, RestError> {
        let endpoint = format!("/api/chat/{chat_id}");
        let response = self
            .http
            .get(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&response, &endpoint)?;
        Ok(response.json().await?)
    }

    /// `PUT /api/chat/:id/read`: persist a read receipt.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] on transport failure or a non-2xx status.
    pub async fn mark_read(&self, chat_id: &str) -> Result<(), RestError> {
        let endpoint = format!("/api/chat/{chat_id}/read");
        let response = self
            .http
            .put(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&response, &endpoint)
    }

    /// `POST /api/chat`: create or find the thread for a product.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] on transport failure or a non-2xx status.
    pub async fn create_chat(&self, product_id: &str) -> Result<Chat, RestError> {
        let endpoint = "/api/chat";
        let response = self
            .http
            .post(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .json(&CreateChat { product_id: product_id.to_owned() })
            .send()
            .await?;
        Self::check(&response, endpoint)?;
        Ok(response.json().await?)
    }

    fn check(response: &reqwest::Response, endpoint: &str) -> Result<(), RestError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RestError::Status { status: status.as_u16(), endpoint: endpoint.to_owned() })
        }
    }
}
