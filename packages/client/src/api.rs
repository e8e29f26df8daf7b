//! REST calls used by the client.
//!
//! Chat sends go over REST so the caller gets the persisted message (and a
//! clear failure) back; the hub's `chat:new` echo is reconciled separately.

use porchlight_server::infrastructure::dto::{
    http::{ApiResponse, SendMessageRequest},
    websocket::ChatMessageDto,
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
    code: String,
}

#[derive(Debug, Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ChatApi {
    /// `base_url` is the hub root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// `POST /api/chat/{booking_id}`
    pub async fn send_message(
        &self,
        booking_id: &str,
        text: &str,
        client_key: &str,
    ) -> Result<ChatMessageDto, ClientError> {
        let body = SendMessageRequest {
            message: Some(text.to_string()),
            client_key: Some(client_key.to_string()),
            ..Default::default()
        };
        let response = self
            .http
            .post(format!("{}/api/chat/{}", self.base_url, booking_id))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    /// `GET /api/chat/{booking_id}`, oldest first
    pub async fn history(&self, booking_id: &str) -> Result<Vec<ChatMessageDto>, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/chat/{}", self.base_url, booking_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            let envelope: ApiResponse<T> = response.json().await?;
            return Ok(envelope.data);
        }
        let status = status.as_u16();
        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => Err(ClientError::Rejected {
                status,
                code: envelope.code,
                message: envelope.error,
            }),
            Err(_) => Err(ClientError::Rejected {
                status,
                code: "UNKNOWN".to_string(),
                message: format!("unexpected response with status {}", status),
            }),
        }
    }
}
