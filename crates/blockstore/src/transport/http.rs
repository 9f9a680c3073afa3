//! HTTP/JSON gateway transport.
//!
//! Translates a method into a gateway path, POSTs the request as protobuf JSON and decodes
//! either the reply or the gateway's `{"message": ...}` error envelope. No retries and no
//! timeouts; dropping the returned future aborts the request.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use super::http_route;
use crate::error::{BlockStoreError, Result};
use crate::proto::{ErrorMessage, WireMessage};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Transport rooted at `base_url` (gateway paths are appended to it).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BlockStoreError::Connection(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn invoke<Req, Rep>(&self, method: &str, request: &Req) -> Result<Rep>
    where
        Req: WireMessage,
        Rep: WireMessage,
    {
        let path = http_route(method)
            .ok_or_else(|| BlockStoreError::UnsupportedMethod(method.to_string()))?;
        let body =
            serde_json::to_vec(request).map_err(|e| BlockStoreError::Encode(e.to_string()))?;
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method, %url, "http invoke");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(remote_error(&url, status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| {
            BlockStoreError::Decode(format!("{} reply from {}: {}", method, url, e))
        })
    }
}

/// Error for a non-200 reply: the envelope's message if there is one, otherwise status and raw body.
fn remote_error(url: &str, status: StatusCode, body: &[u8]) -> BlockStoreError {
    match serde_json::from_slice::<ErrorMessage>(body) {
        Ok(envelope) => BlockStoreError::Remote(envelope.message),
        Err(_) => BlockStoreError::Remote(format!(
            "http request to {} failed with {}: {}",
            url,
            status,
            String::from_utf8_lossy(body)
        )),
    }
}
