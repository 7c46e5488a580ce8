//! HTTP JSON-RPC transport backed by `reqwest`.
//!
//! One POST per request with a client-wide timeout. A timeout surfaces as
//! `TransportError::Timeout`; callers decide whether to try again.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::RpcTransport;

pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
            timeout,
        })
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            TransportError::Malformed(e.to_string())
        } else {
            TransportError::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(method = %req.method, url = %self.url, "sending request");
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited {
                url: self.url.clone(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Unreachable(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| self.map_error(e))
    }

    fn url(&self) -> &str {
        &self.url
    }
}
