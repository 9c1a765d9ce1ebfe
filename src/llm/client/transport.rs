//! HTTP传输层，可直连Provider，也可经由中转代理

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::{config::RelayConfig, error::AnalysisError};

/// 发往Provider的请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Provider返回的原始响应
#[derive(Debug, Clone, PartialEq)]
pub struct InboundResponse {
    pub status: u16,
    pub body: String,
}

impl InboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 发送一次POST请求，不做重试，不处理超时（超时由调用方负责）
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn post(&self, request: OutboundRequest) -> Result<InboundResponse, AnalysisError>;
}

/// 中转代理的请求格式：`{ url, headers, body }`
#[derive(Serialize)]
struct RelayEnvelope<'a> {
    url: &'a str,
    headers: &'a BTreeMap<String, String>,
    body: &'a Value,
}

/// 基于reqwest的传输实现
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    relay_url: Option<String>,
}

impl HttpTransport {
    /// 直连Provider
    pub fn direct() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            relay_url: None,
        })
    }

    /// 经由中转代理转发，代理原样返回Provider的状态码与响应体
    pub fn relayed(relay_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            relay_url: Some(relay_url.into()),
        })
    }

    pub fn from_config(relay: &RelayConfig) -> Result<Self> {
        if relay.enabled {
            Self::relayed(relay.url.clone())
        } else {
            Self::direct()
        }
    }

    pub fn is_relayed(&self) -> bool {
        self.relay_url.is_some()
    }
}

#[async_trait]
impl LlmTransport for HttpTransport {
    async fn post(&self, request: OutboundRequest) -> Result<InboundResponse, AnalysisError> {
        let builder = match &self.relay_url {
            Some(relay_url) => {
                debug!(relay = %relay_url, target = %request.url, "forwarding through relay");
                self.client.post(relay_url).json(&RelayEnvelope {
                    url: &request.url,
                    headers: &request.headers,
                    body: &request.body,
                })
            }
            None => {
                let mut builder = self.client.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.json(&request.body)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        Ok(InboundResponse { status, body })
    }
}
