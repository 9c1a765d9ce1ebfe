//! 测试用的脚本化传输层，按顺序返回预设响应并记录收到的请求

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::transport::{InboundResponse, LlmTransport, OutboundRequest};
use crate::error::AnalysisError;

pub(crate) enum Scripted {
    /// 以Chat Completions格式返回的模型文本
    Content(String),
    /// 原样返回的2xx响应体
    Raw(String),
    /// 指定状态码与响应体
    Status(u16, String),
    /// 永不返回，用于触发超时
    Hang,
    NetworkError(String),
}

impl Scripted {
    pub(crate) fn content(text: impl Into<String>) -> Self {
        Scripted::Content(text.into())
    }
}

pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn post(&self, request: OutboundRequest) -> Result<InboundResponse, AnalysisError> {
        self.requests.lock().unwrap().push(request);
        let step = self.script.lock().unwrap().pop_front();

        match step {
            Some(Scripted::Content(text)) => Ok(InboundResponse {
                status: 200,
                body: json!({"choices": [{"message": {"content": text}}]}).to_string(),
            }),
            Some(Scripted::Raw(body)) => Ok(InboundResponse { status: 200, body }),
            Some(Scripted::Status(status, body)) => Ok(InboundResponse { status, body }),
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::NetworkError(message)) => Err(AnalysisError::Transport(message)),
            None => Err(AnalysisError::Transport("script exhausted".to_string())),
        }
    }
}
