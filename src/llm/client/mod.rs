//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{config::LLMProvider, error::AnalysisError};

pub mod providers;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use providers::{ProviderDescriptor, ProviderRegistry, WireFormat};
pub use transport::{HttpTransport, InboundResponse, LlmTransport, OutboundRequest};

/// 未指定超时时的默认值（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// 单次调用过程中可观察到的粗粒度进度
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallProgress {
    /// 正在调用Provider接口
    CallingApi { provider: LLMProvider },
    /// 正在解析模型输出
    ParsingResponse,
    /// 模型输出不是合法JSON，正在请求模型修复
    RepairingJson,
}

pub type ProgressSink = Arc<dyn Fn(CallProgress) + Send + Sync>;

pub(crate) fn notify(sink: Option<&ProgressSink>, progress: CallProgress) {
    if let Some(sink) = sink {
        sink(progress);
    }
}

/// 超时计时器，是触发取消的唯一来源；离开作用域时计时器随之清除
struct TimeoutTimer {
    handle: JoinHandle<()>,
}

impl TimeoutTimer {
    fn start(token: CancellationToken, timeout: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        });
        Self { handle }
    }
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    transport: Arc<dyn LlmTransport>,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(relay: &crate::config::RelayConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(relay)?;
        debug!(relayed = transport.is_relayed(), "LLM transport ready");
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// 使用指定的传输层创建客户端
    pub fn with_transport(transport: Arc<dyn LlmTransport>) -> Self {
        Self { transport }
    }

    /// 调用一次模型，返回生成的纯文本
    ///
    /// 只发出一次HTTP请求，不做任何重试。超过 `timeout_ms` 未返回时中止请求并返回
    /// `Timeout`；非2xx返回 `ProviderHttp`；响应中取不到内容返回 `EmptyContent`。
    pub async fn call(
        &self,
        provider_id: &str,
        api_key: &str,
        system_prompt: &str,
        user_prompt: &str,
        timeout_ms: Option<u64>,
        on_progress: Option<&ProgressSink>,
    ) -> Result<String, AnalysisError> {
        let provider = ProviderRegistry::resolve(provider_id)?;
        let timeout_ms = timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            provider.credential_header.to_string(),
            provider.credential_value(api_key),
        );

        let request = OutboundRequest {
            url: provider.endpoint.to_string(),
            headers,
            body: provider.build_request_body(system_prompt, user_prompt),
        };

        notify(on_progress, CallProgress::CallingApi { provider: provider.id });
        debug!(
            provider = %provider.id,
            timeout_ms,
            prompt_chars = system_prompt.chars().count() + user_prompt.chars().count(),
            "calling LLM provider"
        );

        let response = self.post_with_timeout(request, timeout_ms).await?;

        if !response.is_success() {
            return Err(AnalysisError::ProviderHttp {
                status: response.status,
                body: response.body,
            });
        }

        let payload: Value = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(provider = %provider.id, error = %e, "provider returned a non-JSON body");
                return Err(AnalysisError::EmptyContent);
            }
        };

        let content = provider.extract_content(&payload);
        if content.is_empty() {
            return Err(AnalysisError::EmptyContent);
        }

        debug!(provider = %provider.id, content_chars = content.chars().count(), "LLM call succeeded");
        Ok(content)
    }

    async fn post_with_timeout(
        &self,
        request: OutboundRequest,
        timeout_ms: u64,
    ) -> Result<InboundResponse, AnalysisError> {
        let token = CancellationToken::new();
        let timer = TimeoutTimer::start(token.clone(), Duration::from_millis(timeout_ms));

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(AnalysisError::Timeout { timeout_ms }),
            result = self.transport.post(request) => result,
        };

        drop(timer);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Scripted, ScriptedTransport};
    use super::*;
    use std::sync::Mutex;

    fn client(transport: &Arc<ScriptedTransport>) -> LLMClient {
        LLMClient::with_transport(transport.clone())
    }

    #[tokio::test]
    async fn test_call_returns_extracted_content() {
        let transport = ScriptedTransport::new(vec![Scripted::content("你好")]);

        let text = client(&transport)
            .call("deepseek", "test", "sys", "usr", None, None)
            .await
            .unwrap();

        assert_eq!(text, "你好");
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.deepseek.com/v1/chat/completions");
        assert_eq!(requests[0].headers["Authorization"], "Bearer test");
        assert_eq!(requests[0].body["messages"][1]["content"], "usr");
    }

    #[tokio::test]
    async fn test_unknown_provider_makes_no_request() {
        let transport = ScriptedTransport::new(vec![]);

        let err = client(&transport)
            .call("gemini", "test", "sys", "usr", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::UnknownProvider(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_provider_error() {
        let transport = ScriptedTransport::new(vec![Scripted::Status(
            401,
            r#"{"error":"invalid api key"}"#.to_string(),
        )]);

        let err = client(&transport)
            .call("openai", "bad", "sys", "usr", None, None)
            .await
            .unwrap_err();

        match err {
            AnalysisError::ProviderHttp { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_path_is_empty_content() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Raw(r#"{"choices": []}"#.to_string()),
            Scripted::content(""),
            Scripted::Raw("<html>gateway</html>".to_string()),
        ]);
        let client = client(&transport);

        for _ in 0..3 {
            let err = client
                .call("deepseek", "test", "sys", "usr", None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AnalysisError::EmptyContent));
        }
    }

    #[tokio::test]
    async fn test_dashscope_response_is_extracted() {
        let transport = ScriptedTransport::new(vec![Scripted::Raw(
            r#"{"output":{"choices":[{"message":{"content":"通义回答"}}]}}"#.to_string(),
        )]);

        let text = client(&transport)
            .call("tongyi", "test", "sys", "usr", None, None)
            .await
            .unwrap();

        assert_eq!(text, "通义回答");
        assert_eq!(transport.requests()[0].body["parameters"]["result_format"], "message");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_times_out_with_configured_value() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang]);

        let err = client(&transport)
            .call("deepseek", "test", "sys", "usr", Some(5_000), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Timeout { timeout_ms: 5_000 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang]);

        let err = client(&transport)
            .call("deepseek", "test", "sys", "usr", None, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Timeout { timeout_ms: DEFAULT_TIMEOUT_MS }
        ));
    }

    #[tokio::test]
    async fn test_network_failure_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Scripted::NetworkError("connection refused".to_string()),
            Scripted::content("never reached"),
        ]);

        let err = client(&transport)
            .call("deepseek", "test", "sys", "usr", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Transport(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_reports_calling_api() {
        let transport = ScriptedTransport::new(vec![Scripted::content("ok")]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink: ProgressSink = {
            let seen = seen.clone();
            Arc::new(move |progress: CallProgress| seen.lock().unwrap().push(progress))
        };

        client(&transport)
            .call("doubao", "test", "sys", "usr", None, Some(&sink))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CallProgress::CallingApi {
                provider: LLMProvider::Doubao
            }]
        );
    }
}
