//! 模型输出的JSON解析，解析失败时请模型修复一次

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::llm::client::{CallProgress, LLMClient, ProgressSink, notify};

/// 匹配 ```json ... ``` 或 ``` ... ``` 包裹的JSON对象
static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("fenced json pattern is valid")
});

const REPAIR_SYSTEM_PROMPT: &str =
    "你是一个JSON格式修复函数。只输出合法的JSON，不要添加任何其他文字。";

/// 从模型输出中解析JSON对象
///
/// 先查找Markdown代码块中的JSON，找不到时把整段文本当作JSON解析。
/// 结果必须是JSON对象。
pub fn extract_json_object(raw_text: &str) -> Result<Map<String, Value>, String> {
    let candidate = match FENCED_JSON.captures(raw_text) {
        Some(captures) => captures.get(1).map_or("", |m| m.as_str()),
        None => raw_text.trim(),
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("期望JSON对象，实际为 {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布尔值",
        Value::Number(_) => "数字",
        Value::String(_) => "字符串",
        Value::Array(_) => "数组",
        Value::Object(_) => "对象",
    }
}

/// 修复请求的用户提示词，原样附上解析失败的文本
pub fn repair_user_prompt(raw_text: &str) -> String {
    format!(
        "以下文本应该是一个JSON对象，但解析失败了。请只输出修复后的合法JSON，不要添加任何解释：\n\n{}",
        raw_text
    )
}

/// 模型输出解析器
///
/// 修复最多进行一次：修复后的输出仍无法解析时直接返回 `JsonRepairFailed`。
pub struct ResponseParser<'a> {
    client: &'a LLMClient,
    timeout_ms: Option<u64>,
    on_progress: Option<&'a ProgressSink>,
}

impl<'a> ResponseParser<'a> {
    pub fn new(client: &'a LLMClient) -> Self {
        Self {
            client,
            timeout_ms: None,
            on_progress: None,
        }
    }

    /// 修复请求使用的超时，未设置时使用客户端默认值
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_progress(mut self, on_progress: Option<&'a ProgressSink>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub async fn parse_json(
        &self,
        provider_id: &str,
        api_key: &str,
        raw_text: &str,
    ) -> Result<Map<String, Value>, AnalysisError> {
        notify(self.on_progress, CallProgress::ParsingResponse);

        let first_error = match extract_json_object(raw_text) {
            Ok(object) => return Ok(object),
            Err(e) => e,
        };

        warn!(error = %first_error, raw_chars = raw_text.chars().count(), "model output is not valid JSON, requesting repair");
        notify(self.on_progress, CallProgress::RepairingJson);

        let repaired = self
            .client
            .call(
                provider_id,
                api_key,
                REPAIR_SYSTEM_PROMPT,
                &repair_user_prompt(raw_text),
                self.timeout_ms,
                self.on_progress,
            )
            .await?;

        match extract_json_object(&repaired) {
            Ok(object) => {
                debug!("repaired JSON parsed successfully");
                Ok(object)
            }
            Err(cause) => Err(AnalysisError::JsonRepairFailed {
                original: raw_text.to_string(),
                repaired,
                cause,
            }),
        }
    }
}
