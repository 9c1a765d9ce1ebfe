//! LLM Provider支持模块

use serde_json::{Value, json};

use crate::{config::LLMProvider, error::AnalysisError};

/// 请求体与响应体的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// OpenAI Chat Completions 兼容格式，内容位于 `choices[0].message.content`
    ChatCompletions,
    /// 阿里云 DashScope 文本生成格式，内容位于 `output.choices[0].message.content`
    DashScope,
}

/// Provider描述，进程启动时即确定且不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: LLMProvider,
    pub display_name: &'static str,
    pub endpoint: &'static str,
    pub model: &'static str,
    /// 携带凭证的请求头名称
    pub credential_header: &'static str,
    pub wire_format: WireFormat,
}

static DOUBAO: ProviderDescriptor = ProviderDescriptor {
    id: LLMProvider::Doubao,
    display_name: "豆包 (Doubao)",
    endpoint: "https://ark.cn-beijing.volces.com/api/v3/chat/completions",
    model: "ep-20241211085953-dlmhz",
    credential_header: "Authorization",
    wire_format: WireFormat::ChatCompletions,
};

static DEEPSEEK: ProviderDescriptor = ProviderDescriptor {
    id: LLMProvider::DeepSeek,
    display_name: "DeepSeek",
    endpoint: "https://api.deepseek.com/v1/chat/completions",
    model: "deepseek-chat",
    credential_header: "Authorization",
    wire_format: WireFormat::ChatCompletions,
};

static OPENAI: ProviderDescriptor = ProviderDescriptor {
    id: LLMProvider::OpenAI,
    display_name: "ChatGPT (OpenAI)",
    endpoint: "https://api.openai.com/v1/chat/completions",
    model: "gpt-4o",
    credential_header: "Authorization",
    wire_format: WireFormat::ChatCompletions,
};

static TONGYI: ProviderDescriptor = ProviderDescriptor {
    id: LLMProvider::Tongyi,
    display_name: "通义 (Tongyi)",
    endpoint: "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
    model: "qwen-max",
    credential_header: "Authorization",
    wire_format: WireFormat::DashScope,
};

/// Provider注册表
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// 根据provider id查找描述，未知id返回 `UnknownProvider`
    pub fn resolve(provider_id: &str) -> Result<&'static ProviderDescriptor, AnalysisError> {
        LLMProvider::from_id(provider_id)
            .map(Self::get)
            .ok_or_else(|| AnalysisError::UnknownProvider(provider_id.to_string()))
    }

    /// 每个 `LLMProvider` 变体都恰好对应一个描述
    pub fn get(provider: LLMProvider) -> &'static ProviderDescriptor {
        match provider {
            LLMProvider::Doubao => &DOUBAO,
            LLMProvider::DeepSeek => &DEEPSEEK,
            LLMProvider::OpenAI => &OPENAI,
            LLMProvider::Tongyi => &TONGYI,
        }
    }

    /// 所有可选的Provider，用于供应商选择
    pub fn all() -> Vec<&'static ProviderDescriptor> {
        LLMProvider::ALL.into_iter().map(Self::get).collect()
    }
}

impl ProviderDescriptor {
    /// 构建请求体，纯函数
    pub fn build_request_body(&self, system_prompt: &str, user_prompt: &str) -> Value {
        let messages = json!([
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt }
        ]);

        match self.wire_format {
            WireFormat::ChatCompletions => json!({
                "model": self.model,
                "messages": messages
            }),
            WireFormat::DashScope => json!({
                "model": self.model,
                "input": { "messages": messages },
                "parameters": { "result_format": "message" }
            }),
        }
    }

    /// 从响应中提取生成的文本，路径不存在时返回空字符串
    pub fn extract_content(&self, response: &Value) -> String {
        let pointer = match self.wire_format {
            WireFormat::ChatCompletions => "/choices/0/message/content",
            WireFormat::DashScope => "/output/choices/0/message/content",
        };

        response
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// 凭证请求头的取值
    pub fn credential_value(&self, api_key: &str) -> String {
        format!("Bearer {}", api_key)
    }
}
