use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// 对话历史中使用的称呼
    pub fn speaker(&self) -> &'static str {
        match self {
            ChatRole::User => "用户",
            ChatRole::Assistant => "AI",
        }
    }
}

/// 对话消息，timestamp 为毫秒时间戳，同一会话内严格递增
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: i64,
}
