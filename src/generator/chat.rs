//! 分析完成后的追问对话

use chrono::Utc;
use tracing::debug;

use crate::error::AnalysisError;
use crate::generator::orchestrator::StagedOrchestrator;
use crate::generator::prompts::chat_prompt;
use crate::types::{ChatMessage, ChatRole};

/// 截取文档开头作为对话上下文，被截断时以省略号结尾
fn document_excerpt(document_text: &str, max_chars: usize) -> String {
    match document_text.char_indices().nth(max_chars) {
        Some((offset, _)) => format!("{}...", &document_text[..offset]),
        None => document_text.to_string(),
    }
}

/// 追问助手，持有只追加的对话记录
#[derive(Debug, Default, Clone)]
pub struct ChatAssistant {
    log: Vec<ChatMessage>,
}

impl ChatAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.log
    }

    /// 下一条消息的时间戳，保证严格递增
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        match self.log.last() {
            Some(last) if last.timestamp >= now => last.timestamp + 1,
            _ => now,
        }
    }

    /// 发送一条追问，成功时依次追加用户消息与回答
    ///
    /// 需要已有企业信息且至少完成一个阶段。调用失败时对话记录保持不变。
    pub async fn send_message(
        &mut self,
        orchestrator: &StagedOrchestrator,
        text: &str,
    ) -> Result<String, AnalysisError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(AnalysisError::MissingParameters("问题内容".to_string()));
        }

        let (provider_id, api_key) = orchestrator.credentials()?;
        let profile = orchestrator
            .company_profile()
            .ok_or(AnalysisError::NoAnalysisAvailable)?;
        if orchestrator.state().completed_stages.is_empty() {
            return Err(AnalysisError::NoAnalysisAvailable);
        }
        let combined = orchestrator
            .combined_results()
            .ok_or(AnalysisError::NoAnalysisAvailable)?;

        let excerpt = document_excerpt(
            orchestrator.document_text().unwrap_or_default(),
            orchestrator.budget().chat_chars,
        );
        let prompt = chat_prompt(profile, &combined, &excerpt, &self.log, question);

        debug!(history = self.log.len(), "sending chat message");
        let answer = orchestrator
            .client()
            .call(
                provider_id,
                api_key,
                &prompt.system_prompt,
                &prompt.user_prompt,
                Some(orchestrator.llm_config().chat_timeout_ms),
                None,
            )
            .await?;

        let user_timestamp = self.next_timestamp();
        self.log.push(ChatMessage {
            role: ChatRole::User,
            content: question.to_string(),
            timestamp: user_timestamp,
        });
        let assistant_timestamp = self.next_timestamp();
        self.log.push(ChatMessage {
            role: ChatRole::Assistant,
            content: answer.clone(),
            timestamp: assistant_timestamp,
        });

        Ok(answer)
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}
