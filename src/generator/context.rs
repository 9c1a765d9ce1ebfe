use anyhow::Result;

use crate::{
    config::Config,
    generator::orchestrator::StagedOrchestrator,
    llm::client::LLMClient,
};

#[derive(Clone)]
pub struct GeneratorContext {
    /// LLM调用器，用于与AI通信。
    pub llm_client: LLMClient,
    /// 配置
    pub config: Config,
}

impl GeneratorContext {
    /// 创建新的生成器上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(&config.relay)?;
        Ok(Self::with_client(config, llm_client))
    }

    /// 使用指定的LLM客户端创建上下文
    pub fn with_client(config: Config, llm_client: LLMClient) -> Self {
        Self { llm_client, config }
    }

    /// 按配置创建一个新的分阶段编排器
    pub fn orchestrator(&self) -> StagedOrchestrator {
        StagedOrchestrator::from_config(self.llm_client.clone(), &self.config)
    }
}
