use crate::config::{Config, LLMProvider};
use crate::error::AnalysisError;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// BP Analyzer - 由大模型驱动的商业计划书分阶段分析工具
#[derive(Parser, Debug)]
#[command(name = "bp-analyzer")]
#[command(
    about = "Staged LLM analysis of investment pitch documents: extracts a company profile, then runs four analysis stages and answers follow-up questions."
)]
#[command(version)]
pub struct Args {
    /// 已提取为纯文本的BP文档路径（.txt / .md）
    #[arg(short, long)]
    pub document: Option<PathBuf>,

    /// 原始BP文件（.pdf / .docx / .pptx），用于校验格式与大小
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// 分析结果输出路径
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// LLM Provider (doubao, deepseek, openai, tongyi)
    #[arg(long)]
    pub provider: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// 经由中转代理调用模型接口
    #[arg(long)]
    pub use_relay: bool,

    /// 中转代理地址
    #[arg(long)]
    pub relay_url: Option<String>,

    /// 企业信息提取的超时（毫秒）
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// 依次执行的阶段数（1-4）
    #[arg(long)]
    pub stages: Option<u8>,

    /// 分析完成后追问的问题，可重复指定
    #[arg(long = "ask")]
    pub questions: Vec<String>,

    /// 从之前保存的分析报告继续
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须能读取
            Config::from_file(config_path)?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("bp-analyzer.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path)?
            } else {
                Config::default()
            }
        };

        // 覆盖配置文件中的设置
        if let Some(document) = self.document {
            config.document_path = Some(document);
        }
        if let Some(source) = self.source {
            config.source_path = Some(source);
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }

        if let Some(provider_str) = self.provider {
            // 未知provider直接报错，不能把凭证发给其他供应商
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(|_| AnalysisError::UnknownProvider(provider_str))?;
        }
        if let Some(api_key) = self.api_key {
            config.llm.api_key = api_key;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.llm.timeout_ms = timeout_ms;
        }

        if self.use_relay {
            config.relay.enabled = true;
        }
        if let Some(relay_url) = self.relay_url {
            config.relay.url = relay_url;
        }

        if let Some(stages) = self.stages {
            config.stages = stages;
        }
        if !self.questions.is_empty() {
            config.questions = self.questions;
        }
        if let Some(resume) = self.resume {
            config.resume_from = Some(resume);
        }
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}
