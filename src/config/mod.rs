use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LLMProvider {
    #[serde(rename = "doubao")]
    Doubao,
    #[serde(rename = "deepseek")]
    #[default]
    DeepSeek,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "tongyi")]
    Tongyi,
}

impl LLMProvider {
    pub const ALL: [LLMProvider; 4] = [
        LLMProvider::Doubao,
        LLMProvider::DeepSeek,
        LLMProvider::OpenAI,
        LLMProvider::Tongyi,
    ];

    /// 按规范id精确匹配，不做大小写或空白处理
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.to_string() == id)
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Doubao => write!(f, "doubao"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Tongyi => write!(f, "tongyi"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doubao" => Ok(LLMProvider::Doubao),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openai" => Ok(LLMProvider::OpenAI),
            "tongyi" => Ok(LLMProvider::Tongyi),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 已提取文本的BP文档路径
    pub document_path: Option<PathBuf>,

    /// 导出文本前的原始BP文件（PDF/DOCX/PPTX），用于上传校验与文件摘要
    pub source_path: Option<PathBuf>,

    /// 分析结果输出路径
    pub output_path: PathBuf,

    /// 命令行模式下依次执行的阶段数（1-4）
    pub stages: u8,

    /// 分析完成后依次追问的问题
    pub questions: Vec<String>,

    /// 从之前保存的分析报告继续分析
    pub resume_from: Option<PathBuf>,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 中转代理配置
    pub relay: RelayConfig,

    /// 文本截断预算
    pub budget: BudgetConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// 单次调用的默认超时（毫秒），也用于企业信息提取
    pub timeout_ms: u64,

    /// 阶段分析的超时（毫秒）
    pub stage_timeout_ms: u64,

    /// 维度较多的阶段使用的超时（毫秒）
    pub heavy_stage_timeout_ms: u64,

    /// 阶段维度数超过该值时使用 heavy_stage_timeout_ms
    pub heavy_stage_dimension_threshold: usize,

    /// 对话追问的超时（毫秒）
    pub chat_timeout_ms: u64,
}

/// 中转代理配置，仅用于绕过浏览器端的跨域限制
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    /// 是否经由中转代理调用
    pub enabled: bool,

    /// 中转代理地址
    pub url: String,
}

/// 文本截断预算（字符数）
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BudgetConfig {
    /// 企业信息提取时保留的文档字符数
    pub profile_chars: usize,

    /// 阶段分析时保留的文档摘要字符数
    pub stage_chars: usize,

    /// 对话追问时附带的文档摘要字符数
    pub chat_chars: usize,

    /// 上传文件大小上限（字节）
    pub max_document_bytes: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 命令行模式实际执行的阶段数，限制在 1..=4 之间
    pub fn effective_stages(&self) -> u8 {
        self.stages.clamp(1, 4)
    }
}

impl LLMConfig {
    /// 根据阶段覆盖的维度数选择超时
    pub fn stage_timeout_for(&self, dimension_count: usize) -> u64 {
        if dimension_count > self.heavy_stage_dimension_threshold {
            self.heavy_stage_timeout_ms
        } else {
            self.stage_timeout_ms
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_path: None,
            source_path: None,
            output_path: PathBuf::from("./bp-analysis.json"),
            stages: 4,
            questions: vec![],
            resume_from: None,
            llm: LLMConfig::default(),
            relay: RelayConfig::default(),
            budget: BudgetConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("BP_ANALYZER_API_KEY").unwrap_or_default(),
            timeout_ms: 120_000,
            stage_timeout_ms: 180_000,
            heavy_stage_timeout_ms: 300_000,
            heavy_stage_dimension_threshold: 5,
            chat_timeout_ms: 120_000,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::from("http://localhost:3001/api/proxy"),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            profile_chars: 15_000,
            stage_chars: 8_000,
            chat_chars: 5_000,
            max_document_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
