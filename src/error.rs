//! 分析流程的错误分类

use thiserror::Error;

/// 分析流程中可能出现的全部错误
///
/// 底层错误（Provider、网络、JSON修复等）由LLM调用层产生，
/// 编排器在边界处把它们包装为 `ProfileExtractionFailed` 或 `StageFailed`，
/// 保证每次失败的操作只对外呈现一条可读的消息。
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("缺少必要参数：{0}")]
    MissingParameters(String),

    #[error("未知的供应商：{0}")]
    UnknownProvider(String),

    #[error("请求超时（{timeout_ms} ms），请稍后重试或检查网络连接")]
    Timeout { timeout_ms: u64 },

    #[error("LLM请求失败：{status} {body}")]
    ProviderHttp { status: u16, body: String },

    #[error("无法从LLM响应中提取内容")]
    EmptyContent,

    #[error("网络请求失败：{0}")]
    Transport(String),

    #[error("JSON解析失败，修复后仍无法解析：{cause}")]
    JsonRepairFailed {
        original: String,
        repaired: String,
        cause: String,
    },

    #[error("企业信息格式不符合要求：{0}")]
    ProfileShape(String),

    #[error("无效的分析阶段：{0}")]
    InvalidStage(u8),

    #[error("阶段顺序错误：请求阶段 {requested}，下一个待分析阶段为 {}", .expected.map_or_else(|| "无".to_string(), |s| s.to_string()))]
    StageOutOfOrder { requested: u8, expected: Option<u8> },

    #[error("维度 {dimension} 已由阶段 {owner} 写入，阶段 {stage} 不能覆盖")]
    DimensionConflict {
        dimension: String,
        owner: u8,
        stage: u8,
    },

    #[error("请先完成分析")]
    NoAnalysisAvailable,

    #[error("会话 {0} 正在处理其他请求")]
    SessionBusy(String),

    #[error("会话 {0} 不存在")]
    UnknownSession(String),

    #[error("不支持的文件格式：{0}。请上传 PDF、DOCX 或 PPTX 文件")]
    UnsupportedDocument(String),

    #[error("文件大小超过限制（最大 {limit_mb:.0} MB）。当前文件大小：{size_mb:.2} MB")]
    DocumentTooLarge { size_mb: f64, limit_mb: f64 },

    #[error("读取文件失败：{0}")]
    Io(#[from] std::io::Error),

    #[error("分析失败：{0}")]
    ProfileExtractionFailed(#[source] Box<AnalysisError>),

    #[error("阶段 {stage} 分析失败：{cause}")]
    StageFailed {
        stage: u8,
        #[source]
        cause: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// 剥离编排器边界的包装，返回底层的错误
    pub fn root_cause(&self) -> &AnalysisError {
        match self {
            AnalysisError::ProfileExtractionFailed(cause) => cause.root_cause(),
            AnalysisError::StageFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// 是否是超时错误（无论是否被包装）
    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), AnalysisError::Timeout { .. })
    }
}
