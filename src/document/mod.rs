//! BP文档的文本来源
//!
//! 分析流程只消费纯文本。PDF/DOCX/PPTX 的文本提取由外部工具完成，
//! 这里负责上传校验，并读取外部工具导出的纯文本。

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::AnalysisError;

/// 外部提取工具输出的分页标记，如 "--- Page 3 ---"、"--- Slide 2 ---"
static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^--- (?:Page|Slide) \d+ ---$").expect("page marker pattern is valid")
});

/// 可上传的BP文档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
}

impl DocumentFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "pptx" => Some(DocumentFormat::Pptx),
            _ => None,
        }
    }
}

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub text: String,
    /// PDF页数或PPTX幻灯片数
    pub page_count: Option<usize>,
}

/// 文档文本提取器
#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    /// 是否能处理该扩展名（小写，不含点）
    fn supports(&self, extension: &str) -> bool;

    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, AnalysisError>;
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

fn check_size(size_bytes: u64, max_bytes: u64) -> Result<(), AnalysisError> {
    if size_bytes > max_bytes {
        return Err(AnalysisError::DocumentTooLarge {
            size_mb: bytes_to_mb(size_bytes),
            limit_mb: bytes_to_mb(max_bytes),
        });
    }
    Ok(())
}

/// 上传前校验：只接受 PDF/DOCX/PPTX，且不超过大小上限
pub fn validate_upload(
    file_name: &str,
    size_bytes: u64,
    max_bytes: u64,
) -> Result<DocumentFormat, AnalysisError> {
    let extension = extension_of(file_name);
    let format = DocumentFormat::from_extension(&extension)
        .ok_or_else(|| AnalysisError::UnsupportedDocument(file_name.to_string()))?;
    check_size(size_bytes, max_bytes)?;
    Ok(format)
}

/// 读取外部工具已导出的纯文本（.txt / .md）
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl DocumentTextExtractor for PlainTextExtractor {
    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "md")
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, AnalysisError> {
        let text = tokio::fs::read_to_string(path).await?;
        let markers = PAGE_MARKER.find_iter(&text).count();
        Ok(ExtractedDocument {
            page_count: (markers > 0).then_some(markers),
            text,
        })
    }
}

/// 读取文档：先检查大小，再交给支持该扩展名的提取器
pub async fn load_document(
    path: &Path,
    extractors: &[&dyn DocumentTextExtractor],
    max_bytes: u64,
) -> Result<ExtractedDocument, AnalysisError> {
    let file_name = path.to_string_lossy();
    let extension = extension_of(&file_name);
    let extractor = extractors
        .iter()
        .find(|extractor| extractor.supports(&extension))
        .ok_or_else(|| AnalysisError::UnsupportedDocument(file_name.to_string()))?;

    let size_bytes = tokio::fs::metadata(path).await?.len();
    check_size(size_bytes, max_bytes)?;

    let document = extractor.extract(path).await?;
    debug!(path = %file_name, chars = document.text.chars().count(), "document loaded");
    Ok(document)
}

/// 展示用的文件摘要
pub fn file_summary(file_name: &str, size_bytes: u64, document: &ExtractedDocument) -> String {
    let page_info = document
        .page_count
        .map(|count| format!(" | {} 页", count))
        .unwrap_or_default();
    format!(
        "文件：{} ({:.2} KB{}) | 提取字符数：{}",
        file_name,
        size_bytes as f64 / 1024.0,
        page_info,
        document.text.chars().count()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEN_MB: u64 = 10 * 1024 * 1024;

    #[test]
    fn test_validate_upload_formats() {
        assert_eq!(validate_upload("bp.PDF", 1024, TEN_MB).unwrap(), DocumentFormat::Pdf);
        assert_eq!(validate_upload("bp.docx", 1024, TEN_MB).unwrap(), DocumentFormat::Docx);
        assert_eq!(validate_upload("deck.pptx", 1024, TEN_MB).unwrap(), DocumentFormat::Pptx);

        let err = validate_upload("bp.key", 1024, TEN_MB).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedDocument(_)));
        assert!(validate_upload("no_extension", 1024, TEN_MB).is_err());
    }

    #[test]
    fn test_validate_upload_size_ceiling() {
        assert!(validate_upload("bp.pdf", TEN_MB, TEN_MB).is_ok());

        let err = validate_upload("bp.pdf", 15 * 1024 * 1024, TEN_MB).unwrap_err();
        assert_eq!(
            err.to_string(),
            "文件大小超过限制（最大 10 MB）。当前文件大小：15.00 MB"
        );
    }

    #[test]
    fn test_file_summary() {
        let document = ExtractedDocument {
            text: "一二三".to_string(),
            page_count: Some(12),
        };
        assert_eq!(
            file_summary("bp.pdf", 2048, &document),
            "文件：bp.pdf (2.00 KB | 12 页) | 提取字符数：3"
        );

        let no_pages = ExtractedDocument {
            text: "abc".to_string(),
            page_count: None,
        };
        assert_eq!(
            file_summary("bp.docx", 512, &no_pages),
            "文件：bp.docx (0.50 KB) | 提取字符数：3"
        );
    }

    #[tokio::test]
    async fn test_plain_text_counts_page_markers() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(
            file,
            "\n--- Slide 1 ---\nACME Corp\n\n--- Slide 2 ---\n融资计划\n"
        )
        .unwrap();

        let document = load_document(file.path(), &[&PlainTextExtractor], TEN_MB)
            .await
            .unwrap();

        assert_eq!(document.page_count, Some(2));
        assert!(document.text.contains("融资计划"));
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_extension_and_large_file() {
        let file = NamedTempFile::new().unwrap();
        let err = load_document(file.path(), &[&PlainTextExtractor], TEN_MB)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedDocument(_)));

        let mut text = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        write!(text, "{}", "x".repeat(2048)).unwrap();
        let err = load_document(text.path(), &[&PlainTextExtractor], 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DocumentTooLarge { .. }));
    }
}
