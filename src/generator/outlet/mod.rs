use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::orchestrator::{StagedAnalysisState, StagedOrchestrator};
use crate::types::{AnalysisResult, ChatMessage};

/// 输出到磁盘的分析报告
///
/// `state` 保留完整的阶段状态，可用于中断后继续分析。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub provider: Option<String>,
    pub result: Option<AnalysisResult>,
    pub state: StagedAnalysisState,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
}

impl AnalysisReport {
    pub fn collect(
        orchestrator: &StagedOrchestrator,
        provider: Option<String>,
        chat: &[ChatMessage],
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            provider,
            result: orchestrator.combined_results(),
            state: orchestrator.state().clone(),
            chat: chat.to_vec(),
        }
    }
}

pub trait Outlet {
    async fn save(&self, report: &AnalysisReport) -> Result<()>;
}

pub struct DiskOutlet {
    output_path: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, report: &AnalysisReport) -> Result<()> {
        println!("\n🖊️ 分析结果存储中...");

        if let Some(parent_dir) = self.output_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir)?;
            }
        }

        let content = serde_json::to_string_pretty(report)?;
        fs::write(&self.output_path, content).context(format!(
            "Failed to write analysis report: {}",
            self.output_path.display()
        ))?;

        println!("💾 已保存分析结果: {}", self.output_path.display());
        Ok(())
    }
}

/// 读取之前保存的分析报告
pub fn load_report(path: &Path) -> Result<AnalysisReport> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read analysis report: {}", path.display()))?;
    let report = serde_json::from_str(&content).context("Failed to parse analysis report")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BudgetConfig, LLMConfig};
    use crate::llm::client::LLMClient;
    use crate::llm::client::testing::{Scripted, ScriptedTransport};
    use crate::types::Dimension;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_saved_report_can_be_loaded_back() {
        let transport = ScriptedTransport::new(vec![
            Scripted::content(
                r#"{"name":"ACME Corp","countryOrRegion":"China","industry":"AI","isHighTech":true,"shortDescription":"AI startup"}"#,
            ),
            Scripted::content(r#"{"frontier": {"keyTrends": ["具身智能"]}}"#),
        ]);
        let mut orchestrator = StagedOrchestrator::new(
            LLMClient::with_transport(transport),
            LLMConfig::default(),
            BudgetConfig::default(),
        );
        orchestrator.set_credentials("deepseek", "test");
        orchestrator.start_staged_analysis("ACME Corp").await.unwrap();
        orchestrator.analyze_stage(1).await.unwrap();

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("report.json");
        let report = AnalysisReport::collect(&orchestrator, Some("deepseek".to_string()), &[]);
        DiskOutlet::new(&path).save(&report).await.unwrap();

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded.state, *orchestrator.state());
        let result = loaded.result.unwrap();
        assert!(result.is_analyzed(Dimension::Frontier));
        assert_eq!(result.dimensions.len(), Dimension::ALL.len());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["result"]["companyProfile"]["name"], "ACME Corp");
        assert!(raw["result"]["investmentValue"].is_null());
    }

    #[test]
    fn test_load_missing_report_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_report(&temp_dir.path().join("missing.json")).is_err());
    }
}
