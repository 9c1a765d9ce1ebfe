//! 分阶段分析编排器
//!
//! 每个会话持有一个 [`StagedOrchestrator`]，状态随实例走，不存在全局共享状态。
//! 所有公开操作要么完整成功并提交状态变更，要么失败且状态与调用前完全一致。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{BudgetConfig, Config, LLMConfig};
use crate::error::AnalysisError;
use crate::generator::prompts::{profile_extraction_prompt, stage_analysis_prompt};
use crate::generator::stages::{
    ANALYSIS_STAGES, AnalysisStage, TOTAL_STAGES, owning_stage, stage_descriptor,
};
use crate::llm::client::{CallProgress, LLMClient, ProgressSink};
use crate::llm::parser::ResponseParser;
use crate::types::{AnalysisResult, CompanyProfile, Dimension};
use crate::utils::text::truncate_middle;

/// 编排过程中的进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisProgress {
    ExtractingProfile,
    StageStarted(u8),
    StageCompleted(u8),
    /// 底层模型调用的进度
    Call(CallProgress),
}

pub type AnalysisListener = Arc<dyn Fn(AnalysisProgress) + Send + Sync>;

/// 单个阶段的分析结果，只包含该阶段自己的维度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage: u8,
    pub company_profile: CompanyProfile,
    pub dimensions: BTreeMap<Dimension, Value>,
}

/// 编排器的可观察状态
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPhase {
    Empty,
    ProfileReady,
    StageInFlight(u8),
    StagesPartial(usize),
    AllComplete,
}

/// 分阶段分析状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedAnalysisState {
    pub current_stage: Option<u8>,
    /// 按完成顺序排列的阶段编号
    pub completed_stages: Vec<u8>,
    /// 与 completed_stages 一一对应
    pub stage_results: Vec<StageResult>,
    pub company_profile: Option<CompanyProfile>,
}

impl StagedAnalysisState {
    pub fn phase(&self) -> AnalysisPhase {
        if self.company_profile.is_none() {
            return AnalysisPhase::Empty;
        }
        if let Some(stage) = self.current_stage {
            return AnalysisPhase::StageInFlight(stage);
        }
        match self.completed_stages.len() {
            0 => AnalysisPhase::ProfileReady,
            n if n >= TOTAL_STAGES => AnalysisPhase::AllComplete,
            n => AnalysisPhase::StagesPartial(n),
        }
    }

    /// 编号最小的未完成阶段
    pub fn next_stage(&self) -> Option<u8> {
        ANALYSIS_STAGES
            .iter()
            .map(|stage| stage.number)
            .find(|number| !self.completed_stages.contains(number))
    }

    pub fn is_all_stages_completed(&self) -> bool {
        self.completed_stages.len() == TOTAL_STAGES
    }

    /// 检查从外部恢复的状态是否自洽
    ///
    /// 阶段必须按 1、2、3、4 的顺序完成，每个阶段结果只能包含自己的维度。
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.company_profile.is_none() && !self.completed_stages.is_empty() {
            return Err(AnalysisError::MissingParameters("企业基础信息".to_string()));
        }
        if self.completed_stages.len() != self.stage_results.len() {
            return Err(AnalysisError::MissingParameters("阶段分析结果".to_string()));
        }

        for (i, (&stage, result)) in self
            .completed_stages
            .iter()
            .zip(&self.stage_results)
            .enumerate()
        {
            let expected = (i + 1) as u8;
            if stage != expected || result.stage != stage {
                return Err(AnalysisError::StageOutOfOrder {
                    requested: stage,
                    expected: Some(expected),
                });
            }

            let descriptor = stage_descriptor(stage)?;
            for dimension in result.dimensions.keys() {
                if !descriptor.dimensions.contains(dimension) {
                    return Err(AnalysisError::DimensionConflict {
                        dimension: dimension.key().to_string(),
                        owner: owning_stage(*dimension).unwrap_or(0),
                        stage,
                    });
                }
            }
        }

        Ok(())
    }
}

/// 在途阶段标记，离开作用域时清除
struct InFlightStage<'a> {
    slot: &'a mut Option<u8>,
}

impl<'a> InFlightStage<'a> {
    fn mark(slot: &'a mut Option<u8>, stage: u8) -> Self {
        *slot = Some(stage);
        Self { slot }
    }
}

impl Drop for InFlightStage<'_> {
    fn drop(&mut self) {
        *self.slot = None;
    }
}

/// 把模型返回的对象整理为只含该阶段维度的结果
///
/// 缺失的维度记为 null，不属于该阶段的键被丢弃。
fn sanitize_stage_object(
    stage: &AnalysisStage,
    mut object: Map<String, Value>,
) -> BTreeMap<Dimension, Value> {
    let dimensions = stage
        .dimensions
        .iter()
        .map(|dimension| {
            let value = object.remove(dimension.key()).unwrap_or(Value::Null);
            (*dimension, value)
        })
        .collect();

    for key in object.keys() {
        if key == "companyProfile" {
            debug!(stage = stage.number, "ignoring companyProfile echoed by model");
        } else {
            warn!(stage = stage.number, key = %key, "dropping key outside of stage dimensions");
        }
    }

    dimensions
}

/// 分阶段分析编排器
pub struct StagedOrchestrator {
    client: LLMClient,
    llm: LLMConfig,
    budget: BudgetConfig,
    provider_id: Option<String>,
    api_key: Option<String>,
    document_text: Option<String>,
    state: StagedAnalysisState,
    listener: Option<AnalysisListener>,
}

impl StagedOrchestrator {
    pub fn new(client: LLMClient, llm: LLMConfig, budget: BudgetConfig) -> Self {
        Self {
            client,
            llm,
            budget,
            provider_id: None,
            api_key: None,
            document_text: None,
            state: StagedAnalysisState::default(),
            listener: None,
        }
    }

    /// 使用配置中的Provider与API KEY创建编排器
    pub fn from_config(client: LLMClient, config: &Config) -> Self {
        let mut orchestrator = Self::new(client, config.llm.clone(), config.budget.clone());
        orchestrator.set_credentials(config.llm.provider.to_string(), config.llm.api_key.clone());
        orchestrator
    }

    pub fn with_listener(mut self, listener: AnalysisListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// 设置Provider与API KEY，空字符串视为未设置
    pub fn set_credentials(&mut self, provider_id: impl Into<String>, api_key: impl Into<String>) {
        let provider_id = provider_id.into();
        let api_key = api_key.into();
        self.provider_id = (!provider_id.trim().is_empty()).then_some(provider_id);
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
    }

    pub fn state(&self) -> &StagedAnalysisState {
        &self.state
    }

    pub fn company_profile(&self) -> Option<&CompanyProfile> {
        self.state.company_profile.as_ref()
    }

    pub fn document_text(&self) -> Option<&str> {
        self.document_text.as_deref()
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.state.phase()
    }

    pub fn next_stage(&self) -> Option<u8> {
        self.state.next_stage()
    }

    pub fn is_all_stages_completed(&self) -> bool {
        self.state.is_all_stages_completed()
    }

    pub(crate) fn client(&self) -> &LLMClient {
        &self.client
    }

    pub(crate) fn llm_config(&self) -> &LLMConfig {
        &self.llm
    }

    pub(crate) fn budget(&self) -> &BudgetConfig {
        &self.budget
    }

    /// Provider与API KEY，缺任意一个时返回 `MissingParameters`
    pub(crate) fn credentials(&self) -> Result<(&str, &str), AnalysisError> {
        match (self.provider_id.as_deref(), self.api_key.as_deref()) {
            (Some(provider_id), Some(api_key)) => Ok((provider_id, api_key)),
            (None, _) => Err(AnalysisError::MissingParameters("模型Provider".to_string())),
            (_, None) => Err(AnalysisError::MissingParameters("API KEY".to_string())),
        }
    }

    fn emit(&self, progress: AnalysisProgress) {
        if let Some(listener) = &self.listener {
            listener(progress);
        }
    }

    /// 把底层调用进度转发给监听器
    fn call_sink(&self) -> Option<ProgressSink> {
        self.listener.clone().map(|listener| {
            Arc::new(move |progress: CallProgress| listener(AnalysisProgress::Call(progress)))
                as ProgressSink
        })
    }

    /// 提取企业基础信息，成功后进入 ProfileReady 并清空已完成的阶段
    pub async fn start_staged_analysis(
        &mut self,
        document_text: &str,
    ) -> Result<&CompanyProfile, AnalysisError> {
        let (provider_id, api_key) = self.credentials()?;
        if document_text.trim().is_empty() {
            return Err(AnalysisError::MissingParameters("文档内容".to_string()));
        }

        self.emit(AnalysisProgress::ExtractingProfile);
        let sink = self.call_sink();

        let profile = Self::extract_profile(
            &self.client,
            provider_id,
            api_key,
            self.llm.timeout_ms,
            &truncate_middle(document_text, self.budget.profile_chars),
            sink.as_ref(),
        )
        .await
        .map_err(|e| AnalysisError::ProfileExtractionFailed(Box::new(e)))?;

        info!(company = %profile.name, industry = %profile.industry, "company profile extracted");

        self.document_text = Some(document_text.to_string());
        self.state = StagedAnalysisState::default();
        Ok(self.state.company_profile.insert(profile))
    }

    async fn extract_profile(
        client: &LLMClient,
        provider_id: &str,
        api_key: &str,
        timeout_ms: u64,
        document_text: &str,
        sink: Option<&ProgressSink>,
    ) -> Result<CompanyProfile, AnalysisError> {
        let prompt = profile_extraction_prompt(document_text);
        let raw = client
            .call(
                provider_id,
                api_key,
                &prompt.system_prompt,
                &prompt.user_prompt,
                Some(timeout_ms),
                sink,
            )
            .await?;

        let object = ResponseParser::new(client)
            .with_timeout(timeout_ms)
            .with_progress(sink)
            .parse_json(provider_id, api_key, &raw)
            .await?;

        CompanyProfile::from_llm_value(Value::Object(object))
    }

    /// 分析指定阶段，只接受紧接着的下一个未完成阶段
    pub async fn analyze_stage(&mut self, stage_number: u8) -> Result<&StageResult, AnalysisError> {
        let (provider_id, api_key) = self
            .credentials()
            .map(|(p, k)| (p.to_string(), k.to_string()))?;
        let document_text = self
            .document_text
            .as_deref()
            .ok_or(AnalysisError::MissingParameters("文档内容".to_string()))?;
        let profile = self
            .state
            .company_profile
            .as_ref()
            .ok_or(AnalysisError::MissingParameters("企业基础信息".to_string()))?;

        let stage = stage_descriptor(stage_number)?;
        let expected = self.state.next_stage();
        if expected != Some(stage_number) {
            return Err(AnalysisError::StageOutOfOrder {
                requested: stage_number,
                expected,
            });
        }

        self.emit(AnalysisProgress::StageStarted(stage_number));
        let sink = self.call_sink();
        let summary = truncate_middle(document_text, self.budget.stage_chars);
        let timeout_ms = self.llm.stage_timeout_for(stage.dimensions.len());

        let outcome = {
            let _in_flight = InFlightStage::mark(&mut self.state.current_stage, stage_number);
            Self::run_stage(
                &self.client,
                &provider_id,
                &api_key,
                timeout_ms,
                stage,
                profile,
                &summary,
                sink.as_ref(),
            )
            .await
        };

        let dimensions = outcome.map_err(|cause| AnalysisError::StageFailed {
            stage: stage_number,
            cause: Box::new(cause),
        })?;

        let result = StageResult {
            stage: stage_number,
            company_profile: profile.clone(),
            dimensions,
        };
        let committed = self.state.stage_results.len();
        self.state.completed_stages.push(stage_number);
        self.state.stage_results.push(result);

        info!(stage = stage_number, label = stage.label, "stage analysis committed");
        self.emit(AnalysisProgress::StageCompleted(stage_number));

        Ok(&self.state.stage_results[committed])
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        client: &LLMClient,
        provider_id: &str,
        api_key: &str,
        timeout_ms: u64,
        stage: &AnalysisStage,
        profile: &CompanyProfile,
        summary: &str,
        sink: Option<&ProgressSink>,
    ) -> Result<BTreeMap<Dimension, Value>, AnalysisError> {
        let prompt = stage_analysis_prompt(stage.number, profile, summary)?;
        debug!(stage = stage.number, timeout_ms, "running stage analysis");

        let raw = client
            .call(
                provider_id,
                api_key,
                &prompt.system_prompt,
                &prompt.user_prompt,
                Some(timeout_ms),
                sink,
            )
            .await?;

        let object = ResponseParser::new(client)
            .with_timeout(timeout_ms)
            .with_progress(sink)
            .parse_json(provider_id, api_key, &raw)
            .await?;

        Ok(sanitize_stage_object(stage, object))
    }

    /// 汇总所有已完成阶段的结果，按完成顺序合并，后写覆盖先写
    pub fn combined_results(&self) -> Option<AnalysisResult> {
        let profile = self.state.company_profile.as_ref()?;
        let mut combined = AnalysisResult::empty(profile.clone());

        for result in &self.state.stage_results {
            for (dimension, value) in &result.dimensions {
                if combined.dimensions.get(dimension).is_some_and(|v| !v.is_null()) {
                    warn!(dimension = %dimension, stage = result.stage, "dimension written by more than one stage");
                }
                combined.dimensions.insert(*dimension, value.clone());
            }
        }

        Some(combined)
    }

    /// 恢复先前保存的状态，状态不自洽时保持原状态不变
    pub fn restore(
        &mut self,
        state: StagedAnalysisState,
        document_text: impl Into<String>,
    ) -> Result<(), AnalysisError> {
        state.validate()?;
        self.state = StagedAnalysisState {
            current_stage: None,
            ..state
        };
        self.document_text = Some(document_text.into());
        Ok(())
    }

    /// 回到 Empty，保留Provider与API KEY
    pub fn reset(&mut self) {
        self.state = StagedAnalysisState::default();
        self.document_text = None;
    }
}
