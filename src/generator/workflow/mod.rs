use crate::config::Config;
use crate::document::{PlainTextExtractor, file_summary, load_document, validate_upload};
use crate::generator::chat::ChatAssistant;
use crate::generator::context::GeneratorContext;
use crate::generator::orchestrator::{AnalysisListener, AnalysisProgress, StagedOrchestrator};
use crate::generator::outlet::{AnalysisReport, DiskOutlet, Outlet, load_report};
use crate::generator::stages::stage_descriptor;
use crate::llm::client::CallProgress;

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: Vec<(&'static str, Instant)>,
    phase_durations: Vec<(&'static str, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: Vec::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &'static str) {
        self.phase_start_times.push((phase_name, Instant::now()));
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &'static str) -> Option<Duration> {
        let index = self
            .phase_start_times
            .iter()
            .position(|(name, _)| *name == phase_name)?;
        let (_, start_time) = self.phase_start_times.remove(index);
        let duration = start_time.elapsed();
        self.phase_durations.push((phase_name, duration));
        Some(duration)
    }

    pub fn phase_durations(&self) -> &[(&'static str, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.start_time.elapsed().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const PROFILE: &'static str = "profile";
    pub const STAGES: &'static str = "stages";
    pub const CHAT: &'static str = "chat";
    pub const OUTPUT: &'static str = "output";
}

/// 命令行进度输出
fn console_listener() -> AnalysisListener {
    Arc::new(|progress: AnalysisProgress| match progress {
        AnalysisProgress::ExtractingProfile => println!("🔍 正在提取企业基础信息..."),
        AnalysisProgress::StageStarted(stage) => {
            let label = stage_descriptor(stage).map(|s| s.label).unwrap_or_default();
            println!("🤖 开始第 {} 阶段分析：{}", stage, label);
        }
        AnalysisProgress::StageCompleted(stage) => println!("✓ 第 {} 阶段分析完成", stage),
        AnalysisProgress::Call(CallProgress::CallingApi { provider }) => {
            println!("   📡 正在调用 {} 接口...", provider)
        }
        AnalysisProgress::Call(CallProgress::ParsingResponse) => println!("   🧩 正在解析模型输出..."),
        AnalysisProgress::Call(CallProgress::RepairingJson) => {
            println!("   🛠️ 模型输出格式有误，正在请求修复...")
        }
    })
}

/// 启动BP分析工作流
pub async fn launch(config: &Config) -> Result<()> {
    let context = GeneratorContext::new(config.clone())?;
    let mut timing = TimingScope::new();

    execute(&context, &mut timing).await?;

    println!("\n{}", timing.generate_timing_report());
    Ok(())
}

/// 执行完整流程：读取文档 → 提取企业信息 → 分阶段分析 → 追问 → 保存
pub async fn execute(context: &GeneratorContext, timing: &mut TimingScope) -> Result<AnalysisReport> {
    let config = &context.config;
    let document_path = config
        .document_path
        .as_ref()
        .ok_or_else(|| anyhow!("缺少必要参数：BP文档路径"))?;

    // 给出原始文件时，先按上传规则校验，摘要也展示原始文件
    let summary_path = config.source_path.as_ref().unwrap_or(document_path);
    let size_bytes = std::fs::metadata(summary_path)?.len();
    let file_name = summary_path.to_string_lossy();
    if config.source_path.is_some() {
        validate_upload(&file_name, size_bytes, config.budget.max_document_bytes)?;
    }

    let document = load_document(
        document_path,
        &[&PlainTextExtractor],
        config.budget.max_document_bytes,
    )
    .await?;
    println!("📄 {}", file_summary(&file_name, size_bytes, &document));

    let mut orchestrator = context.orchestrator().with_listener(console_listener());

    timing.start_phase(TimingKeys::PROFILE);
    match &config.resume_from {
        Some(report_path) => {
            let report = load_report(report_path)?;
            orchestrator.restore(report.state, document.text.clone())?;
            println!(
                "♻️ 已从 {} 恢复，已完成阶段：{:?}",
                report_path.display(),
                orchestrator.state().completed_stages
            );
        }
        None => {
            let profile = orchestrator.start_staged_analysis(&document.text).await?;
            println!(
                "✅ 企业信息：{}（{}，{}）",
                profile.name, profile.industry, profile.country_or_region
            );
        }
    }
    timing.end_phase(TimingKeys::PROFILE);

    timing.start_phase(TimingKeys::STAGES);
    let stage_outcome = run_stages(&mut orchestrator, config.effective_stages()).await;
    timing.end_phase(TimingKeys::STAGES);

    let mut chat = ChatAssistant::new();
    if stage_outcome.is_ok() && !config.questions.is_empty() {
        timing.start_phase(TimingKeys::CHAT);
        for question in &config.questions {
            println!("\n❓ {}", question);
            match chat.send_message(&orchestrator, question).await {
                Ok(answer) => println!("💬 {}", answer),
                Err(e) => eprintln!("❌ {}", e),
            }
        }
        timing.end_phase(TimingKeys::CHAT);
    }

    // 阶段失败时也保存已完成的部分，便于之后用 --resume 继续
    timing.start_phase(TimingKeys::OUTPUT);
    let report = AnalysisReport::collect(
        &orchestrator,
        Some(config.llm.provider.to_string()),
        chat.messages(),
    );
    DiskOutlet::new(&config.output_path).save(&report).await?;
    timing.end_phase(TimingKeys::OUTPUT);

    stage_outcome?;
    Ok(report)
}

/// 依次执行阶段，直到完成 `stages` 个阶段或某个阶段失败
async fn run_stages(orchestrator: &mut StagedOrchestrator, stages: u8) -> Result<()> {
    while let Some(next) = orchestrator.next_stage() {
        if next > stages {
            break;
        }
        if let Err(e) = orchestrator.analyze_stage(next).await {
            eprintln!("❌ {}", e);
            if e.is_timeout() {
                eprintln!("💡 请检查网络连接后使用 --resume 重试该阶段");
            }
            return Err(e.into());
        }
    }

    if orchestrator.is_all_stages_completed() {
        println!("🎉 全部 4 个阶段分析完成");
    }
    Ok(())
}
