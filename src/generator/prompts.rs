//! 提示词构建，只做字符串模板拼接，不涉及任何网络调用

use serde::Serialize;

use crate::error::AnalysisError;
use crate::generator::stages::stage_descriptor;
use crate::types::{AnalysisResult, ChatMessage, CompanyProfile, Dimension};

/// 一次模型调用所需的系统提示词与用户提示词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_prompt: String,
    pub user_prompt: String,
}

const PROFILE_SYSTEM_PROMPT: &str = r#"你是一名投研分析师。你将看到一份创业公司 BP 或企业介绍文档的文本内容。
请从中提取企业的基础信息，并以 JSON 格式返回，必须严格符合给定的 CompanyProfile 结构，不要输出多余文字。"#;

const STAGE_SYSTEM_PROMPT: &str = r#"你是一名专业的 TMT / 高科技方向投研分析师。你会基于企业的 BP 文档内容与自身知识，对该企业及其所在行业进行多维度分析。
所有输出必须使用 JSON。

重要规则：
1. 充分利用给定的 CompanyProfile 和文档摘要
2. 只输出本次要求的维度，不要输出其他键
3. 对信息严重不足的字段，填 null 或 "unknown"，并在 notes 中说明原因
4. 若没有足够信息，不要编造具体数字（金额、年份）
5. 所有金额单位请明确标注（如USD、CNY等）"#;

const CHAT_SYSTEM_PROMPT: &str = r#"你是一名专业的投研分析师助手。你已经分析了一份企业 BP，并与用户进行进一步的对话。

你可以访问：
1. 企业基础信息（CompanyProfile）
2. 已完成的多维度分析结果（AnalysisResult）
3. 原始 BP 文档文本
4. 之前的对话历史

请基于这些信息回答用户的问题。回答要专业、准确、有洞察力。"#;

fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// CompanyProfile 的JSON Schema，嵌入到企业信息提取提示词中
pub fn company_profile_schema() -> String {
    let schema = schemars::schema_for!(CompanyProfile);
    format!("{:#}", schema.as_value())
}

/// 构建企业基础信息提取提示词
pub fn profile_extraction_prompt(document_text: &str) -> PromptPair {
    let system_prompt = format!(
        "{}\n\nCompanyProfile 的 JSON Schema：\n{}",
        PROFILE_SYSTEM_PROMPT,
        company_profile_schema()
    );

    let user_prompt = format!(
        r#"以下是企业 BP / 介绍文档的文本内容：

"""
{}
"""

请提取并返回一个 JSON，对应 CompanyProfile 类型。字段要求如下：

- name: 公司名称（若无法确定，用 "Unknown"）
- countryOrRegion: 公司主要所在国家或地区（若无法确定，用 "Unknown"）
- industry: 简要的行业名称（中文或英文均可）
- isHighTech: 若企业主要依赖核心科技创新（如 AI、芯片、生物医药、硬科技等），填 true，否则 false
- shortDescription: 用 1-2 句话总结企业业务（中文）
- inferredStage: 从 seed / preA / seriesA / seriesB / seriesC / preIPO / unknown 中选一个，基于融资轮次、团队规模、收入体量等综合判断
- revenueByYear: 如果文档中有收入数据，列出近几年收入；如果没有，可以为空数组

只输出 JSON，不要解释。"#,
        document_text
    );

    PromptPair {
        system_prompt,
        user_prompt,
    }
}

/// 单个维度的输出结构说明
fn dimension_instructions(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::MarketCap => {
            r#"   - industryDefinition: 行业定义说明
   - globalMarketCapRange: 全球或主要区域的总市值区间 { min, max, currency }
   - keyPublicCompanies: 关键上市公司举例 [{ name, ticker?, exchange?, country? }]
   - notes: 若无法给出准确数字，请在此说明"#
        }
        Dimension::Frontier => {
            r#"   - keyTrends: 近年该行业或技术方向的3-5个关键发展趋势
   - timeHorizon: 趋势的时间范围（如"2023-2025"）
   - notes: 补充说明"#
        }
        Dimension::PublicPeers => {
            r#"   - hasComparablePeers: 是否有合适可比公司
   - peers: 可比公司列表，每个包含：
     * name, ticker?, exchange?, country?
     * isComparable: 是否可比
     * reason: 可比性说明
     * last3YearsCoreMetrics: 最近3年核心数据 [{ year, revenue?, profit?, marketCap?, currency? }]
   - notes: 若无合适可比公司，说明原因"#
        }
        Dimension::Stage => {
            r#"   - stage: 企业当前阶段（seed/preA/seriesA/seriesB/seriesC/preIPO/unknown）
   - reasoning: 判断依据"#
        }
        Dimension::Revenue => {
            r#"   - 按年收入记录数组 [{ year, amount, currency?, note? }]
   - 可直接使用企业信息中的 revenueByYear，或补充更多信息
   - 若无数据，返回 null"#
        }
        Dimension::Profit => {
            r#"   - currentStatus: profitable / lossMaking / breakeven / unknown
   - unitEconomics?: 单位经济说明
   - potentialPathToProfitability?: 潜在盈利路径"#
        }
        Dimension::PolicyRisk => {
            r#"   - riskLevel: low / medium / high / unknown
   - keyRisks: 关键政策风险点列表
   - jurisdictions: 涉及的主要国家/地区"#
        }
        Dimension::InvestmentValue => {
            r#"   - rating: high / medium / low
   - keyUpsides: 关键投资亮点
   - keyRisks: 关键风险点
   - targetInvestorProfile?: 目标投资人画像"#
        }
        Dimension::FinancingCases => {
            r#"   - cases: 过去一年相似企业融资案例 [{ companyName, region?, round?, amount?, currency?, date?, leadInvestors? }]
   - notes: 补充说明或信息来源"#
        }
        Dimension::Papers => {
            r#"   - 仅当企业属于高科技行业时给出，否则返回 null
   - isHighTechIndustry: 是否属于高科技行业
   - papers: 过去2年相关科研文献5-10篇 [{ title, authors[], year, venue?, link?, summary, keyChallenges }]
   - notes: 补充说明
   - keyChallenges 中说明该方向目前最核心的科研难点"#
        }
    }
}

/// 构建某个阶段的分析提示词
///
/// 只为该阶段包含的维度生成输出说明，其他阶段的维度不会出现在提示词中。
pub fn stage_analysis_prompt(
    stage_number: u8,
    company_profile: &CompanyProfile,
    document_summary: &str,
) -> Result<PromptPair, AnalysisError> {
    let stage = stage_descriptor(stage_number)?;

    let keys: Vec<&str> = stage.dimensions.iter().map(|d| d.key()).collect();
    let blocks: Vec<String> = stage
        .dimensions
        .iter()
        .enumerate()
        .map(|(i, dimension)| {
            format!(
                "{}. {}（{}）：\n{}",
                i + 1,
                dimension.key(),
                dimension.label(),
                dimension_instructions(*dimension)
            )
        })
        .collect();

    let user_prompt = format!(
        r#"这是已经抽取的企业基础信息 CompanyProfile：

"""
{}
"""

这是 BP / 介绍文档的精简摘要内容：

"""
{}
"""

当前为第 {} 阶段：{}（{}）
本阶段需要输出的维度为：{}

请基于以上信息输出一个 JSON 对象，字段要求：

{}

输出要求：
- 只输出一个 JSON 对象，顶层键只能是：{}
- 不要输出任何额外文字或解释
- 某个维度确实无法分析时，该键的值设为 null"#,
        pretty_json(company_profile),
        document_summary,
        stage.number,
        stage.label,
        stage.description,
        keys.join(", "),
        blocks.join("\n\n"),
        keys.join(", ")
    );

    Ok(PromptPair {
        system_prompt: STAGE_SYSTEM_PROMPT.to_string(),
        user_prompt,
    })
}

/// 构建追问对话提示词
///
/// `document_excerpt` 由调用方按字符预算截取好后传入。
pub fn chat_prompt(
    company_profile: &CompanyProfile,
    analysis_result: &AnalysisResult,
    document_excerpt: &str,
    history: &[ChatMessage],
    question: &str,
) -> PromptPair {
    let history_text = history
        .iter()
        .map(|message| format!("{}: {}", message.role.speaker(), message.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user_prompt = format!(
        r#"企业基础信息：
{}

分析结果：
{}

原始文档摘要：
{}

之前的对话：
{}

用户新问题：
{}

请回答用户的问题："#,
        pretty_json(company_profile),
        pretty_json(analysis_result),
        document_excerpt,
        history_text,
        question
    );

    PromptPair {
        system_prompt: CHAT_SYSTEM_PROMPT.to_string(),
        user_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::stages::ANALYSIS_STAGES;
    use crate::types::{ChatRole, FundingStage};

    fn profile() -> CompanyProfile {
        CompanyProfile {
            name: "ACME Corp".to_string(),
            country_or_region: "China".to_string(),
            industry: "AI".to_string(),
            is_high_tech: true,
            short_description: "AI startup".to_string(),
            inferred_stage: Some(FundingStage::Seed),
            revenue_by_year: None,
        }
    }

    /// 维度说明块的标题行，例如 "papers（科研文献（高科技））："
    fn block_heading(dimension: Dimension) -> String {
        format!("{}（{}）：", dimension.key(), dimension.label())
    }

    #[test]
    fn test_profile_prompt_embeds_document_and_schema() {
        let prompt = profile_extraction_prompt("ACME Corp is a seed-stage AI startup in China.");

        assert!(prompt.user_prompt.contains("ACME Corp is a seed-stage AI startup in China."));
        assert!(prompt.system_prompt.contains("countryOrRegion"));
        assert!(prompt.system_prompt.contains("inferredStage"));
        assert!(prompt.system_prompt.contains("preIPO"));
    }

    #[test]
    fn test_stage_prompt_only_mentions_own_dimensions() {
        for stage in &ANALYSIS_STAGES {
            let prompt = stage_analysis_prompt(stage.number, &profile(), "摘要").unwrap();

            for dimension in Dimension::ALL {
                let mentioned = prompt.user_prompt.contains(&block_heading(dimension));
                assert_eq!(
                    mentioned,
                    stage.dimensions.contains(&dimension),
                    "stage {} / {}",
                    stage.number,
                    dimension
                );
            }
        }
    }

    #[test]
    fn test_stage_prompt_embeds_profile_and_summary() {
        let prompt = stage_analysis_prompt(2, &profile(), "年收入约 500 万元").unwrap();

        assert!(prompt.user_prompt.contains("\"name\": \"ACME Corp\""));
        assert!(prompt.user_prompt.contains("年收入约 500 万元"));
        assert!(prompt.user_prompt.contains("marketCap, revenue, profit, financingCases, policyRisk"));
    }

    #[test]
    fn test_stage_prompt_rejects_invalid_stage() {
        assert!(matches!(
            stage_analysis_prompt(0, &profile(), ""),
            Err(AnalysisError::InvalidStage(0))
        ));
        assert!(matches!(
            stage_analysis_prompt(7, &profile(), ""),
            Err(AnalysisError::InvalidStage(7))
        ));
    }

    #[test]
    fn test_chat_prompt_contains_history_in_order() {
        let history = vec![
            ChatMessage {
                role: ChatRole::User,
                content: "估值合理吗？".to_string(),
                timestamp: 1,
            },
            ChatMessage {
                role: ChatRole::Assistant,
                content: "偏高。".to_string(),
                timestamp: 2,
            },
        ];
        let result = AnalysisResult::empty(profile());

        let prompt = chat_prompt(&profile(), &result, "文档节选", &history, "主要风险？");

        let user = &prompt.user_prompt;
        let first = user.find("用户: 估值合理吗？").unwrap();
        let second = user.find("AI: 偏高。").unwrap();
        assert!(first < second);
        assert!(user.contains("文档节选"));
        assert!(user.ends_with("请回答用户的问题："));
        assert!(user.contains("主要风险？"));
    }
}
