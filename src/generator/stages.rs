//! 分阶段分析的静态配置
//
// 阶段1（行业与技术背景）= papers + frontier + publicPeers
// 阶段2（市场与经营）    = marketCap + revenue + profit + financingCases + policyRisk
// 阶段3（发展阶段）      = stage
// 阶段4（投资价值）      = investmentValue
//
// 四个阶段的维度集合恰好划分全部维度，不重不漏。

use crate::error::AnalysisError;
use crate::types::Dimension;

/// 分析阶段描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisStage {
    pub number: u8,
    pub label: &'static str,
    pub description: &'static str,
    pub dimensions: &'static [Dimension],
}

pub const TOTAL_STAGES: usize = 4;

pub static ANALYSIS_STAGES: [AnalysisStage; TOTAL_STAGES] = [
    AnalysisStage {
        number: 1,
        label: "行业与技术背景",
        description: "梳理相关科研文献、行业前沿趋势与国际可比上市公司",
        dimensions: &[Dimension::Papers, Dimension::Frontier, Dimension::PublicPeers],
    },
    AnalysisStage {
        number: 2,
        label: "市场与经营",
        description: "分析行业市值、企业收入与盈利、相似企业融资案例及政策风险",
        dimensions: &[
            Dimension::MarketCap,
            Dimension::Revenue,
            Dimension::Profit,
            Dimension::FinancingCases,
            Dimension::PolicyRisk,
        ],
    },
    AnalysisStage {
        number: 3,
        label: "发展阶段",
        description: "结合前两阶段的信息判断企业当前所处的融资阶段",
        dimensions: &[Dimension::Stage],
    },
    AnalysisStage {
        number: 4,
        label: "投资价值",
        description: "综合评估投资亮点、关键风险与投资价值评级",
        dimensions: &[Dimension::InvestmentValue],
    },
];

/// 查找阶段描述，编号不在 1..=4 时返回 `InvalidStage`
pub fn stage_descriptor(number: u8) -> Result<&'static AnalysisStage, AnalysisError> {
    ANALYSIS_STAGES
        .iter()
        .find(|stage| stage.number == number)
        .ok_or(AnalysisError::InvalidStage(number))
}

/// 维度所属的阶段
pub fn owning_stage(dimension: Dimension) -> Option<u8> {
    ANALYSIS_STAGES
        .iter()
        .find(|stage| stage.dimensions.contains(&dimension))
        .map(|stage| stage.number)
}

/// 校验阶段配置是否构成全部维度的划分，返回发现的问题
pub fn partition_problems() -> Vec<String> {
    let mut problems = Vec::new();

    for dimension in Dimension::ALL {
        let owners: Vec<u8> = ANALYSIS_STAGES
            .iter()
            .filter(|stage| stage.dimensions.contains(&dimension))
            .map(|stage| stage.number)
            .collect();
        match owners.len() {
            0 => problems.push(format!("维度 {} 不属于任何阶段", dimension)),
            1 => {}
            _ => problems.push(format!("维度 {} 同时属于阶段 {:?}", dimension, owners)),
        }
    }

    for stage in &ANALYSIS_STAGES {
        for (i, dimension) in stage.dimensions.iter().enumerate() {
            if stage.dimensions[..i].contains(dimension) {
                problems.push(format!("阶段 {} 重复包含维度 {}", stage.number, dimension));
            }
        }
    }

    problems
}
