use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::profile::{CompanyProfile, FundingStage, RevenueRecord};

/// 分析维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    MarketCap,
    Frontier,
    PublicPeers,
    Stage,
    Revenue,
    Profit,
    PolicyRisk,
    InvestmentValue,
    FinancingCases,
    Papers,
}

impl Dimension {
    pub const ALL: [Dimension; 10] = [
        Dimension::MarketCap,
        Dimension::Frontier,
        Dimension::PublicPeers,
        Dimension::Stage,
        Dimension::Revenue,
        Dimension::Profit,
        Dimension::PolicyRisk,
        Dimension::InvestmentValue,
        Dimension::FinancingCases,
        Dimension::Papers,
    ];

    /// 结果JSON中的键名
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::MarketCap => "marketCap",
            Dimension::Frontier => "frontier",
            Dimension::PublicPeers => "publicPeers",
            Dimension::Stage => "stage",
            Dimension::Revenue => "revenue",
            Dimension::Profit => "profit",
            Dimension::PolicyRisk => "policyRisk",
            Dimension::InvestmentValue => "investmentValue",
            Dimension::FinancingCases => "financingCases",
            Dimension::Papers => "papers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::MarketCap => "行业 Market Cap",
            Dimension::Frontier => "行业前沿发展",
            Dimension::PublicPeers => "国际相似上市公司",
            Dimension::Stage => "企业阶段判断",
            Dimension::Revenue => "企业 Revenue 按年",
            Dimension::Profit => "盈利情况",
            Dimension::PolicyRisk => "政策风险",
            Dimension::InvestmentValue => "投资价值评级",
            Dimension::FinancingCases => "相似企业融资案例",
            Dimension::Papers => "科研文献（高科技）",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Dimension::MarketCap => "分析行业整体市值情况",
            Dimension::Frontier => "分析行业最新趋势和前沿动态",
            Dimension::PublicPeers => "寻找可比上市公司及其核心数据",
            Dimension::Stage => "判断企业当前融资阶段",
            Dimension::Revenue => "分析企业历史收入情况",
            Dimension::Profit => "分析企业盈利现状和潜力",
            Dimension::PolicyRisk => "评估企业面临的政策监管风险",
            Dimension::InvestmentValue => "综合评估投资价值（高/中/低）",
            Dimension::FinancingCases => "过去一年相似企业的融资情况",
            Dimension::Papers => "高科技行业的相关科研文献和难点",
        }
    }

    pub fn from_key(key: &str) -> Option<Dimension> {
        Dimension::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// 汇总后的分析结果
///
/// `dimensions` 覆盖全部维度，尚未分析或模型判断不适用的维度值为 null。
/// 序列化时与企业信息平铺在同一个JSON对象中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub company_profile: CompanyProfile,
    #[serde(flatten)]
    pub dimensions: BTreeMap<Dimension, Value>,
}

impl AnalysisResult {
    /// 创建所有维度都为 null 的结果
    pub fn empty(company_profile: CompanyProfile) -> Self {
        Self {
            company_profile,
            dimensions: Dimension::ALL.into_iter().map(|d| (d, Value::Null)).collect(),
        }
    }

    /// 维度是否已有非空结果
    pub fn is_analyzed(&self, dimension: Dimension) -> bool {
        self.dimensions
            .get(&dimension)
            .is_some_and(|value| !value.is_null())
    }

    /// 把某个维度的结果解码为对应的强类型视图，值为 null 时返回 `Ok(None)`
    pub fn typed<T: DeserializeOwned>(
        &self,
        dimension: Dimension,
    ) -> Result<Option<T>, serde_json::Error> {
        match self.dimensions.get(&dimension) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedCompany {
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// 行业市值分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCapAnalysis {
    pub industry_definition: String,
    #[serde(default)]
    pub global_market_cap_range: Option<MoneyRange>,
    #[serde(default)]
    pub key_public_companies: Vec<ListedCompany>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 行业前沿趋势
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontierAnalysis {
    pub key_trends: Vec<String>,
    #[serde(default)]
    pub time_horizon: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerYearMetrics {
    pub year: i32,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPeer {
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_comparable: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub last3_years_core_metrics: Vec<PeerYearMetrics>,
}

/// 可比上市公司
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPeersAnalysis {
    pub has_comparable_peers: bool,
    #[serde(default)]
    pub peers: Vec<PublicPeer>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 企业阶段判断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAnalysis {
    pub stage: Option<FundingStage>,
    #[serde(default)]
    pub reasoning: String,
}

/// 按年收入，直接沿用企业信息中的记录格式
pub type RevenueAnalysis = Vec<RevenueRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfitStatus {
    Profitable,
    LossMaking,
    Breakeven,
    Unknown,
}

/// 盈利情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAnalysis {
    pub current_status: ProfitStatus,
    #[serde(default)]
    pub unit_economics: Option<String>,
    #[serde(default)]
    pub potential_path_to_profitability: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

/// 政策风险
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRiskAnalysis {
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub key_risks: Vec<String>,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvestmentRating {
    High,
    Medium,
    Low,
}

/// 投资价值评级
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentValueAnalysis {
    pub rating: InvestmentRating,
    #[serde(default)]
    pub key_upsides: Vec<String>,
    #[serde(default)]
    pub key_risks: Vec<String>,
    #[serde(default)]
    pub target_investor_profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingCase {
    pub company_name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub round: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub lead_investors: Vec<String>,
}

/// 相似企业融资案例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingCasesAnalysis {
    #[serde(default)]
    pub cases: Vec<FinancingCase>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperInfo {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: i32,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_challenges: String,
}

/// 科研文献
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PapersAnalysis {
    pub is_high_tech_industry: bool,
    #[serde(default)]
    pub papers: Vec<PaperInfo>,
    #[serde(default)]
    pub notes: Option<String>,
}
