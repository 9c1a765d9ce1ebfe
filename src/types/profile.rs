use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::AnalysisError;

/// 企业融资阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FundingStage {
    #[serde(rename = "seed")]
    Seed,
    #[serde(rename = "preA")]
    PreA,
    #[serde(rename = "seriesA")]
    SeriesA,
    #[serde(rename = "seriesB")]
    SeriesB,
    #[serde(rename = "seriesC")]
    SeriesC,
    #[serde(rename = "preIPO")]
    PreIpo,
    #[serde(rename = "unknown")]
    Unknown,
}

impl FundingStage {
    pub const KEYS: [&'static str; 7] = [
        "seed", "preA", "seriesA", "seriesB", "seriesC", "preIPO", "unknown",
    ];
}

/// 单年收入记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueRecord {
    /// 年份
    pub year: i32,
    /// 收入金额，未知时为null
    pub amount: Option<f64>,
    /// 币种，如 CNY、USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// 备注
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 从BP文档中提取的企业基础信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    /// 公司名称，无法确定时为 "Unknown"
    pub name: String,
    /// 主要所在国家或地区，无法确定时为 "Unknown"
    pub country_or_region: String,
    /// 简要的行业名称
    pub industry: String,
    /// 是否主要依赖核心科技创新（AI、芯片、生物医药、硬科技等）
    pub is_high_tech: bool,
    /// 用1-2句话总结企业业务
    pub short_description: String,
    /// 基于融资轮次、团队规模、收入体量等推断的融资阶段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_stage: Option<FundingStage>,
    /// 近几年的收入数据，文档中没有时为空数组
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_by_year: Option<Vec<RevenueRecord>>,
}

impl CompanyProfile {
    /// 从LLM返回的JSON构造企业信息
    ///
    /// 模型偶尔会给出枚举之外的阶段取值（如 "Series A"、"angel"），
    /// 这类取值统一归为 `unknown`，而不是让整个提取失败。
    pub fn from_llm_value(mut value: Value) -> Result<Self, AnalysisError> {
        if let Some(stage) = value.get_mut("inferredStage") {
            let known = stage
                .as_str()
                .is_some_and(|s| FundingStage::KEYS.contains(&s));
            if !known && !stage.is_null() {
                *stage = Value::String("unknown".to_string());
            }
        }

        if let Some(revenue) = value.get_mut("revenueByYear") {
            normalize_revenue(revenue);
        }

        serde_json::from_value(value).map_err(|e| AnalysisError::ProfileShape(e.to_string()))
    }
}

/// 收入列表是可选信息，格式不规范的记录不应导致整个提取失败
///
/// - 字符串形式的年份（如 "2023"）转为整数，无法识别年份的记录被丢弃
/// - 非数字的金额（如 "约500万"）置为null，原文保留到 `note`
fn normalize_revenue(revenue: &mut Value) {
    if !revenue.is_array() {
        if !revenue.is_null() {
            warn!("revenueByYear 不是数组，已忽略: {}", revenue);
            *revenue = Value::Null;
        }
        return;
    }
    let Some(records) = revenue.as_array_mut() else {
        return;
    };

    records.retain_mut(|record| {
        if !record.is_object() {
            warn!("忽略无法识别的收入记录: {}", record);
            return false;
        }
        let Some(fields) = record.as_object_mut() else {
            return false;
        };

        let year = fields.get("year").and_then(|year| match year {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().trim_end_matches('年').parse::<i64>().ok(),
            _ => None,
        });
        let Some(year) = year.and_then(|y| i32::try_from(y).ok()) else {
            warn!("忽略缺少有效年份的收入记录: {:?}", fields.get("year"));
            return false;
        };
        fields.insert("year".to_string(), Value::from(year));

        let raw_amount = match fields.get("amount") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) if !other.is_number() && !other.is_null() => Some(other.to_string()),
            _ => None,
        };
        if let Some(raw) = raw_amount {
            let parsed = raw.trim().replace(',', "").parse::<f64>().ok();
            fields.insert("amount".to_string(), parsed.map_or(Value::Null, Value::from));
            if parsed.is_none() {
                let note = match fields.get("note").and_then(Value::as_str) {
                    Some(existing) if !existing.is_empty() => format!("{}；{}", raw, existing),
                    _ => raw,
                };
                fields.insert("note".to_string(), Value::String(note));
            }
        }

        for key in ["currency", "note"] {
            let text = fields
                .get(key)
                .filter(|v| !v.is_string() && !v.is_null())
                .map(Value::to_string);
            if let Some(text) = text {
                fields.insert(key.to_string(), Value::String(text));
            }
        }
        true
    });
}
