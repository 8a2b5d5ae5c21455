// ==========================================
// 跨境电商业务分析引擎 - 洞察领域对象
// ==========================================
// 职责: 原始观察(未评分)与业务洞察(已评分)结构
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decomposition::PeriodRange;
use super::types::{
    DataQuality, InsightCategory, InsightType, ResourceLevel, TrendDirection,
};

// ==========================================
// 原始洞察 (Raw Insight)
// ==========================================
/// 未评分的原始观察
///
/// 可选统计/紧急度/可执行性字段缺失时, 评分器按
/// 文档化的降级规则兜底, 绝不报错。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInsight {
    pub category: InsightCategory,
    pub metric: String,
    pub current_value: f64,
    pub comparison_value: f64,
    pub deviation: f64,
    pub sample_size: u64,

    // 统计证据 (p 值优先于 z 分, 两者皆缺用偏差比兜底)
    #[serde(default)]
    pub z_score: Option<f64>,
    #[serde(default)]
    pub p_value: Option<f64>,
    #[serde(default)]
    pub effect_size: Option<f64>,

    // 紧急度提示
    #[serde(default)]
    pub trend: Option<TrendDirection>,
    #[serde(default)]
    pub days_to_threshold: Option<i64>,
    #[serde(default)]
    pub reversible: Option<bool>,

    // 可执行性提示
    #[serde(default)]
    pub has_action: bool,
    #[serde(default)]
    pub action_link: Option<String>,
    #[serde(default)]
    pub resource_required: Option<ResourceLevel>,
    #[serde(default)]
    pub time_to_impact_days: Option<i64>,

    // 置信度提示
    #[serde(default)]
    pub data_quality: Option<DataQuality>,
    #[serde(default)]
    pub model_accuracy: Option<f64>,
    #[serde(default)]
    pub historical_accuracy: Option<f64>,

    // 影响度提示
    #[serde(default)]
    pub estimated_revenue_impact: Option<f64>,
    #[serde(default)]
    pub affected_count: Option<u64>,
}

impl RawInsight {
    /// 仅填必填字段, 可选提示全部缺省
    pub fn new(
        category: InsightCategory,
        metric: impl Into<String>,
        current_value: f64,
        comparison_value: f64,
        deviation: f64,
        sample_size: u64,
    ) -> Self {
        Self {
            category,
            metric: metric.into(),
            current_value,
            comparison_value,
            deviation,
            sample_size,
            z_score: None,
            p_value: None,
            effect_size: None,
            trend: None,
            days_to_threshold: None,
            reversible: None,
            has_action: false,
            action_link: None,
            resource_required: None,
            time_to_impact_days: None,
            data_quality: None,
            model_accuracy: None,
            historical_accuracy: None,
            estimated_revenue_impact: None,
            affected_count: None,
        }
    }
}

// ==========================================
// 五维子评分 (Insight Scores)
// ==========================================
// 不变式: 每项都钳制在 [0,100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsightScores {
    pub statistical_significance: f64,
    pub business_impact: f64,
    pub actionability: f64,
    pub urgency: f64,
    pub confidence: f64,
}

// ==========================================
// 洞察证据 (Insight Evidence)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightEvidence {
    pub metric: String,
    pub value: f64,
    pub comparison: String,
    pub change: f64,
}

// ==========================================
// 业务洞察 (Business Insight)
// ==========================================
/// 已评分/已分类/带时效的输出
///
/// 生命周期: 每次评分调用创建一次, 创建后不再修改;
/// 过期时间为建议性元数据, 引擎本身不做过期清理。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub metric: String,
    pub current_value: f64,
    pub comparison_value: f64,
    pub deviation: f64,
    pub deviation_percent: f64,
    pub evidence: Vec<InsightEvidence>,
    pub recommendation: String,
    #[serde(default)]
    pub action_link: Option<String>,
    pub priority: f64,
    pub scores: InsightScores,
    pub total_score: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ==========================================
// 业务上下文 (Business Context)
// ==========================================
/// 影响度评分用的全局业务规模
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub total_revenue: f64,
    pub total_orders: u64,
    pub total_customers: u64,
    pub total_artists: u64,
    pub period: PeriodRange,
}

impl BusinessContext {
    /// 立方体异常适配器使用的缺省上下文
    pub fn default_for(now: DateTime<Utc>) -> Self {
        Self {
            total_revenue: 1_000_000.0,
            total_orders: 1_000,
            total_customers: 500,
            total_artists: 50,
            period: PeriodRange::point(now),
        }
    }
}
