// ==========================================
// 跨境电商业务分析引擎 - 健康度领域对象
// ==========================================
// 职责: 业务健康度评分的聚合输入与输出结构
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{FactorStatus, Trend};

// ==========================================
// 健康度聚合输入 (Health Data)
// ==========================================
/// 两期业务聚合指标
///
/// 计算器只消费调用方给出的聚合值, 不虚构数据;
/// 某部署环境缺少真实数据的字段由调用方提供默认值。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthData {
    // 营收相关
    pub current_gmv: f64,
    pub previous_gmv: f64,
    pub current_aov: f64,
    pub previous_aov: f64,
    /// 本期按日汇总的 GMV 序列 (波动性计算用)
    #[serde(default)]
    pub daily_gmv_values: Vec<f64>,
    #[serde(default)]
    pub target_gmv: Option<f64>,

    // 客户相关
    pub new_customers: u64,
    pub previous_new_customers: u64,
    pub repeat_purchase_rate: f64,
    pub previous_repeat_rate: f64,
    pub vip_retention_rate: f64,
    pub at_risk_customer_ratio: f64,

    // 艺术家相关
    pub active_artists: u64,
    pub previous_active_artists: u64,
    pub top5_artist_revenue_share: f64,
    pub at_risk_artist_count: u64,
    pub new_artists: u64,

    // 运营相关
    pub avg_processing_days: f64,
    pub delayed_order_ratio: f64,
    pub qc_pass_rate: f64,
    pub customer_complaint_ratio: f64,
}

// ==========================================
// 评分因子 (Score Factor)
// ==========================================
/// 命名的有界贡献因子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    /// 因子原始观测值
    pub value: f64,
    /// 对维度分数的带符号贡献
    pub contribution: f64,
    pub status: FactorStatus,
}

// ==========================================
// 维度评分 (Dimension Score)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    /// 0-100, 求和后钳制
    pub score: f64,
    /// 按该维度主驱动指标判定, ±2% 死区
    pub trend: Trend,
    pub change: f64,
    pub factors: Vec<ScoreFactor>,
}

// ==========================================
// 健康度评分 (Health Score)
// ==========================================
/// 综合 = round(0.35×营收 + 0.25×客户 + 0.20×艺术家 + 0.20×运营)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub overall: f64,
    pub calculated_at: DateTime<Utc>,
    pub revenue: DimensionScore,
    pub customer: DimensionScore,
    pub artist: DimensionScore,
    pub operations: DimensionScore,
}
