// ==========================================
// 跨境电商业务分析引擎 - 领域类型定义
// ==========================================
// 序列化格式: lowercase (与对外 JSON API 一致)
// ==========================================

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 聚合方式 (Aggregate Kind)
// ==========================================
// 未知聚合方式属于致命配置错误, 构造期即失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Sum,   // 求和
    Avg,   // 平均
    Count, // 计数 (可解析为数值的行数)
    Max,   // 最大值
    Min,   // 最小值
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateKind::Sum => write!(f, "sum"),
            AggregateKind::Avg => write!(f, "avg"),
            AggregateKind::Count => write!(f, "count"),
            AggregateKind::Max => write!(f, "max"),
            AggregateKind::Min => write!(f, "min"),
        }
    }
}

impl FromStr for AggregateKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggregateKind::Sum),
            "avg" | "average" => Ok(AggregateKind::Avg),
            "count" => Ok(AggregateKind::Count),
            "max" => Ok(AggregateKind::Max),
            "min" => Ok(AggregateKind::Min),
            other => Err(EngineError::UnknownAggregation(other.to_string())),
        }
    }
}

// ==========================================
// 异常方向 (Anomaly Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyDirection {
    Positive, // 高于全局基准
    Negative, // 低于全局基准
}

impl fmt::Display for AnomalyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyDirection::Positive => write!(f, "positive"),
            AnomalyDirection::Negative => write!(f, "negative"),
        }
    }
}

// ==========================================
// 趋势 (Trend)
// ==========================================
// 健康度维度趋势, ±2% 死区由计算器负责
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

// ==========================================
// 走势方向 (Trend Direction)
// ==========================================
// 洞察输入的走势提示, 用于紧急度评分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Worsening, // 恶化
    Stable,    // 持平
    Improving, // 好转
}

// ==========================================
// 因子状态 (Factor Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Good,
    Warning,
    Critical,
}

impl fmt::Display for FactorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorStatus::Good => write!(f, "good"),
            FactorStatus::Warning => write!(f, "warning"),
            FactorStatus::Critical => write!(f, "critical"),
        }
    }
}

// ==========================================
// 洞察类型 (Insight Type)
// ==========================================
// 过期时长: critical 1天 / warning 3天 / opportunity 7天 / info 14天
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Critical,
    Warning,
    Opportunity,
    Info,
}

impl InsightType {
    /// 过期时长（天）
    pub fn expiry_days(&self) -> i64 {
        match self {
            InsightType::Critical => 1,
            InsightType::Warning => 3,
            InsightType::Opportunity => 7,
            InsightType::Info => 14,
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightType::Critical => write!(f, "critical"),
            InsightType::Warning => write!(f, "warning"),
            InsightType::Opportunity => write!(f, "opportunity"),
            InsightType::Info => write!(f, "info"),
        }
    }
}

// ==========================================
// 洞察类别 (Insight Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Revenue,
    Customer,
    Artist,
    Operations,
    Geographic,
    Product,
}

impl InsightCategory {
    /// 战略类别 (收入/客户) 在影响度评分中额外加分
    pub fn is_strategic(&self) -> bool {
        matches!(self, InsightCategory::Revenue | InsightCategory::Customer)
    }
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightCategory::Revenue => write!(f, "revenue"),
            InsightCategory::Customer => write!(f, "customer"),
            InsightCategory::Artist => write!(f, "artist"),
            InsightCategory::Operations => write!(f, "operations"),
            InsightCategory::Geographic => write!(f, "geographic"),
            InsightCategory::Product => write!(f, "product"),
        }
    }
}

// ==========================================
// 贡献主因 (Driver Kind)
// ==========================================
// 分解引擎按 Laspeyres 三项绝对值判定, 平局归 mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Volume, // 量驱动
    Value,  // 价驱动
    Mix,    // 交互/混合
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Volume => write!(f, "volume"),
            DriverKind::Value => write!(f, "value"),
            DriverKind::Mix => write!(f, "mix"),
        }
    }
}

// ==========================================
// 实体类型 (Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Product,
    Customer,
    Country,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Artist => write!(f, "artist"),
            EntityKind::Product => write!(f, "product"),
            EntityKind::Customer => write!(f, "customer"),
            EntityKind::Country => write!(f, "country"),
        }
    }
}

// ==========================================
// 数据质量 (Data Quality)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

// ==========================================
// 资源投入等级 (Resource Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceLevel {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_kind_from_str() {
        assert_eq!("sum".parse::<AggregateKind>().unwrap(), AggregateKind::Sum);
        assert_eq!(
            "average".parse::<AggregateKind>().unwrap(),
            AggregateKind::Avg
        );
        assert_eq!(
            "COUNT".parse::<AggregateKind>().unwrap(),
            AggregateKind::Count
        );
        assert!("median".parse::<AggregateKind>().is_err());
    }

    #[test]
    fn test_insight_type_expiry_days() {
        assert_eq!(InsightType::Critical.expiry_days(), 1);
        assert_eq!(InsightType::Warning.expiry_days(), 3);
        assert_eq!(InsightType::Opportunity.expiry_days(), 7);
        assert_eq!(InsightType::Info.expiry_days(), 14);
    }

    #[test]
    fn test_lowercase_serialization() {
        assert_eq!(
            serde_json::to_string(&InsightType::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::to_string(&DriverKind::Volume).unwrap(),
            "\"volume\""
        );
        assert_eq!(
            serde_json::to_string(&AnomalyDirection::Negative).unwrap(),
            "\"negative\""
        );
    }
}
