// ==========================================
// 跨境电商业务分析引擎 - 变化分解领域对象
// ==========================================
// 职责: 两期指标变化分解的配置与输出结构
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{DriverKind, EntityKind};
use crate::error::{EngineError, EngineResult};

// ==========================================
// 细分定义 (Segment Spec)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub name: String,
    pub field: String,
}

impl SegmentSpec {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
        }
    }
}

// ==========================================
// 实体标识字段 (Identifier Fields)
// ==========================================
/// 各实体类型对应的记录字段名, 缺省不参与贡献者分析
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentifierFields {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl IdentifierFields {
    /// 已配置的 (实体类型, 字段名) 列表, 顺序固定
    pub fn configured(&self) -> Vec<(EntityKind, &str)> {
        let mut fields = Vec::new();
        if let Some(f) = &self.artist {
            fields.push((EntityKind::Artist, f.as_str()));
        }
        if let Some(f) = &self.product {
            fields.push((EntityKind::Product, f.as_str()));
        }
        if let Some(f) = &self.customer {
            fields.push((EntityKind::Customer, f.as_str()));
        }
        if let Some(f) = &self.country {
            fields.push((EntityKind::Country, f.as_str()));
        }
        fields
    }
}

// ==========================================
// 分解配置 (Decomposition Config)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionConfig {
    /// 被分解的指标字段 (按行求和)
    pub primary_metric_field: String,
    /// 期间范围提取用的时间戳字段
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    #[serde(default)]
    pub segments: Vec<SegmentSpec>,
    #[serde(default)]
    pub identifiers: IdentifierFields,
}

fn default_timestamp_field() -> String {
    "order_created".to_string()
}

impl DecompositionConfig {
    pub fn new(primary_metric_field: impl Into<String>) -> Self {
        Self {
            primary_metric_field: primary_metric_field.into(),
            timestamp_field: default_timestamp_field(),
            segments: Vec::new(),
            identifiers: IdentifierFields::default(),
        }
    }

    /// 构造期校验
    pub fn validate(&self) -> EngineResult<()> {
        if self.primary_metric_field.is_empty() {
            return Err(EngineError::InvalidConfig(
                "分解指标字段不能为空".to_string(),
            ));
        }
        if self.timestamp_field.is_empty() {
            return Err(EngineError::InvalidConfig(
                "时间戳字段不能为空".to_string(),
            ));
        }
        for segment in &self.segments {
            if segment.name.is_empty() || segment.field.is_empty() {
                return Err(EngineError::InvalidConfig(format!(
                    "细分名称与来源字段不能为空: name={}, field={}",
                    segment.name, segment.field
                )));
            }
        }
        Ok(())
    }
}

// ==========================================
// 期间范围 (Period Range)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodRange {
    pub fn point(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }
}

// ==========================================
// 细分贡献 (Segment Contribution)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentContribution {
    pub segment: String,
    pub segment_value: String,
    /// 带符号贡献额 (本期合计 − 上期合计)
    pub contribution: f64,
    /// 占总变化比例 (总变化为 0 时记 0)
    pub contribution_percent: f64,
    pub current_value: f64,
    pub previous_value: f64,
    pub driver: DriverKind,
}

// ==========================================
// 实体贡献者 (Entity Contributor)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContributor {
    pub entity: EntityKind,
    pub name: String,
    pub contribution: f64,
    pub contribution_percent: f64,
    /// 上期无记录且本期有记录
    pub is_new: bool,
}

// ==========================================
// 分解结果 (Decomposition Result)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub current_period: PeriodRange,
    pub previous_period: PeriodRange,
    pub total_change: f64,
    pub total_change_percent: f64,
    /// 量效应: (Q1−Q0)×P0
    pub volume_effect: f64,
    /// 价效应: (P1−P0)×Q0
    pub value_effect: f64,
    /// 混合效应: (Q1−Q0)×(P1−P0)
    pub mix_effect: f64,
    /// 全部细分贡献, 按 |贡献| 降序
    pub by_segment: Vec<SegmentContribution>,
    /// 各实体类型合并后的前 20 名贡献者
    pub top_contributors: Vec<EntityContributor>,
    /// 确定性模板解释行 (非 LLM 产出)
    pub explanation: Vec<String>,
}
