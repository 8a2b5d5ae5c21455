// ==========================================
// 跨境电商业务分析引擎 - 立方体分析领域对象
// ==========================================
// 职责: N 维立方体分析的配置与输出结构
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{AggregateKind, AnomalyDirection};
use crate::error::{EngineError, EngineResult};

// ==========================================
// 维度定义 (Cube Dimension)
// ==========================================
/// 分类维度: 名称 + 来源字段 + 可选固定取值表
///
/// 未给定固定取值表时, 合法取值在分析时从数据中发现
/// (来源字段的非空去重文本值, 按首次出现顺序)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeDimension {
    pub name: String,
    pub field: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl CubeDimension {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            values: None,
        }
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = Some(values);
        self
    }
}

// ==========================================
// 指标定义 (Cube Metric)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeMetric {
    pub name: String,
    pub field: String,
    pub aggregation: AggregateKind,
}

impl CubeMetric {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        aggregation: AggregateKind,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            aggregation,
        }
    }
}

// ==========================================
// 立方体配置 (Cube Config)
// ==========================================
/// 默认值: min_sample_size=5, deviation_threshold=0.30
///
/// max_combinations 为显式上限(可选): 超限时 analyze 直接
/// 报错, 绝不静默截断; None 表示不设上限, 维度基数由调用方负责。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeConfig {
    pub dimensions: Vec<CubeDimension>,
    pub metrics: Vec<CubeMetric>,
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: usize,
    #[serde(default = "default_deviation_threshold")]
    pub deviation_threshold: f64,
    #[serde(default)]
    pub max_combinations: Option<u64>,
}

fn default_min_sample_size() -> usize {
    5
}

fn default_deviation_threshold() -> f64 {
    0.30
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            dimensions: Vec::new(),
            metrics: Vec::new(),
            min_sample_size: default_min_sample_size(),
            deviation_threshold: default_deviation_threshold(),
            max_combinations: None,
        }
    }
}

impl CubeConfig {
    /// 构造期校验 (配置错误快速失败, 不进分析流程)
    pub fn validate(&self) -> EngineResult<()> {
        if self.metrics.is_empty() {
            return Err(EngineError::InvalidConfig(
                "至少需要一个指标定义".to_string(),
            ));
        }
        for metric in &self.metrics {
            if metric.name.is_empty() || metric.field.is_empty() {
                return Err(EngineError::InvalidConfig(format!(
                    "指标名称与来源字段不能为空: name={}, field={}",
                    metric.name, metric.field
                )));
            }
        }
        for dim in &self.dimensions {
            if dim.name.is_empty() || dim.field.is_empty() {
                return Err(EngineError::InvalidConfig(format!(
                    "维度名称与来源字段不能为空: name={}, field={}",
                    dim.name, dim.field
                )));
            }
        }
        let mut dim_names: Vec<&str> = self.dimensions.iter().map(|d| d.name.as_str()).collect();
        dim_names.sort_unstable();
        dim_names.dedup();
        if dim_names.len() != self.dimensions.len() {
            return Err(EngineError::InvalidConfig("维度名称重复".to_string()));
        }
        let mut metric_names: Vec<&str> = self.metrics.iter().map(|m| m.name.as_str()).collect();
        metric_names.sort_unstable();
        metric_names.dedup();
        if metric_names.len() != self.metrics.len() {
            return Err(EngineError::InvalidConfig("指标名称重复".to_string()));
        }
        if self.min_sample_size == 0 {
            return Err(EngineError::InvalidConfig(
                "最小样本量必须不小于 1".to_string(),
            ));
        }
        if !self.deviation_threshold.is_finite() || self.deviation_threshold < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "偏差阈值非法: {}",
                self.deviation_threshold
            )));
        }
        Ok(())
    }
}

// ==========================================
// 立方体单元 (Cube Cell)
// ==========================================
/// 一个维度取值组合的评估结果
///
/// 仅当样本量 ≥ min_sample_size 时产出; 无持久化,
/// 每次分析调用重新计算 (无状态)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeCell {
    /// 维度 → 取值
    pub dimensions: BTreeMap<String, String>,
    /// 指标 → 聚合值
    pub metrics: BTreeMap<String, f64>,
    pub sample_size: usize,
    /// 首个指标的全局基准值
    pub benchmark: f64,
    pub deviation: f64,
    pub deviation_percent: f64,
    pub is_anomaly: bool,
    pub anomaly_direction: Option<AnomalyDirection>,
}

// ==========================================
// 立方体分析结果 (Cube Analysis Result)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeAnalysisResult {
    /// 候选组合总数 (笛卡尔积)
    pub total_combinations: u64,
    /// 通过样本量下限的单元数
    pub analyzed_cells: usize,
    pub cells: Vec<CubeCell>,
    pub anomalies: Vec<CubeCell>,
    /// 正向异常, 按 |偏差%| 降序, 至多 10 条
    pub top_positive: Vec<CubeCell>,
    /// 负向异常, 按 |偏差%| 降序, 至多 10 条
    pub top_negative: Vec<CubeCell>,
    pub elapsed_ms: u64,
}
