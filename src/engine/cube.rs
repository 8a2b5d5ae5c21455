// ==========================================
// 跨境电商业务分析引擎 - N 维立方体分析器
// ==========================================
// 职责: 枚举全部维度取值组合, 按全局基准检出异常切片
// 红线: 无状态引擎; 数据质量问题一律降级为空结果,
//       只有组合数超限(显式配置上限)才报错
// ==========================================
// 复杂度: 记录扫描数 × 组合数; 组合数为各维度基数之积,
//         维度基数由调用方负责约束 (文档化风险, 不默认截断)
// ==========================================

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::domain::cube::{CubeAnalysisResult, CubeCell, CubeConfig, CubeDimension};
use crate::domain::record::Record;
use crate::domain::types::AnomalyDirection;
use crate::engine::aggregate;
use crate::error::{EngineError, EngineResult};

// ==========================================
// CubeAnalyzer - 立方体分析器
// ==========================================
pub struct CubeAnalyzer {
    config: CubeConfig,
}

impl CubeAnalyzer {
    /// 创建分析器 (配置错误在此快速失败)
    pub fn new(config: CubeConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行立方体分析
    ///
    /// 空输入产出显式空结果 (零组合/零单元, 耗时仍记录)。
    /// 唯一的错误路径是组合数超过 max_combinations 显式上限。
    pub fn analyze(&self, records: &[Record]) -> EngineResult<CubeAnalysisResult> {
        let start = Instant::now();

        if records.is_empty() {
            return Ok(Self::empty_result(start));
        }

        // 1. 维度取值集
        let dimension_values = self.extract_dimension_values(records);

        // 2. 组合总数 (笛卡尔积), 超限直接报错, 不做静默截断
        let total_combinations: u128 = dimension_values
            .iter()
            .map(|(_, values)| values.len() as u128)
            .product();
        if let Some(limit) = self.config.max_combinations {
            if total_combinations > limit as u128 {
                return Err(EngineError::CombinationLimitExceeded {
                    actual: total_combinations.min(u64::MAX as u128) as u64,
                    limit,
                });
            }
        }

        // 3. 全局基准: 每个指标对全量记录聚合一次
        let benchmark: BTreeMap<String, f64> = self
            .config
            .metrics
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    aggregate::aggregate(records.iter(), &m.field, m.aggregation),
                )
            })
            .collect();

        // 4. 逐组合过滤/聚合
        let combinations = Self::generate_combinations(&dimension_values);
        let cells = self.analyze_cells(records, &combinations, &benchmark);

        // 5. 异常子集与正负 Top 10
        let anomalies: Vec<CubeCell> = cells.iter().filter(|c| c.is_anomaly).cloned().collect();

        let mut sorted = anomalies.clone();
        sorted.sort_by(|a, b| {
            b.deviation_percent
                .abs()
                .total_cmp(&a.deviation_percent.abs())
        });

        let top_positive: Vec<CubeCell> = sorted
            .iter()
            .filter(|c| c.deviation_percent > 0.0)
            .take(10)
            .cloned()
            .collect();
        let top_negative: Vec<CubeCell> = sorted
            .iter()
            .filter(|c| c.deviation_percent < 0.0)
            .take(10)
            .cloned()
            .collect();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            total_combinations = total_combinations as u64,
            analyzed_cells = cells.len(),
            anomalies = anomalies.len(),
            elapsed_ms,
            "立方体分析完成"
        );

        Ok(CubeAnalysisResult {
            total_combinations: total_combinations.min(u64::MAX as u128) as u64,
            analyzed_cells: cells.len(),
            cells,
            anomalies,
            top_positive,
            top_negative,
            elapsed_ms,
        })
    }

    /// 固定部分维度后对新维度钻取
    ///
    /// 先按固定维度过滤记录, 再用单维度配置委托一个新分析器。
    pub fn drill_down(
        &self,
        records: &[Record],
        fixed_dimensions: &BTreeMap<String, String>,
        drill_dimension: CubeDimension,
    ) -> EngineResult<CubeAnalysisResult> {
        let filtered: Vec<Record> = records
            .iter()
            .filter(|row| self.matches_fixed(row, fixed_dimensions))
            .cloned()
            .collect();

        let drill_analyzer = CubeAnalyzer::new(CubeConfig {
            dimensions: vec![drill_dimension],
            metrics: self.config.metrics.clone(),
            min_sample_size: self.config.min_sample_size,
            deviation_threshold: self.config.deviation_threshold,
            max_combinations: self.config.max_combinations,
        })?;

        drill_analyzer.analyze(&filtered)
    }

    // ==========================================
    // 维度取值发现
    // ==========================================

    /// 每个维度的合法取值: 优先固定取值表,
    /// 否则取数据中首次出现顺序的非空去重文本值
    fn extract_dimension_values(&self, records: &[Record]) -> Vec<(&CubeDimension, Vec<String>)> {
        self.config
            .dimensions
            .iter()
            .map(|dim| {
                let values = match &dim.values {
                    Some(fixed) if !fixed.is_empty() => fixed.clone(),
                    _ => {
                        let mut seen = HashSet::new();
                        let mut values = Vec::new();
                        for row in records {
                            if let Some(value) = row.text(&dim.field) {
                                if seen.insert(value.clone()) {
                                    values.push(value);
                                }
                            }
                        }
                        values
                    }
                };
                (dim, values)
            })
            .collect()
    }

    // ==========================================
    // 组合枚举 (笛卡尔积)
    // ==========================================

    /// 零维度时返回一个空组合 (代表"整体")
    fn generate_combinations(
        dimension_values: &[(&CubeDimension, Vec<String>)],
    ) -> Vec<Vec<String>> {
        let mut combinations: Vec<Vec<String>> = vec![Vec::new()];

        for (_, values) in dimension_values {
            let mut next = Vec::with_capacity(combinations.len() * values.len());
            for combo in &combinations {
                for value in values {
                    let mut extended = combo.clone();
                    extended.push(value.clone());
                    next.push(extended);
                }
            }
            combinations = next;
        }

        combinations
    }

    // ==========================================
    // 单元分析
    // ==========================================

    fn analyze_cells(
        &self,
        records: &[Record],
        combinations: &[Vec<String>],
        benchmark: &BTreeMap<String, f64>,
    ) -> Vec<CubeCell> {
        let mut cells = Vec::new();
        // 首个指标为主指标
        let primary = &self.config.metrics[0];
        let benchmark_value = benchmark.get(&primary.name).copied().unwrap_or(0.0);

        for combo in combinations {
            let filtered: Vec<&Record> = records
                .iter()
                .filter(|row| self.matches_combination(row, combo))
                .collect();

            // 样本量下限: 不足则该组合不产出单元
            if filtered.len() < self.config.min_sample_size {
                continue;
            }

            let metrics: BTreeMap<String, f64> = self
                .config
                .metrics
                .iter()
                .map(|m| {
                    (
                        m.name.clone(),
                        aggregate::aggregate(filtered.iter().copied(), &m.field, m.aggregation),
                    )
                })
                .collect();

            let cell_value = metrics.get(&primary.name).copied().unwrap_or(0.0);
            let deviation = cell_value - benchmark_value;
            let deviation_percent = aggregate::safe_ratio(deviation, benchmark_value);

            let is_anomaly = deviation_percent.abs() > self.config.deviation_threshold;
            let anomaly_direction = if is_anomaly {
                Some(if deviation_percent > 0.0 {
                    AnomalyDirection::Positive
                } else {
                    AnomalyDirection::Negative
                })
            } else {
                None
            };

            let dimensions: BTreeMap<String, String> = self
                .config
                .dimensions
                .iter()
                .zip(combo.iter())
                .map(|(dim, value)| (dim.name.clone(), value.clone()))
                .collect();

            cells.push(CubeCell {
                dimensions,
                metrics,
                sample_size: filtered.len(),
                benchmark: benchmark_value,
                deviation,
                deviation_percent,
                is_anomaly,
                anomaly_direction,
            });
        }

        cells
    }

    /// 行匹配组合: 每个维度上行值(文本化)须等于组合指定值
    fn matches_combination(&self, row: &Record, combo: &[String]) -> bool {
        self.config
            .dimensions
            .iter()
            .zip(combo.iter())
            .all(|(dim, value)| {
                row.text(&dim.field).unwrap_or_default() == *value
            })
    }

    /// 行匹配固定维度 (钻取用; 仅约束已配置的维度)
    fn matches_fixed(&self, row: &Record, fixed: &BTreeMap<String, String>) -> bool {
        self.config.dimensions.iter().all(|dim| {
            match fixed.get(&dim.name) {
                Some(value) => row.text(&dim.field).unwrap_or_default() == *value,
                None => true,
            }
        })
    }

    fn empty_result(start: Instant) -> CubeAnalysisResult {
        CubeAnalysisResult {
            total_combinations: 0,
            analyzed_cells: 0,
            cells: Vec::new(),
            anomalies: Vec::new(),
            top_positive: Vec::new(),
            top_negative: Vec::new(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }
}
