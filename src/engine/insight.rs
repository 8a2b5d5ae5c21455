// ==========================================
// 跨境电商业务分析引擎 - 洞察评分器
// ==========================================
// 职责: 把原始观察打成五维 0-100 子评分,
//       加权合成总分, 再做分类/优先级/时效标注
// 红线: 可选字段缺失走文档化兜底, 评分绝不报错;
//       各桶阈值为既定业务口径, 禁止"顺手调参"
// ==========================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cube::CubeCell;
use crate::domain::insight::{
    BusinessContext, BusinessInsight, InsightEvidence, InsightScores, RawInsight,
};
use crate::domain::types::{
    AnomalyDirection, DataQuality, InsightCategory, InsightType, ResourceLevel, TrendDirection,
};
use crate::error::{EngineError, EngineResult};
use crate::i18n::{t, t_with_args};

// ==========================================
// 评分权重 (Scoring Weights)
// ==========================================
/// 五维子评分的加权系数, 需在 [0,1] 且合计为 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub significance: f64,
    pub impact: f64,
    pub actionability: f64,
    pub urgency: f64,
    pub confidence: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            significance: 0.15,
            impact: 0.35,
            actionability: 0.20,
            urgency: 0.20,
            confidence: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> EngineResult<()> {
        let all = [
            self.significance,
            self.impact,
            self.actionability,
            self.urgency,
            self.confidence,
        ];
        for w in all {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(EngineError::InvalidConfig(format!("权重越界: {}", w)));
            }
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::InvalidConfig(format!(
                "权重合计必须为 1, 实际 {}",
                sum
            )));
        }
        Ok(())
    }
}

// ==========================================
// 过滤选项 (Score Filter Options)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFilterOptions {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    #[serde(default)]
    pub types: Option<Vec<InsightType>>,
}

fn default_min_score() -> f64 {
    40.0
}

fn default_max_count() -> usize {
    50
}

impl Default for ScoreFilterOptions {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            max_count: default_max_count(),
            types: None,
        }
    }
}

// ==========================================
// 统计证据 (Statistical Evidence)
// ==========================================
// 兜底链: p 值 > z 分 > 偏差比; 三者皆缺则无证据
#[derive(Debug, Clone, Copy, PartialEq)]
enum StatisticalEvidence {
    PValue(f64),
    ZScore(f64),
    DeviationOnly(f64),
    None,
}

impl StatisticalEvidence {
    fn from_raw(raw: &RawInsight) -> Self {
        if let Some(p) = raw.p_value {
            StatisticalEvidence::PValue(p)
        } else if let Some(z) = raw.z_score {
            StatisticalEvidence::ZScore(z)
        } else {
            let ratio = deviation_ratio(raw);
            if ratio > 0.0 {
                StatisticalEvidence::DeviationOnly(ratio)
            } else {
                StatisticalEvidence::None
            }
        }
    }

    fn points(self) -> f64 {
        match self {
            StatisticalEvidence::PValue(p) => {
                if p < 0.01 {
                    40.0
                } else if p < 0.05 {
                    30.0
                } else if p < 0.10 {
                    15.0
                } else {
                    0.0
                }
            }
            StatisticalEvidence::ZScore(z) => {
                let z = z.abs();
                if z > 3.0 {
                    40.0
                } else if z > 2.5 {
                    35.0
                } else if z > 2.0 {
                    30.0
                } else if z > 1.5 {
                    15.0
                } else {
                    0.0
                }
            }
            StatisticalEvidence::DeviationOnly(ratio) => {
                if ratio > 0.5 {
                    30.0
                } else if ratio > 0.3 {
                    20.0
                } else if ratio > 0.2 {
                    10.0
                } else {
                    0.0
                }
            }
            StatisticalEvidence::None => 0.0,
        }
    }
}

/// 偏差比: |偏差 / 对照值|, 对照为 0 时分母按 1 处理
fn deviation_ratio(raw: &RawInsight) -> f64 {
    let base = if raw.comparison_value == 0.0 {
        1.0
    } else {
        raw.comparison_value
    };
    (raw.deviation / base).abs()
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

// ==========================================
// InsightScorer - 洞察评分器
// ==========================================
pub struct InsightScorer {
    weights: ScoringWeights,
}

impl Default for InsightScorer {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }
}

impl InsightScorer {
    /// 创建评分器 (权重非法时快速失败)
    pub fn new(weights: ScoringWeights) -> EngineResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 对单条原始观察评分
    pub fn score(&self, raw: &RawInsight, context: &BusinessContext) -> BusinessInsight {
        self.score_at(raw, context, Utc::now())
    }

    /// 对单条原始观察评分, 显式传入创建时刻 (输出可复现)
    pub fn score_at(
        &self,
        raw: &RawInsight,
        context: &BusinessContext,
        now: DateTime<Utc>,
    ) -> BusinessInsight {
        let scores = InsightScores {
            statistical_significance: Self::significance_score(raw),
            business_impact: Self::impact_score(raw, context),
            actionability: Self::actionability_score(raw),
            urgency: Self::urgency_score(raw),
            confidence: Self::confidence_score(raw),
        };

        let total_score = self.weights.significance * scores.statistical_significance
            + self.weights.impact * scores.business_impact
            + self.weights.actionability * scores.actionability
            + self.weights.urgency * scores.urgency
            + self.weights.confidence * scores.confidence;

        let insight_type = Self::classify(raw, &scores);
        let priority = Self::priority(total_score, &scores);

        let deviation_percent = if raw.comparison_value == 0.0 {
            0.0
        } else {
            raw.deviation / raw.comparison_value
        };

        let (title, description) = Self::render_text(raw, deviation_percent);
        let evidence = vec![InsightEvidence {
            metric: raw.metric.clone(),
            value: raw.current_value,
            comparison: t_with_args(
                "insight.baseline",
                &[("value", format!("{:.2}", raw.comparison_value).as_str())],
            ),
            change: raw.deviation,
        }];

        BusinessInsight {
            id: Self::make_id(raw, now),
            insight_type,
            category: raw.category,
            title,
            description,
            metric: raw.metric.clone(),
            current_value: raw.current_value,
            comparison_value: raw.comparison_value,
            deviation: raw.deviation,
            deviation_percent,
            evidence,
            recommendation: Self::recommendation(insight_type),
            action_link: raw.action_link.clone(),
            priority,
            scores,
            total_score,
            created_at: now,
            expires_at: now + Duration::days(insight_type.expiry_days()),
        }
    }

    /// 批量评分 + 过滤 + 按优先级排序 + 截断
    pub fn score_and_filter(
        &self,
        raws: &[RawInsight],
        context: &BusinessContext,
        options: &ScoreFilterOptions,
    ) -> Vec<BusinessInsight> {
        self.score_and_filter_at(raws, context, options, Utc::now())
    }

    pub fn score_and_filter_at(
        &self,
        raws: &[RawInsight],
        context: &BusinessContext,
        options: &ScoreFilterOptions,
        now: DateTime<Utc>,
    ) -> Vec<BusinessInsight> {
        let mut insights: Vec<BusinessInsight> = raws
            .iter()
            .map(|raw| self.score_at(raw, context, now))
            .filter(|insight| insight.total_score >= options.min_score)
            .filter(|insight| match &options.types {
                Some(types) => types.contains(&insight.insight_type),
                None => true,
            })
            .collect();

        // 稳定排序: 优先级相同者保持输入顺序
        insights.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        insights.truncate(options.max_count);

        tracing::debug!(
            input = raws.len(),
            output = insights.len(),
            "洞察评分过滤完成"
        );
        insights
    }

    // ==========================================
    // 立方体异常适配
    // ==========================================

    /// 把立方体异常单元转成已评分洞察 (使用缺省业务上下文)
    pub fn score_anomalies(&self, anomalies: &[CubeCell]) -> Vec<BusinessInsight> {
        self.score_anomalies_at(anomalies, Utc::now())
    }

    pub fn score_anomalies_at(
        &self,
        anomalies: &[CubeCell],
        now: DateTime<Utc>,
    ) -> Vec<BusinessInsight> {
        let context = BusinessContext::default_for(now);
        anomalies
            .iter()
            .filter(|cell| cell.is_anomaly)
            .map(|cell| {
                let raw = Self::cell_to_raw(cell);
                self.score_at(&raw, &context, now)
            })
            .collect()
    }

    fn cell_to_raw(cell: &CubeCell) -> RawInsight {
        let dims = cell
            .dimensions
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        let primary = cell
            .metrics
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| t("common.unknown"));
        let metric = if dims.is_empty() {
            primary
        } else {
            format!("{} - {}", dims, primary)
        };

        let mut raw = RawInsight::new(
            Self::infer_category(cell),
            metric,
            cell.benchmark + cell.deviation,
            cell.benchmark,
            cell.deviation,
            cell.sample_size as u64,
        );
        raw.trend = Some(match cell.anomaly_direction {
            Some(AnomalyDirection::Negative) => TrendDirection::Worsening,
            _ => TrendDirection::Improving,
        });
        raw
    }

    /// 从维度字段名推断业务类别, 无匹配时归营收
    fn infer_category(cell: &CubeCell) -> InsightCategory {
        for name in cell.dimensions.keys() {
            let lower = name.to_lowercase();
            if lower.contains("country") || lower.contains("region") {
                return InsightCategory::Geographic;
            }
            if lower.contains("artist") {
                return InsightCategory::Artist;
            }
            if lower.contains("product") {
                return InsightCategory::Product;
            }
            if lower.contains("customer") || lower.contains("user") {
                return InsightCategory::Customer;
            }
        }
        InsightCategory::Revenue
    }

    // ==========================================
    // 五维子评分 (各桶阈值为既定业务口径)
    // ==========================================

    fn significance_score(raw: &RawInsight) -> f64 {
        let mut score = match raw.sample_size {
            n if n >= 100 => 30.0,
            n if n >= 50 => 25.0,
            n if n >= 30 => 20.0,
            n if n >= 10 => 10.0,
            _ => 5.0,
        };

        score += StatisticalEvidence::from_raw(raw).points();

        if let Some(d) = raw.effect_size {
            let d = d.abs();
            score += if d > 0.8 {
                30.0
            } else if d > 0.5 {
                20.0
            } else if d > 0.2 {
                10.0
            } else {
                0.0
            };
        }

        clamp_score(score)
    }

    fn impact_score(raw: &RawInsight, context: &BusinessContext) -> f64 {
        let mut score = 0.0;

        let revenue_ratio = raw
            .estimated_revenue_impact
            .filter(|_| context.total_revenue > 0.0)
            .map(|impact| (impact / context.total_revenue).abs());
        score += match revenue_ratio {
            Some(r) if r > 0.10 => 40.0,
            Some(r) if r > 0.05 => 30.0,
            Some(r) if r > 0.01 => 20.0,
            Some(r) if r > 0.001 => 10.0,
            Some(_) => 0.0,
            None => {
                // 营收影响缺失时退回偏差比
                let ratio = deviation_ratio(raw);
                if ratio > 0.3 {
                    25.0
                } else if ratio > 0.2 {
                    15.0
                } else if ratio > 0.1 {
                    10.0
                } else {
                    0.0
                }
            }
        };

        if let Some(affected) = raw.affected_count {
            if context.total_customers > 0 {
                let ratio = affected as f64 / context.total_customers as f64;
                score += if ratio > 0.2 {
                    30.0
                } else if ratio > 0.1 {
                    20.0
                } else if ratio > 0.05 {
                    10.0
                } else {
                    0.0
                };
            }
        }

        if raw.category.is_strategic() {
            score += 20.0;
        }

        clamp_score(score)
    }

    fn actionability_score(raw: &RawInsight) -> f64 {
        let mut score = 30.0;

        if raw.has_action {
            score += 40.0;
        } else if raw.action_link.is_some() {
            score += 30.0;
        }

        score += match raw.resource_required {
            Some(ResourceLevel::Low) => 20.0,
            Some(ResourceLevel::Medium) => 10.0,
            _ => 0.0,
        };

        score += match raw.time_to_impact_days {
            Some(days) if days <= 7 => 10.0,
            Some(days) if days <= 30 => 5.0,
            _ => 0.0,
        };

        clamp_score(score)
    }

    fn urgency_score(raw: &RawInsight) -> f64 {
        let mut score = 20.0;

        score += match raw.trend {
            Some(TrendDirection::Worsening) => 40.0,
            Some(TrendDirection::Stable) => 10.0,
            _ => 0.0,
        };

        score += match raw.days_to_threshold {
            Some(days) if days <= 3 => 40.0,
            Some(days) if days <= 7 => 30.0,
            Some(days) if days <= 14 => 20.0,
            Some(days) if days <= 30 => 10.0,
            _ => 0.0,
        };

        // 明确不可逆才加分, 未知不加
        if raw.reversible == Some(false) {
            score += 20.0;
        }

        clamp_score(score)
    }

    fn confidence_score(raw: &RawInsight) -> f64 {
        let mut score = 50.0;

        score += match raw.data_quality {
            Some(DataQuality::High) => 20.0,
            Some(DataQuality::Medium) => 10.0,
            Some(DataQuality::Low) => -20.0,
            None => 0.0,
        };

        if let Some(accuracy) = raw.model_accuracy {
            score += accuracy * 30.0;
        }
        if let Some(accuracy) = raw.historical_accuracy {
            score += accuracy * 20.0;
        }

        clamp_score(score)
    }

    // ==========================================
    // 分类 / 优先级 / 文案
    // ==========================================

    fn classify(raw: &RawInsight, scores: &InsightScores) -> InsightType {
        if scores.urgency >= 70.0 && raw.deviation < 0.0 {
            InsightType::Critical
        } else if scores.business_impact >= 60.0 && raw.deviation < 0.0 {
            InsightType::Warning
        } else if raw.deviation > 0.0 && scores.business_impact >= 40.0 {
            InsightType::Opportunity
        } else {
            InsightType::Info
        }
    }

    fn priority(total_score: f64, scores: &InsightScores) -> f64 {
        let mut priority = total_score;

        if scores.urgency >= 80.0 {
            priority += 20.0;
        } else if scores.urgency >= 60.0 {
            priority += 10.0;
        }

        if scores.business_impact >= 80.0 {
            priority += 15.0;
        } else if scores.business_impact >= 60.0 {
            priority += 5.0;
        }

        priority.min(100.0)
    }

    fn render_text(raw: &RawInsight, deviation_percent: f64) -> (String, String) {
        let percent = format!("{:.1}", (deviation_percent * 100.0).abs());
        let current = format!("{:.2}", raw.current_value);
        let comparison = format!("{:.2}", raw.comparison_value);

        if raw.deviation >= 0.0 {
            (
                t_with_args(
                    "insight.title_up",
                    &[("metric", raw.metric.as_str()), ("percent", percent.as_str())],
                ),
                t_with_args(
                    "insight.desc_up",
                    &[
                        ("metric", raw.metric.as_str()),
                        ("comparison", comparison.as_str()),
                        ("current", current.as_str()),
                    ],
                ),
            )
        } else {
            (
                t_with_args(
                    "insight.title_down",
                    &[("metric", raw.metric.as_str()), ("percent", percent.as_str())],
                ),
                t_with_args(
                    "insight.desc_down",
                    &[
                        ("metric", raw.metric.as_str()),
                        ("comparison", comparison.as_str()),
                        ("current", current.as_str()),
                    ],
                ),
            )
        }
    }

    fn recommendation(insight_type: InsightType) -> String {
        match insight_type {
            InsightType::Critical => t("insight.reco_critical"),
            InsightType::Warning => t("insight.reco_warning"),
            InsightType::Opportunity => t("insight.reco_opportunity"),
            InsightType::Info => t("insight.reco_info"),
        }
    }

    /// 确定性 ID: insight_{类别}_{毫秒时间戳}_{内容散列}
    fn make_id(raw: &RawInsight, now: DateTime<Utc>) -> String {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let mut feed = |bytes: &[u8]| {
            for byte in bytes {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
        };
        feed(raw.metric.as_bytes());
        feed(&raw.current_value.to_bits().to_le_bytes());
        feed(&raw.deviation.to_bits().to_le_bytes());

        format!(
            "insight_{}_{}_{:04x}",
            raw.category,
            now.timestamp_millis(),
            hash & 0xffff
        )
    }
}
