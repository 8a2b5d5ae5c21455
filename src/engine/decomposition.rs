// ==========================================
// 跨境电商业务分析引擎 - 变化分解引擎
// ==========================================
// 职责: 把两期指标总变化归因到 量/价/混合 三效应,
//       再按细分与实体给出排名贡献
// 红线: 无状态引擎; 空输入产出零值结果, 永不报错
// ==========================================
// 恒等式: volume + value + mix == currTotal − prevTotal
//         (代数构造保证, 属必测性质)
// ==========================================

use chrono::{DateTime, Utc};

use crate::domain::decomposition::{
    DecompositionConfig, DecompositionResult, EntityContributor, SegmentContribution, SegmentSpec,
};
use crate::domain::record::Record;
use crate::domain::types::DriverKind;
use crate::engine::aggregate;
use crate::error::EngineResult;
use crate::i18n::t_with_args;

// 细分贡献的忽略阈值
const SEGMENT_CONTRIBUTION_FLOOR: f64 = 0.01;
// 实体贡献的忽略阈值
const ENTITY_CONTRIBUTION_FLOOR: f64 = 1.0;
// 实体贡献者保留数
const TOP_CONTRIBUTOR_LIMIT: usize = 20;

// ==========================================
// DecompositionEngine - 变化分解引擎
// ==========================================
pub struct DecompositionEngine {
    config: DecompositionConfig,
}

impl DecompositionEngine {
    /// 创建分解引擎 (配置错误在此快速失败)
    pub fn new(config: DecompositionConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecompositionConfig {
        &self.config
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行变化分解 (期间范围缺失时降级为当前时刻)
    pub fn decompose(&self, current: &[Record], previous: &[Record]) -> DecompositionResult {
        self.decompose_at(current, previous, Utc::now())
    }

    /// 执行变化分解, 显式传入"当前时刻" (输出可复现)
    pub fn decompose_at(
        &self,
        current: &[Record],
        previous: &[Record],
        now: DateTime<Utc>,
    ) -> DecompositionResult {
        let field = &self.config.primary_metric_field;

        let current_total = aggregate::sum_field(current.iter(), field);
        let previous_total = aggregate::sum_field(previous.iter(), field);
        let total_change = current_total - previous_total;
        let total_change_percent = aggregate::growth_rate(current_total, previous_total);

        // Level 1: 量/价/混合 (Laspeyres 分解, 行数作为量代理)
        let (volume_effect, value_effect, mix_effect) =
            Self::decompose_volume_value(current, previous, current_total, previous_total);

        // Level 2: 细分贡献
        let by_segment = self.decompose_by_segments(current, previous, total_change);

        // Level 3: 实体贡献者
        let top_contributors = self.identify_top_contributors(current, previous, total_change);

        // 确定性模板解释行
        let explanation = Self::build_explanation(
            total_change,
            total_change_percent,
            volume_effect,
            value_effect,
            &by_segment,
            &top_contributors,
        );

        tracing::debug!(
            total_change,
            segments = by_segment.len(),
            contributors = top_contributors.len(),
            "变化分解完成"
        );

        DecompositionResult {
            current_period: aggregate::date_range(current, &self.config.timestamp_field, now),
            previous_period: aggregate::date_range(previous, &self.config.timestamp_field, now),
            total_change,
            total_change_percent,
            volume_effect,
            value_effect,
            mix_effect,
            by_segment,
            top_contributors,
            explanation,
        }
    }

    // ==========================================
    // Level 1: 量/价/混合分解
    // ==========================================

    fn decompose_volume_value(
        current: &[Record],
        previous: &[Record],
        current_total: f64,
        previous_total: f64,
    ) -> (f64, f64, f64) {
        let curr_volume = current.len() as f64;
        let prev_volume = previous.len() as f64;

        let curr_avg = aggregate::safe_ratio(current_total, curr_volume);
        let prev_avg = aggregate::safe_ratio(previous_total, prev_volume);

        // 量效应: (Q1 − Q0) × P0
        let volume_effect = (curr_volume - prev_volume) * prev_avg;
        // 价效应: (P1 − P0) × Q0
        let value_effect = (curr_avg - prev_avg) * prev_volume;
        // 混合效应: (Q1 − Q0) × (P1 − P0)
        let mix_effect = (curr_volume - prev_volume) * (curr_avg - prev_avg);

        (volume_effect, value_effect, mix_effect)
    }

    // ==========================================
    // Level 2: 细分贡献
    // ==========================================

    fn decompose_by_segments(
        &self,
        current: &[Record],
        previous: &[Record],
        total_change: f64,
    ) -> Vec<SegmentContribution> {
        let mut contributions = Vec::new();

        for segment in &self.config.segments {
            contributions.extend(self.decompose_by_segment(current, previous, segment, total_change));
        }

        contributions.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        contributions
    }

    fn decompose_by_segment(
        &self,
        current: &[Record],
        previous: &[Record],
        segment: &SegmentSpec,
        total_change: f64,
    ) -> Vec<SegmentContribution> {
        let field = &self.config.primary_metric_field;
        let current_groups = aggregate::group_by_text(current.iter(), &segment.field);
        let previous_groups = aggregate::group_by_text(previous.iter(), &segment.field);

        // 两期键的并集 (BTreeMap 键已排序, 遍历顺序稳定)
        let mut keys: Vec<&String> = current_groups.keys().collect();
        for key in previous_groups.keys() {
            if !current_groups.contains_key(key) {
                keys.push(key);
            }
        }

        let mut contributions = Vec::new();
        for key in keys {
            let curr_rows = current_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
            let prev_rows = previous_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);

            let current_value = aggregate::sum_field(curr_rows.iter().copied(), field);
            let previous_value = aggregate::sum_field(prev_rows.iter().copied(), field);
            let contribution = current_value - previous_value;

            // 忽略噪声级贡献
            if contribution.abs() < SEGMENT_CONTRIBUTION_FLOOR {
                continue;
            }

            let driver = Self::classify_driver(
                curr_rows.len() as f64,
                prev_rows.len() as f64,
                current_value,
                previous_value,
            );

            contributions.push(SegmentContribution {
                segment: segment.name.clone(),
                segment_value: key.clone(),
                contribution,
                contribution_percent: aggregate::safe_ratio(contribution, total_change),
                current_value,
                previous_value,
                driver,
            });
        }

        contributions
    }

    /// 贡献主因判定: 组内再做一次 Laspeyres 三项分解,
    /// 取绝对值严格最大的一项; 平局(含三方平局)归 mix
    fn classify_driver(
        curr_count: f64,
        prev_count: f64,
        current_value: f64,
        previous_value: f64,
    ) -> DriverKind {
        let curr_avg = aggregate::safe_ratio(current_value, curr_count);
        let prev_avg = aggregate::safe_ratio(previous_value, prev_count);

        let volume_term = ((curr_count - prev_count) * prev_avg).abs();
        let value_term = ((curr_avg - prev_avg) * prev_count).abs();
        let mix_term = ((curr_count - prev_count) * (curr_avg - prev_avg)).abs();

        if volume_term > value_term && volume_term > mix_term {
            DriverKind::Volume
        } else if value_term > volume_term && value_term > mix_term {
            DriverKind::Value
        } else {
            DriverKind::Mix
        }
    }

    // ==========================================
    // Level 3: 实体贡献者
    // ==========================================

    fn identify_top_contributors(
        &self,
        current: &[Record],
        previous: &[Record],
        total_change: f64,
    ) -> Vec<EntityContributor> {
        let field = &self.config.primary_metric_field;
        let mut contributors = Vec::new();

        for (entity, id_field) in self.config.identifiers.configured() {
            let current_groups = aggregate::group_by_text(current.iter(), id_field);
            let previous_groups = aggregate::group_by_text(previous.iter(), id_field);

            let mut keys: Vec<&String> = current_groups.keys().collect();
            for key in previous_groups.keys() {
                if !current_groups.contains_key(key) {
                    keys.push(key);
                }
            }

            for key in keys {
                let curr_rows = current_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
                let prev_rows = previous_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);

                let current_value = aggregate::sum_field(curr_rows.iter().copied(), field);
                let previous_value = aggregate::sum_field(prev_rows.iter().copied(), field);
                let contribution = current_value - previous_value;

                if contribution.abs() < ENTITY_CONTRIBUTION_FLOOR {
                    continue;
                }

                contributors.push(EntityContributor {
                    entity,
                    name: key.clone(),
                    contribution,
                    contribution_percent: aggregate::safe_ratio(contribution, total_change),
                    is_new: prev_rows.is_empty() && !curr_rows.is_empty(),
                });
            }
        }

        contributors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        contributors.truncate(TOP_CONTRIBUTOR_LIMIT);
        contributors
    }

    // ==========================================
    // 解释行生成 (纯模板拼装, 非 LLM)
    // ==========================================

    fn build_explanation(
        total_change: f64,
        total_change_percent: f64,
        volume_effect: f64,
        value_effect: f64,
        segments: &[SegmentContribution],
        contributors: &[EntityContributor],
    ) -> Vec<String> {
        let mut lines = Vec::new();

        // 总变化
        let percent = format!("{:.1}", (total_change_percent * 100.0).abs());
        let amount = format_amount(total_change.abs());
        let key = if total_change >= 0.0 {
            "decomposition.total_increase"
        } else {
            "decomposition.total_decrease"
        };
        lines.push(t_with_args(
            key,
            &[("percent", percent.as_str()), ("amount", amount.as_str())],
        ));

        // 量 vs 价 主因 (按效应绝对值比较)
        let dominant_effect = if volume_effect.abs() > value_effect.abs() {
            ("decomposition.driver_volume", volume_effect)
        } else {
            ("decomposition.driver_value", value_effect)
        };
        let effect_percent = if total_change != 0.0 {
            format!("{:.0}", (dominant_effect.1 / total_change * 100.0).abs())
        } else {
            "0".to_string()
        };
        lines.push(t_with_args(
            dominant_effect.0,
            &[("percent", effect_percent.as_str())],
        ));

        // 前 3 细分
        if !segments.is_empty() {
            let list = segments
                .iter()
                .take(3)
                .map(|s| {
                    format!(
                        "{}:{} ({:.0}%)",
                        s.segment,
                        s.segment_value,
                        s.contribution_percent * 100.0
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(t_with_args(
                "decomposition.top_segments",
                &[("list", list.as_str())],
            ));
        }

        // 前 3 贡献者
        if !contributors.is_empty() {
            let new_tag = crate::i18n::t("decomposition.new_tag");
            let list = contributors
                .iter()
                .take(3)
                .map(|c| {
                    format!(
                        "{}{} ({:.0}%)",
                        c.name,
                        if c.is_new { new_tag.as_str() } else { "" },
                        c.contribution_percent * 100.0
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(t_with_args(
                "decomposition.top_contributors",
                &[("list", list.as_str())],
            ));
        }

        lines
    }
}

/// 金额格式化: 取整 + 千分位
fn format_amount(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.abs().to_string();
    let mut formatted = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }
    if rounded < 0 {
        format!("-{}", formatted)
    } else {
        formatted
    }
}
