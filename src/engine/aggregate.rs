// ==========================================
// 跨境电商业务分析引擎 - 聚合辅助
// ==========================================
// 职责: 各引擎共享的数值聚合/分组/区间提取
// 约定: 不可解析为数值的单元格静默跳过;
//       空集合的任何聚合结果为 0
// ==========================================

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::decomposition::PeriodRange;
use crate::domain::record::Record;
use crate::domain::types::AggregateKind;

/// 对一组记录的某字段做聚合
///
/// count 统计的是可解析为数值的行数, 不是总行数。
pub fn aggregate<'a, I>(rows: I, field: &str, kind: AggregateKind) -> f64
where
    I: IntoIterator<Item = &'a Record>,
{
    let values: Vec<f64> = rows
        .into_iter()
        .filter_map(|row| row.number(field))
        .collect();

    if values.is_empty() {
        return 0.0;
    }

    match kind {
        AggregateKind::Sum => values.iter().sum(),
        AggregateKind::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregateKind::Count => values.len() as f64,
        AggregateKind::Max => values.iter().copied().fold(f64::MIN, f64::max),
        AggregateKind::Min => values.iter().copied().fold(f64::MAX, f64::min),
    }
}

/// 字段求和 (分解引擎的基础聚合)
pub fn sum_field<'a, I>(rows: I, field: &str) -> f64
where
    I: IntoIterator<Item = &'a Record>,
{
    rows.into_iter()
        .filter_map(|row| row.number(field))
        .sum()
}

/// 按字段文本值分组
///
/// 缺失/空值归入 "unknown" 组; BTreeMap 保证分组遍历顺序稳定。
pub fn group_by_text<'a, I>(rows: I, field: &str) -> BTreeMap<String, Vec<&'a Record>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for row in rows {
        let key = row.text(field).unwrap_or_else(|| "unknown".to_string());
        groups.entry(key).or_default().push(row);
    }
    groups
}

/// 变动系数 (标准差 / |均值|)
///
/// 样本不足两个或均值为 0 时定义为 0。
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt() / mean.abs()
}

/// 提取记录集的时间范围 (仅用于展示)
///
/// 时间戳缺失或全部不可解析时降级为 fallback, 不报错。
pub fn date_range(records: &[Record], field: &str, fallback: DateTime<Utc>) -> PeriodRange {
    let mut timestamps: Vec<DateTime<Utc>> = records
        .iter()
        .filter_map(|row| row.timestamp(field))
        .collect();

    if timestamps.is_empty() {
        return PeriodRange::point(fallback);
    }

    timestamps.sort_unstable();
    PeriodRange {
        start: timestamps[0],
        end: timestamps[timestamps.len() - 1],
    }
}

/// 比值守卫: 分母为 0 时定义为 0
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// 增长率守卫: 上期为 0 且本期为正时按"全新观测"记 100%
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous
    } else if current > 0.0 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Record> {
        vec![
            Record::new().with("amount", 100.0).with("country", "JP"),
            Record::new().with("amount", 200.0).with("country", "US"),
            Record::new().with("amount", "dirty").with("country", "JP"),
            Record::new().with("country", "JP"),
        ]
    }

    #[test]
    fn test_aggregate_skips_dirty_cells() {
        let records = rows();
        assert_eq!(
            aggregate(records.iter(), "amount", AggregateKind::Sum),
            300.0
        );
        assert_eq!(
            aggregate(records.iter(), "amount", AggregateKind::Avg),
            150.0
        );
        // count 只计可解析为数值的行
        assert_eq!(
            aggregate(records.iter(), "amount", AggregateKind::Count),
            2.0
        );
        assert_eq!(
            aggregate(records.iter(), "amount", AggregateKind::Max),
            200.0
        );
        assert_eq!(
            aggregate(records.iter(), "amount", AggregateKind::Min),
            100.0
        );
    }

    #[test]
    fn test_aggregate_empty_is_zero() {
        let records: Vec<Record> = Vec::new();
        for kind in [
            AggregateKind::Sum,
            AggregateKind::Avg,
            AggregateKind::Count,
            AggregateKind::Max,
            AggregateKind::Min,
        ] {
            assert_eq!(aggregate(records.iter(), "amount", kind), 0.0);
        }
    }

    #[test]
    fn test_group_by_text() {
        let records = rows();
        let groups = group_by_text(records.iter(), "country");
        assert_eq!(groups.get("JP").map(|g| g.len()), Some(3));
        assert_eq!(groups.get("US").map(|g| g.len()), Some(1));
    }

    #[test]
    fn test_group_by_missing_is_unknown() {
        let records = vec![Record::new().with("amount", 1.0)];
        let groups = group_by_text(records.iter(), "country");
        assert_eq!(groups.get("unknown").map(|g| g.len()), Some(1));
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[10.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[5.0, 5.0, 5.0]), 0.0);
        let cv = coefficient_of_variation(&[90.0, 100.0, 110.0]);
        assert!(cv > 0.0 && cv < 0.1);
    }

    #[test]
    fn test_growth_rate_conventions() {
        assert_eq!(growth_rate(120.0, 100.0), 0.2);
        // 全新观测: 上期 0 → 100%
        assert_eq!(growth_rate(50.0, 0.0), 1.0);
        assert_eq!(growth_rate(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_safe_ratio() {
        assert_eq!(safe_ratio(10.0, 0.0), 0.0);
        assert_eq!(safe_ratio(10.0, 4.0), 2.5);
    }
}
