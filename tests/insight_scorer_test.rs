// ==========================================
// InsightScorer 集成测试
// ==========================================
// 目标: 验证五维评分边界/分类/过滤排序/异常适配
// ==========================================

use business_brain_engine::{
    AggregateKind, BusinessContext, CubeAnalyzer, CubeConfig, CubeDimension, CubeMetric,
    DataQuality, InsightCategory, InsightScorer, InsightType, RawInsight, Record, ResourceLevel,
    ScoreFilterOptions, TrendDirection,
};
use chrono::{DateTime, TimeZone, Utc};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap()
}

fn context() -> BusinessContext {
    BusinessContext::default_for(fixed_now())
}

/// 强证据负偏差场景: 显著性打满, 紧急度 ≥90, 判定 critical
#[test]
fn test_critical_classification_with_strong_evidence() {
    let mut raw = RawInsight::new(
        InsightCategory::Revenue,
        "日本市场GMV",
        700_000.0,
        1_000_000.0,
        -300_000.0,
        150,
    );
    raw.p_value = Some(0.005);
    raw.effect_size = Some(0.9);
    raw.trend = Some(TrendDirection::Worsening);
    raw.days_to_threshold = Some(2);

    let scorer = InsightScorer::default();
    let insight = scorer.score_at(&raw, &context(), fixed_now());

    // 样本 150→30 + p<0.01→40 + |d|>0.8→30 = 100
    assert_eq!(insight.scores.statistical_significance, 100.0);
    assert!(insight.scores.urgency >= 90.0);
    assert_eq!(insight.insight_type, InsightType::Critical);
    // critical 的时效为 1 天
    assert_eq!(insight.expires_at - insight.created_at, chrono::Duration::days(1));
}

/// 边界性质: 任意输入下五个子评分/总分/优先级都在 [0,100]
#[test]
fn test_score_boundedness_across_inputs() {
    let scorer = InsightScorer::default();

    let mut variants: Vec<RawInsight> = Vec::new();
    for &sample in &[0u64, 9, 10, 29, 30, 49, 50, 99, 100, 10_000] {
        for &deviation in &[-1_000_000.0, -0.5, 0.0, 0.5, 1_000_000.0] {
            let mut raw = RawInsight::new(
                InsightCategory::Customer,
                "指标",
                100.0 + deviation,
                100.0,
                deviation,
                sample,
            );
            if sample % 2 == 0 {
                raw.p_value = Some(0.004);
                raw.effect_size = Some(2.0);
                raw.trend = Some(TrendDirection::Worsening);
                raw.days_to_threshold = Some(1);
                raw.reversible = Some(false);
                raw.has_action = true;
                raw.resource_required = Some(ResourceLevel::Low);
                raw.time_to_impact_days = Some(3);
                raw.data_quality = Some(DataQuality::High);
                raw.model_accuracy = Some(1.0);
                raw.historical_accuracy = Some(1.0);
                raw.estimated_revenue_impact = Some(deviation * 100.0);
                raw.affected_count = Some(sample * 10);
            }
            variants.push(raw);
        }
    }

    for raw in &variants {
        let insight = scorer.score_at(raw, &context(), fixed_now());
        let all = [
            insight.scores.statistical_significance,
            insight.scores.business_impact,
            insight.scores.actionability,
            insight.scores.urgency,
            insight.scores.confidence,
            insight.total_score,
            insight.priority,
        ];
        for value in all {
            assert!(
                (0.0..=100.0).contains(&value),
                "out of range: {} for sample={} deviation={}",
                value,
                raw.sample_size,
                raw.deviation
            );
        }
    }
}

/// 批量过滤: 低分被滤掉, 结果按优先级降序且不超过 max_count
#[test]
fn test_score_and_filter_ordering() {
    let scorer = InsightScorer::default();

    let mut raws = Vec::new();
    for i in 0..10 {
        let mut raw = RawInsight::new(
            InsightCategory::Revenue,
            format!("指标{}", i),
            1000.0 - i as f64 * 100.0,
            1000.0,
            -(i as f64) * 100.0,
            100,
        );
        if i > 5 {
            raw.trend = Some(TrendDirection::Worsening);
            raw.days_to_threshold = Some(i as i64 - 4);
            raw.has_action = true;
        }
        raws.push(raw);
    }

    let options = ScoreFilterOptions {
        min_score: 40.0,
        max_count: 3,
        types: None,
    };
    let result = scorer.score_and_filter_at(&raws, &context(), &options, fixed_now());

    assert!(result.len() <= 3);
    for insight in &result {
        assert!(insight.total_score >= 40.0);
    }
    for window in result.windows(2) {
        assert!(window[0].priority >= window[1].priority);
    }
}

/// 类型过滤: 只保留指定类型
#[test]
fn test_type_filter_applied() {
    let scorer = InsightScorer::default();

    let mut critical = RawInsight::new(
        InsightCategory::Revenue,
        "暴跌指标",
        500.0,
        1000.0,
        -500.0,
        200,
    );
    critical.trend = Some(TrendDirection::Worsening);
    critical.days_to_threshold = Some(1);

    let mut opportunity = RawInsight::new(
        InsightCategory::Revenue,
        "上涨指标",
        1500.0,
        1000.0,
        500.0,
        200,
    );
    opportunity.estimated_revenue_impact = Some(150_000.0);

    let options = ScoreFilterOptions {
        min_score: 0.0,
        max_count: 50,
        types: Some(vec![InsightType::Critical]),
    };
    let result = scorer.score_and_filter_at(
        &[critical, opportunity],
        &context(),
        &options,
        fixed_now(),
    );

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].insight_type, InsightType::Critical);
}

/// 立方体异常直通评分: 从记录到洞察的衔接
#[test]
fn test_cube_anomalies_to_insights() {
    let mut records: Vec<Record> = (0..60)
        .map(|_| {
            Record::new()
                .with("amount", 100.0)
                .with("country", "JP")
        })
        .collect();
    records.extend((0..40).map(|_| {
        Record::new()
            .with("amount", 300.0)
            .with("country", "US")
    }));

    let analyzer = CubeAnalyzer::new(CubeConfig {
        dimensions: vec![CubeDimension::new("country", "country")],
        metrics: vec![CubeMetric::new("aov", "amount", AggregateKind::Avg)],
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&records).unwrap();
    assert!(!analysis.anomalies.is_empty());

    let scorer = InsightScorer::default();
    let insights = scorer.score_anomalies_at(&analysis.anomalies, fixed_now());

    assert_eq!(insights.len(), analysis.anomalies.len());
    for insight in &insights {
        // 维度字段名含 country → 地域类别
        assert_eq!(insight.category, InsightCategory::Geographic);
        assert!(insight.metric.contains("country="));
        assert!(!insight.title.is_empty());
        assert!(!insight.recommendation.is_empty());
        assert_eq!(insight.evidence.len(), 1);
    }
}

/// 可选字段全缺时走兜底, 不报错
#[test]
fn test_missing_optional_fields_never_fail() {
    let raw = RawInsight::new(InsightCategory::Operations, "延迟率", 0.2, 0.1, 0.1, 0);
    let scorer = InsightScorer::default();
    let insight = scorer.score_at(&raw, &context(), fixed_now());

    // 无任何提示字段: 置信度停在基础分
    assert_eq!(insight.scores.confidence, 50.0);
    assert_eq!(insight.scores.actionability, 30.0);
    assert_eq!(insight.scores.urgency, 20.0);
}
