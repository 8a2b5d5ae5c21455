// ==========================================
// 分析引擎端到端集成测试
// ==========================================
// 目标: 订单记录 → 立方体异常 → 洞察评分,
//       同批数据同时走分解与健康度, 验证组件衔接
// ==========================================

use business_brain_engine::{
    AggregateKind, AnalyticsCache, CubeAnalyzer, CubeConfig, CubeDimension, CubeMetric,
    DecompositionConfig, DecompositionEngine, HealthScoreCalculator, IdentifierFields,
    InsightScorer, MemoryCache, Record, ScoreFilterOptions, SegmentSpec,
};
use chrono::{DateTime, TimeZone, Utc};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap()
}

fn create_test_order(
    amount: f64,
    country: &str,
    artist: &str,
    customer: &str,
    day: u32,
) -> Record {
    Record::new()
        .with("amount", amount)
        .with("country", country)
        .with("artist_id", artist)
        .with("customer_id", customer)
        .with("order_created", format!("2026-03-{:02} 09:00:00", day).as_str())
        .with("status", "completed")
}

/// 本期数据: 日本市场客单价明显低于整体
fn create_current_period() -> Vec<Record> {
    let mut records = Vec::new();
    for i in 0..30 {
        records.push(create_test_order(
            60.0,
            "JP",
            &format!("A{}", i % 3),
            &format!("JC{}", i),
            15 + (i % 10) as u32,
        ));
    }
    for i in 0..30 {
        records.push(create_test_order(
            200.0,
            "US",
            &format!("A{}", i % 5),
            &format!("UC{}", i),
            15 + (i % 10) as u32,
        ));
    }
    records
}

fn create_previous_period() -> Vec<Record> {
    let mut records = Vec::new();
    for i in 0..25 {
        records.push(create_test_order(
            150.0,
            "JP",
            &format!("A{}", i % 3),
            &format!("JC{}", i),
            1 + (i % 10) as u32,
        ));
    }
    for i in 0..25 {
        records.push(create_test_order(
            180.0,
            "US",
            &format!("A{}", i % 5),
            &format!("UC{}", i),
            1 + (i % 10) as u32,
        ));
    }
    records
}

/// 完整流程: 立方体 → 异常 → 洞察, 并缓存结果
#[test]
fn test_records_to_ranked_insights_flow() {
    let current = create_current_period();

    // 1. 立方体分析
    let analyzer = CubeAnalyzer::new(CubeConfig {
        dimensions: vec![CubeDimension::new("country", "country")],
        metrics: vec![CubeMetric::new("aov", "amount", AggregateKind::Avg)],
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&current).unwrap();

    // 全局均值 130, JP 60 (-54%) 与 US 200 (+54%) 都是异常
    assert_eq!(analysis.anomalies.len(), 2);
    assert_eq!(analysis.top_positive.len(), 1);
    assert_eq!(analysis.top_negative.len(), 1);

    // 2. 异常直通评分
    let scorer = InsightScorer::default();
    let insights = scorer.score_anomalies_at(&analysis.anomalies, fixed_now());
    assert_eq!(insights.len(), 2);
    for insight in &insights {
        assert!(insight.total_score > 0.0);
        assert!(insight.expires_at > insight.created_at);
    }

    // 3. 结果进缓存, 编排层再取
    let cache = MemoryCache::default();
    cache.set(
        "insights:2026-03",
        serde_json::to_value(&insights).unwrap(),
        Some(business_brain_engine::cache::TTL_INSIGHTS),
    );
    let cached = cache.get("insights:2026-03").unwrap();
    assert_eq!(cached, serde_json::to_value(&insights).unwrap());
}

/// 同批数据走分解: 恒等式 + 细分归因可同时给出
#[test]
fn test_decomposition_over_same_dataset() {
    let current = create_current_period();
    let previous = create_previous_period();

    let engine = DecompositionEngine::new(DecompositionConfig {
        primary_metric_field: "amount".to_string(),
        timestamp_field: "order_created".to_string(),
        segments: vec![SegmentSpec::new("country", "country")],
        identifiers: IdentifierFields {
            artist: Some("artist_id".to_string()),
            ..Default::default()
        },
    })
    .unwrap();

    let result = engine.decompose_at(&current, &previous, fixed_now());

    let sum = result.volume_effect + result.value_effect + result.mix_effect;
    assert!((sum - result.total_change).abs() < 1e-6);
    assert_eq!(result.by_segment.len(), 2);
    assert!(!result.top_contributors.is_empty());
    assert!(!result.explanation.is_empty());
    // 期间范围来自记录时间戳
    assert!(result.current_period.start > result.previous_period.start);
}

/// 同批数据走健康度: 全链路产出完整四维评分
#[test]
fn test_health_score_over_same_dataset() {
    let current = create_current_period();
    let previous = create_previous_period();

    let calculator = HealthScoreCalculator::default();
    let score = calculator.calculate_at(&current, &previous, fixed_now());

    assert!((0.0..=100.0).contains(&score.overall));
    for dim in [&score.revenue, &score.customer, &score.artist, &score.operations] {
        assert!((0.0..=100.0).contains(&dim.score));
        assert!(!dim.factors.is_empty());
    }
}

/// 洞察批量过滤与健康度可以组成一份"日报"负载
#[test]
fn test_daily_report_payload_assembly() {
    let current = create_current_period();

    let analyzer = CubeAnalyzer::new(CubeConfig {
        dimensions: vec![CubeDimension::new("country", "country")],
        metrics: vec![CubeMetric::new("aov", "amount", AggregateKind::Avg)],
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&current).unwrap();

    let scorer = InsightScorer::default();
    let raw_insights = scorer.score_anomalies_at(&analysis.anomalies, fixed_now());

    let calculator = HealthScoreCalculator::default();
    let health = calculator.calculate_at(&current, &create_previous_period(), fixed_now());

    let payload = serde_json::json!({
        "health": health,
        "insights": raw_insights,
        "generated_at": fixed_now(),
    });

    // 负载可序列化且字段齐全 (消费方为 HTTP API 层)
    let text = serde_json::to_string(&payload).unwrap();
    assert!(text.contains("\"overall\""));
    assert!(text.contains("\"type\""));

    // 过滤选项默认值
    let options = ScoreFilterOptions::default();
    assert_eq!(options.min_score, 40.0);
    assert_eq!(options.max_count, 50);
}
