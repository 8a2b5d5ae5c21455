// ==========================================
// DecompositionEngine 集成测试
// ==========================================
// 目标: 验证 量/价/混合 恒等式与细分/贡献者归因
// ==========================================

use business_brain_engine::{
    DecompositionConfig, DecompositionEngine, DriverKind, IdentifierFields, Record, SegmentSpec,
};

fn order(amount: f64, country: &str, artist: &str, customer: &str) -> Record {
    Record::new()
        .with("amount", amount)
        .with("country", country)
        .with("artist_id", artist)
        .with("customer_id", customer)
        .with("order_created", "2026-03-05 08:00:00")
}

fn make_engine() -> DecompositionEngine {
    let config = DecompositionConfig {
        primary_metric_field: "amount".to_string(),
        timestamp_field: "order_created".to_string(),
        segments: vec![
            SegmentSpec::new("country", "country"),
        ],
        identifiers: IdentifierFields {
            artist: Some("artist_id".to_string()),
            customer: Some("customer_id".to_string()),
            ..Default::default()
        },
    };
    DecompositionEngine::new(config).unwrap()
}

/// 标准场景: 10 单×100 → 12 单×110
/// 量效应 200, 价效应 100, 混合效应 20, 合计 320
#[test]
fn test_laspeyres_three_effects() {
    let previous: Vec<Record> = (0..10)
        .map(|i| order(100.0, "JP", "A1", &format!("C{}", i)))
        .collect();
    let current: Vec<Record> = (0..12)
        .map(|i| order(110.0, "JP", "A1", &format!("C{}", i)))
        .collect();

    let engine = make_engine();
    let result = engine.decompose(&current, &previous);

    assert!((result.total_change - 320.0).abs() < 1e-9);
    assert!((result.volume_effect - 200.0).abs() < 1e-9);
    assert!((result.value_effect - 100.0).abs() < 1e-9);
    assert!((result.mix_effect - 20.0).abs() < 1e-9);
    assert!((result.total_change_percent - 0.32).abs() < 1e-9);
}

/// 恒等式性质: 任意两期数据集上
/// volume + value + mix == currentTotal − previousTotal
#[test]
fn test_decomposition_identity_property() {
    let engine = make_engine();
    let datasets: Vec<(Vec<Record>, Vec<Record>)> = vec![
        // 均匀增长
        (
            (0..12).map(|i| order(110.0, "JP", "A1", &format!("C{}", i))).collect(),
            (0..10).map(|i| order(100.0, "JP", "A1", &format!("C{}", i))).collect(),
        ),
        // 收缩 + 换市场
        (
            (0..3).map(|i| order(80.0, "US", "A2", &format!("C{}", i))).collect(),
            (0..9).map(|i| order(120.0, "JP", "A1", &format!("C{}", i))).collect(),
        ),
        // 不等金额混合
        (
            vec![
                order(999.5, "JP", "A1", "C1"),
                order(3.25, "US", "A2", "C2"),
                order(47.0, "KR", "A3", "C3"),
            ],
            vec![order(500.0, "JP", "A1", "C1"), order(10.0, "US", "A2", "C2")],
        ),
        // 一侧为空
        ((0..7).map(|i| order(55.0, "JP", "A1", &format!("C{}", i))).collect(), vec![]),
        (vec![], (0..7).map(|i| order(55.0, "JP", "A1", &format!("C{}", i))).collect()),
    ];

    for (current, previous) in &datasets {
        let result = engine.decompose(current, previous);
        let sum = result.volume_effect + result.value_effect + result.mix_effect;
        assert!(
            (sum - result.total_change).abs() < 1e-6,
            "identity violated: sum={} total={}",
            sum,
            result.total_change
        );
    }
}

/// 空输入不报错, 全零结果
#[test]
fn test_empty_inputs_never_fail() {
    let engine = make_engine();
    let result = engine.decompose(&[], &[]);

    assert_eq!(result.total_change, 0.0);
    assert_eq!(result.total_change_percent, 0.0);
    assert!(result.by_segment.is_empty());
    assert!(result.top_contributors.is_empty());
    // 期间范围降级为同一时刻, 不 panic
    assert_eq!(result.current_period.start, result.current_period.end);
}

/// 细分贡献: 增长市场排在收缩市场之前 (按 |贡献| 降序)
#[test]
fn test_segment_attribution_and_drivers() {
    let mut previous = Vec::new();
    previous.extend((0..10).map(|i| order(100.0, "JP", "A1", &format!("JC{}", i))));
    previous.extend((0..10).map(|i| order(100.0, "US", "A2", &format!("UC{}", i))));

    let mut current = Vec::new();
    // JP: 行数不变, 单价涨 50% → 价驱动, +500
    current.extend((0..10).map(|i| order(150.0, "JP", "A1", &format!("JC{}", i))));
    // US: 单价不变, 行数减半 → 量驱动, -500
    current.extend((0..5).map(|i| order(100.0, "US", "A2", &format!("UC{}", i))));

    let engine = make_engine();
    let result = engine.decompose(&current, &previous);

    assert_eq!(result.by_segment.len(), 2);
    let jp = result.by_segment.iter().find(|s| s.segment_value == "JP").unwrap();
    let us = result.by_segment.iter().find(|s| s.segment_value == "US").unwrap();

    assert!((jp.contribution - 500.0).abs() < 1e-9);
    assert_eq!(jp.driver, DriverKind::Value);
    assert!((us.contribution + 500.0).abs() < 1e-9);
    assert_eq!(us.driver, DriverKind::Volume);
}

/// 实体贡献者: 合并所有标识类型后取前 20, 新实体打标
#[test]
fn test_top_contributors_limit_and_new_flag() {
    let previous: Vec<Record> = (0..5)
        .map(|i| order(100.0, "JP", "A0", &format!("C{}", i)))
        .collect();

    // 30 个新艺术家, 每人贡献不同金额
    let current: Vec<Record> = (0..30)
        .map(|i| order(100.0 + i as f64 * 10.0, "JP", &format!("A{}", i + 1), "C0"))
        .collect();

    let engine = make_engine();
    let result = engine.decompose(&current, &previous);

    assert_eq!(result.top_contributors.len(), 20);
    // 按 |贡献| 降序
    for window in result.top_contributors.windows(2) {
        assert!(window[0].contribution.abs() >= window[1].contribution.abs());
    }
    // A0 消失 (负贡献), 新艺术家 is_new
    assert!(result
        .top_contributors
        .iter()
        .filter(|c| c.name.starts_with('A') && c.name != "A0")
        .all(|c| c.is_new));
}

/// 解释行为确定性模板输出
#[test]
fn test_explanation_is_deterministic() {
    let previous: Vec<Record> = (0..10)
        .map(|i| order(100.0, "JP", "A1", &format!("C{}", i)))
        .collect();
    let current: Vec<Record> = (0..12)
        .map(|i| order(110.0, "JP", "A1", &format!("C{}", i)))
        .collect();

    let engine = make_engine();
    let first = engine.decompose(&current, &previous);
    let second = engine.decompose(&current, &previous);

    assert_eq!(first.explanation, second.explanation);
    assert!(!first.explanation.is_empty());
}
