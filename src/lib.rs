// ==========================================
// 跨境电商业务分析引擎 - 核心库
// ==========================================
// 技术栈: Rust + serde + chrono + tracing
// 系统定位: 经营决策支持引擎 (纯计算, 无 I/O)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 分析算法
pub mod engine;

// 缓存协作方 - TTL 缓存契约
pub mod cache;

// 错误类型
pub mod error;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AggregateKind, AnomalyDirection, DataQuality, DriverKind, EntityKind, FactorStatus,
    InsightCategory, InsightType, ResourceLevel, Trend, TrendDirection,
};

// 领域实体
pub use domain::{
    BusinessContext, BusinessInsight, CubeAnalysisResult, CubeCell, CubeConfig, CubeDimension,
    CubeMetric, DecompositionConfig, DecompositionResult, DimensionScore, EntityContributor,
    FieldValue, HealthData, HealthScore, IdentifierFields, InsightEvidence, InsightScores,
    PeriodRange, RawInsight, Record, ScoreFactor, SegmentContribution, SegmentSpec,
};

// 引擎
pub use engine::{
    CubeAnalyzer, DecompositionEngine, HealthFieldConfig, HealthScoreCalculator, InsightScorer,
    ScoreFilterOptions, ScoringWeights,
};

// 缓存
pub use cache::{AnalyticsCache, CacheConfig, MemoryCache};

// 错误
pub use error::{EngineError, EngineResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "跨境电商业务分析引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
