// ==========================================
// 跨境电商业务分析引擎 - 领域层
// ==========================================
// 职责: 四大分析组件共享的数据模型
// 红线: 记录由调用方持有, 引擎只读; 所有输出结构
//       可由输入完全复现 (纯函数, 无隐藏状态)
// ==========================================

pub mod cube;
pub mod decomposition;
pub mod health;
pub mod insight;
pub mod record;
pub mod types;

// 重导出核心类型
pub use cube::{CubeAnalysisResult, CubeCell, CubeConfig, CubeDimension, CubeMetric};
pub use decomposition::{
    DecompositionConfig, DecompositionResult, EntityContributor, IdentifierFields, PeriodRange,
    SegmentContribution, SegmentSpec,
};
pub use health::{DimensionScore, HealthData, HealthScore, ScoreFactor};
pub use insight::{BusinessContext, BusinessInsight, InsightEvidence, InsightScores, RawInsight};
pub use record::{FieldValue, Record};
