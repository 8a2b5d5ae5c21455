// ==========================================
// 跨境电商业务分析引擎 - 引擎层
// ==========================================
// 职责: 四大分析组件 (立方体/分解/洞察/健康度)
// 红线: 全部为纯同步计算, 只读输入, 不持共享可变状态
// ==========================================

pub mod aggregate;
pub mod cube;
pub mod decomposition;
pub mod health;
pub mod insight;

pub use cube::CubeAnalyzer;
pub use decomposition::DecompositionEngine;
pub use health::{HealthFieldConfig, HealthScoreCalculator};
pub use insight::{InsightScorer, ScoreFilterOptions, ScoringWeights};
