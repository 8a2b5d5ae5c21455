// ==========================================
// 跨境电商业务分析引擎 - 错误类型
// ==========================================
// 职责: 定义引擎层错误类型
// 约定: 仅配置类错误可失败; 数据质量问题一律降级为
//       空结果/0值, 不进入错误通道 (见各引擎文档)
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
///
/// 所有错误在构造期(引擎 new / 配置校验)或组合数超限时产生,
/// 分析过程本身对脏数据永不报错。
#[derive(Error, Debug)]
pub enum EngineError {
    // ==========================================
    // 配置错误
    // ==========================================
    #[error("配置错误: {0}")]
    InvalidConfig(String),

    #[error("未知聚合方式: {0}")]
    UnknownAggregation(String),

    /// 维度组合数超过显式上限 (不做静默截断)
    #[error("维度组合数超限: 组合数={actual}, 上限={limit}")]
    CombinationLimitExceeded { actual: u64, limit: u64 },

    // ==========================================
    // 数据加载错误 (仅 CSV 导入辅助接口)
    // ==========================================
    #[error("CSV 解析失败: {0}")]
    CsvError(#[from] csv::Error),

    #[error("文件读取失败: {0}")]
    IoError(#[from] std::io::Error),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
