// ==========================================
// 跨境电商业务分析引擎 - 表格记录模型
// ==========================================
// 职责: 订单级交易记录的共享输入形态
// 约定: 记录由外部数据接入方提供, 引擎只读不改;
//       字段一律按配置名访问, 不按位置访问
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::EngineResult;

// ==========================================
// 字段值 (Field Value)
// ==========================================
// 混合质量的表格数据是常态: 数值解析失败的单元格
// 由各聚合静默跳过 (DataShapeWarning 语义), 不报错
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
    Null,
}

impl FieldValue {
    /// 数值视图: 数值/整数直接返回, 文本尝试解析, 其余为 None
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// 文本视图: 空文本与 Null 视为缺失 (维度取值发现时跳过)
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => {
                if s.is_empty() {
                    None
                } else {
                    Some(s.clone())
                }
            }
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(format!("{}", n))
                }
            }
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Timestamp(ts) => Some(ts.to_rfc3339()),
            FieldValue::Null => None,
        }
    }

    /// 时间戳视图: 支持 RFC3339 / "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DD"
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            FieldValue::Text(s) => parse_timestamp(s.trim()),
            _ => None,
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ndt.and_utc());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc());
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return nd.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    None
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

// ==========================================
// 记录 (Record)
// ==========================================
/// 一笔交易记录: 字段名 → 字段值的开放映射
///
/// BTreeMap 保证字段序稳定, 序列化结果可复现。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构建器风格写入字段
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// 按字段名取数值 (缺失/不可解析 → None)
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(|v| v.as_number())
    }

    /// 按字段名取文本 (缺失/空 → None)
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(|v| v.as_text())
    }

    /// 按字段名取时间戳 (缺失/不可解析 → None)
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.fields.get(field).and_then(|v| v.as_timestamp())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 从带表头的 CSV 文件加载记录集
    ///
    /// 所有单元格按文本存储; 数值解析延后到聚合阶段,
    /// 与"脏单元格静默跳过"的聚合语义保持一致。
    pub fn from_csv_path(path: impl AsRef<Path>) -> EngineResult<Vec<Record>> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Record::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                record = record.with(header, cell);
            }
            records.push(record);
        }

        tracing::debug!(count = records.len(), "CSV 记录加载完成");
        Ok(records)
    }
}
