// ==========================================
// 跨境电商业务分析引擎 - 健康度计算器
// ==========================================
// 职责: 从两期订单记录提取聚合指标, 再按
//       营收/客户/艺术家/运营 四维打分并加权汇总
// 红线: 缺数据的字段用文档化默认值, 计算器不虚构数据;
//       各桶阈值为既定业务口径
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::health::{DimensionScore, HealthData, HealthScore, ScoreFactor};
use crate::domain::record::Record;
use crate::domain::types::{FactorStatus, Trend};
use crate::engine::aggregate;
use crate::i18n::t;

// 维度权重: 营收 0.35 / 客户 0.25 / 艺术家 0.20 / 运营 0.20
const WEIGHT_REVENUE: f64 = 0.35;
const WEIGHT_CUSTOMER: f64 = 0.25;
const WEIGHT_ARTIST: f64 = 0.20;
const WEIGHT_OPERATIONS: f64 = 0.20;

// 维度基础分
const BASE_SCORE: f64 = 50.0;

// 趋势判定死区 (±2%)
const TREND_DEAD_BAND: f64 = 0.02;

// 无真实数据时的保守默认值
const DEFAULT_VIP_RETENTION: f64 = 0.85;
const DEFAULT_PREV_REPEAT_RATE: f64 = 0.3;
const DEFAULT_PROCESSING_DAYS: f64 = 10.0;
const DEFAULT_QC_PASS_RATE: f64 = 0.92;

// ==========================================
// 字段映射配置 (Health Field Config)
// ==========================================
/// 订单记录到健康度聚合的字段映射
///
/// 标记词匹配为小写包含匹配, 中英文默认词表可整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthFieldConfig {
    pub metric_field: String,
    pub customer_field: String,
    pub artist_field: String,
    pub timestamp_field: String,
    pub status_updated_field: String,
    /// 状态类字段 (延迟/质检标记在这些字段里找)
    pub status_fields: Vec<String>,
    /// 备注类字段 (投诉标记在这些字段里找)
    pub note_fields: Vec<String>,
    pub delayed_markers: Vec<String>,
    pub qc_fail_markers: Vec<String>,
    pub complaint_markers: Vec<String>,
    #[serde(default)]
    pub target_gmv: Option<f64>,
}

impl Default for HealthFieldConfig {
    fn default() -> Self {
        Self {
            metric_field: "amount".to_string(),
            customer_field: "customer_id".to_string(),
            artist_field: "artist_id".to_string(),
            timestamp_field: "order_created".to_string(),
            status_updated_field: "status_updated".to_string(),
            status_fields: vec!["status".to_string(), "logistics_status".to_string()],
            note_fields: vec!["note".to_string(), "remarks".to_string()],
            delayed_markers: vec![
                "delayed".to_string(),
                "延迟".to_string(),
                "滞留".to_string(),
            ],
            qc_fail_markers: vec![
                "qc_failed".to_string(),
                "质检不通过".to_string(),
                "不合格".to_string(),
            ],
            complaint_markers: vec![
                "complaint".to_string(),
                "投诉".to_string(),
                "退款".to_string(),
            ],
            target_gmv: None,
        }
    }
}

// ==========================================
// HealthScoreCalculator - 健康度计算器
// ==========================================
pub struct HealthScoreCalculator {
    config: HealthFieldConfig,
}

impl Default for HealthScoreCalculator {
    fn default() -> Self {
        Self {
            config: HealthFieldConfig::default(),
        }
    }
}

impl HealthScoreCalculator {
    pub fn new(config: HealthFieldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthFieldConfig {
        &self.config
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 从两期订单记录计算健康度
    pub fn calculate(&self, current: &[Record], previous: &[Record]) -> HealthScore {
        self.calculate_at(current, previous, Utc::now())
    }

    /// 从两期订单记录计算健康度, 显式传入计算时刻 (输出可复现)
    pub fn calculate_at(
        &self,
        current: &[Record],
        previous: &[Record],
        now: DateTime<Utc>,
    ) -> HealthScore {
        let data = self.extract_health_data(current, previous, now);
        Self::calculate_from_aggregates_at(&data, now)
    }

    /// 直接从调用方给出的聚合指标计算健康度
    pub fn calculate_from_aggregates(data: &HealthData) -> HealthScore {
        Self::calculate_from_aggregates_at(data, Utc::now())
    }

    pub fn calculate_from_aggregates_at(data: &HealthData, now: DateTime<Utc>) -> HealthScore {
        let revenue = Self::score_revenue(data);
        let customer = Self::score_customer(data);
        let artist = Self::score_artist(data);
        let operations = Self::score_operations(data);

        let overall = (WEIGHT_REVENUE * revenue.score
            + WEIGHT_CUSTOMER * customer.score
            + WEIGHT_ARTIST * artist.score
            + WEIGHT_OPERATIONS * operations.score)
            .round();

        tracing::debug!(
            overall,
            revenue = revenue.score,
            customer = customer.score,
            artist = artist.score,
            operations = operations.score,
            "健康度计算完成"
        );

        HealthScore {
            overall,
            calculated_at: now,
            revenue,
            customer,
            artist,
            operations,
        }
    }

    // ==========================================
    // 聚合提取
    // ==========================================

    /// 从订单记录提取两期聚合指标
    pub fn extract_health_data(
        &self,
        current: &[Record],
        previous: &[Record],
        now: DateTime<Utc>,
    ) -> HealthData {
        let cfg = &self.config;

        let current_gmv = aggregate::sum_field(current.iter(), &cfg.metric_field);
        let previous_gmv = aggregate::sum_field(previous.iter(), &cfg.metric_field);
        let current_aov = aggregate::safe_ratio(current_gmv, current.len() as f64);
        let previous_aov = aggregate::safe_ratio(previous_gmv, previous.len() as f64);

        // 按日汇总 (波动性计算用); BTreeMap 保证日期序
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for row in current {
            if let Some(ts) = row.timestamp(&cfg.timestamp_field) {
                *daily.entry(ts.date_naive()).or_insert(0.0) +=
                    row.number(&cfg.metric_field).unwrap_or(0.0);
            }
        }
        let daily_gmv_values: Vec<f64> = daily.into_values().collect();

        // 客户集合
        let current_customers = Self::distinct_values(current, &cfg.customer_field);
        let previous_customers = Self::distinct_values(previous, &cfg.customer_field);
        let returning = current_customers
            .intersection(&previous_customers)
            .count() as u64;
        // 新客口径: 本期去重客户总数 (增长率与上期总数对比)
        let new_customers = current_customers.len() as u64;
        let repeat_purchase_rate = if current_customers.is_empty() {
            0.0
        } else {
            returning as f64 / current_customers.len() as f64
        };
        let previous_repeat_rate = if previous_customers.is_empty() {
            DEFAULT_PREV_REPEAT_RATE
        } else {
            returning as f64 / previous_customers.len() as f64
        };
        let churned = previous_customers
            .difference(&current_customers)
            .count() as u64;
        let at_risk_customer_ratio = if previous_customers.is_empty() {
            0.0
        } else {
            churned as f64 / previous_customers.len() as f64
        };

        // VIP 留存: 上期 VIP 中本期仍是 VIP 的比例 (两期各取消费额前 20%)
        let vip_retention_rate = self.vip_retention(current, previous);

        // 艺术家集合与营收集中度
        let current_artists = Self::distinct_values(current, &cfg.artist_field);
        let previous_artists = Self::distinct_values(previous, &cfg.artist_field);
        let new_artists = current_artists.difference(&previous_artists).count() as u64;
        let at_risk_artist_count = previous_artists.difference(&current_artists).count() as u64;
        let top5_artist_revenue_share = self.top5_share(current, current_gmv);

        // 运营指标
        let avg_processing_days = self.avg_processing_days(current, now);
        let delayed_order_ratio =
            self.marker_ratio(current, &cfg.status_fields, &cfg.delayed_markers);
        let qc_pass_rate = if current.is_empty() {
            DEFAULT_QC_PASS_RATE
        } else {
            let mut fields = cfg.status_fields.clone();
            fields.extend(cfg.note_fields.iter().cloned());
            1.0 - self.marker_ratio(current, &fields, &cfg.qc_fail_markers)
        };
        let customer_complaint_ratio =
            self.marker_ratio(current, &cfg.note_fields, &cfg.complaint_markers);

        HealthData {
            current_gmv,
            previous_gmv,
            current_aov,
            previous_aov,
            daily_gmv_values,
            target_gmv: cfg.target_gmv,
            new_customers,
            previous_new_customers: previous_customers.len() as u64,
            repeat_purchase_rate,
            previous_repeat_rate,
            vip_retention_rate,
            at_risk_customer_ratio,
            active_artists: current_artists.len() as u64,
            previous_active_artists: previous_artists.len() as u64,
            top5_artist_revenue_share,
            at_risk_artist_count,
            new_artists,
            avg_processing_days,
            delayed_order_ratio,
            qc_pass_rate,
            customer_complaint_ratio,
        }
    }

    fn distinct_values(records: &[Record], field: &str) -> HashSet<String> {
        records
            .iter()
            .filter_map(|row| row.text(field))
            .collect()
    }

    fn vip_retention(&self, current: &[Record], previous: &[Record]) -> f64 {
        let previous_vips = self.vip_set(previous);
        if previous_vips.is_empty() {
            return DEFAULT_VIP_RETENTION;
        }

        let current_vips = self.vip_set(current);
        let retained = previous_vips.intersection(&current_vips).count();
        retained as f64 / previous_vips.len() as f64
    }

    /// 一期内消费额前 20% (向上取整) 的客户集合
    fn vip_set(&self, records: &[Record]) -> HashSet<String> {
        let mut spend: HashMap<String, f64> = HashMap::new();
        for row in records {
            if let Some(customer) = row.text(&self.config.customer_field) {
                *spend.entry(customer).or_insert(0.0) +=
                    row.number(&self.config.metric_field).unwrap_or(0.0);
            }
        }

        let mut ranked: Vec<(String, f64)> = spend.into_iter().collect();
        // 金额并列时按客户 ID 定序, 保证结果可复现
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let vip_count = (ranked.len() as f64 * 0.2).ceil() as usize;
        ranked
            .into_iter()
            .take(vip_count)
            .map(|(customer, _)| customer)
            .collect()
    }

    fn top5_share(&self, current: &[Record], current_gmv: f64) -> f64 {
        if current_gmv == 0.0 {
            return 0.0;
        }

        let mut revenue: HashMap<String, f64> = HashMap::new();
        for row in current {
            if let Some(artist) = row.text(&self.config.artist_field) {
                *revenue.entry(artist).or_insert(0.0) +=
                    row.number(&self.config.metric_field).unwrap_or(0.0);
            }
        }

        let mut amounts: Vec<f64> = revenue.into_values().collect();
        amounts.sort_by(|a, b| b.total_cmp(a));
        // 分母为全量 GMV: 无艺术家归属的订单会稀释集中度
        amounts.iter().take(5).sum::<f64>() / current_gmv
    }

    fn avg_processing_days(&self, current: &[Record], now: DateTime<Utc>) -> f64 {
        let mut days: Vec<f64> = Vec::new();
        for row in current {
            let Some(created) = row.timestamp(&self.config.timestamp_field) else {
                continue;
            };
            let updated = row
                .timestamp(&self.config.status_updated_field)
                .unwrap_or(now);
            // 按整天计: 不足一天按 0 天
            let elapsed = ((updated - created).num_seconds() as f64 / 86_400.0).floor();
            if (0.0..365.0).contains(&elapsed) {
                days.push(elapsed);
            }
        }

        if days.is_empty() {
            DEFAULT_PROCESSING_DAYS
        } else {
            days.iter().sum::<f64>() / days.len() as f64
        }
    }

    /// 任一指定字段包含任一标记词的行占比 (小写包含匹配)
    fn marker_ratio(&self, records: &[Record], fields: &[String], markers: &[String]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let markers: Vec<String> = markers.iter().map(|m| m.to_lowercase()).collect();
        let hits = records
            .iter()
            .filter(|row| {
                fields.iter().any(|field| {
                    row.text(field)
                        .map(|value| {
                            let value = value.to_lowercase();
                            markers.iter().any(|marker| value.contains(marker))
                        })
                        .unwrap_or(false)
                })
            })
            .count();
        hits as f64 / records.len() as f64
    }

    // ==========================================
    // 四维评分
    // ==========================================

    fn score_revenue(data: &HealthData) -> DimensionScore {
        let mut factors = Vec::new();

        let growth = aggregate::growth_rate(data.current_gmv, data.previous_gmv);
        let contribution = match growth {
            g if g > 0.15 => 20.0,
            g if g > 0.05 => 10.0,
            g if g > 0.0 => 5.0,
            g if g > -0.05 => -5.0,
            g if g > -0.15 => -10.0,
            _ => -20.0,
        };
        factors.push(make_factor("health.factor.revenue_growth", growth, contribution));

        let aov_change = aggregate::growth_rate(data.current_aov, data.previous_aov);
        let contribution = match aov_change {
            c if c > 0.05 => 10.0,
            c if c > 0.0 => 5.0,
            c if c > -0.05 => -5.0,
            _ => -10.0,
        };
        factors.push(make_factor("health.factor.aov_change", aov_change, contribution));

        let cv = aggregate::coefficient_of_variation(&data.daily_gmv_values);
        let contribution = if cv < 0.1 {
            10.0
        } else if cv < 0.2 {
            5.0
        } else if cv > 0.3 {
            -10.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.revenue_stability", cv, contribution));

        // 仅在调用方给出目标时计入达成率
        if let Some(target) = data.target_gmv {
            let achievement = aggregate::safe_ratio(data.current_gmv, target);
            let contribution = if achievement >= 1.0 {
                10.0
            } else if achievement >= 0.9 {
                5.0
            } else if achievement < 0.7 {
                -10.0
            } else {
                0.0
            };
            factors.push(make_factor(
                "health.factor.target_achievement",
                achievement,
                contribution,
            ));
        }

        finish_dimension(factors, trend_from_change(growth), growth)
    }

    fn score_customer(data: &HealthData) -> DimensionScore {
        let mut factors = Vec::new();

        let growth = aggregate::growth_rate(
            data.new_customers as f64,
            data.previous_new_customers as f64,
        );
        let contribution = match growth {
            g if g > 0.20 => 15.0,
            g if g > 0.10 => 10.0,
            g if g > 0.0 => 5.0,
            _ => -10.0,
        };
        factors.push(make_factor(
            "health.factor.new_customer_growth",
            growth,
            contribution,
        ));

        let repeat = data.repeat_purchase_rate;
        let contribution = match repeat {
            r if r > 0.40 => 15.0,
            r if r > 0.30 => 10.0,
            r if r > 0.20 => 5.0,
            _ => -10.0,
        };
        factors.push(make_factor("health.factor.repeat_rate", repeat, contribution));

        let vip = data.vip_retention_rate;
        let contribution = if vip > 0.90 {
            10.0
        } else if vip > 0.80 {
            5.0
        } else if vip < 0.70 {
            -10.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.vip_retention", vip, contribution));

        let at_risk = data.at_risk_customer_ratio;
        let contribution = if at_risk < 0.10 {
            10.0
        } else if at_risk < 0.20 {
            5.0
        } else if at_risk > 0.30 {
            -10.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.churn_risk", at_risk, contribution));

        let repeat_change = data.repeat_purchase_rate - data.previous_repeat_rate;
        finish_dimension(factors, trend_from_change(repeat_change), repeat_change)
    }

    fn score_artist(data: &HealthData) -> DimensionScore {
        let mut factors = Vec::new();

        let growth = aggregate::growth_rate(
            data.active_artists as f64,
            data.previous_active_artists as f64,
        );
        let contribution = match growth {
            g if g > 0.10 => 15.0,
            g if g > 0.0 => 5.0,
            g if g > -0.05 => -5.0,
            _ => -15.0,
        };
        factors.push(make_factor("health.factor.artist_growth", growth, contribution));

        let share = data.top5_artist_revenue_share;
        let contribution = if share < 0.30 {
            15.0
        } else if share < 0.40 {
            5.0
        } else if share > 0.50 {
            -15.0
        } else {
            0.0
        };
        factors.push(make_factor(
            "health.factor.revenue_diversity",
            share,
            contribution,
        ));

        let at_risk = data.at_risk_artist_count;
        let contribution = if at_risk == 0 {
            10.0
        } else if at_risk <= 2 {
            5.0
        } else if at_risk > 5 {
            -10.0
        } else {
            0.0
        };
        factors.push(make_factor(
            "health.factor.artist_churn_risk",
            at_risk as f64,
            contribution,
        ));

        let onboarded = data.new_artists;
        let contribution = if onboarded >= 5 {
            10.0
        } else if onboarded >= 2 {
            5.0
        } else if onboarded == 0 {
            -5.0
        } else {
            0.0
        };
        factors.push(make_factor(
            "health.factor.artist_onboarding",
            onboarded as f64,
            contribution,
        ));

        finish_dimension(factors, trend_from_change(growth), growth)
    }

    fn score_operations(data: &HealthData) -> DimensionScore {
        let mut factors = Vec::new();

        let days = data.avg_processing_days;
        let contribution = if days < 7.0 {
            15.0
        } else if days < 10.0 {
            10.0
        } else if days < 14.0 {
            5.0
        } else if days > 21.0 {
            -15.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.processing_speed", days, contribution));

        let delayed = data.delayed_order_ratio;
        let contribution = if delayed < 0.05 {
            15.0
        } else if delayed < 0.10 {
            10.0
        } else if delayed > 0.20 {
            -15.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.on_time_rate", delayed, contribution));

        let qc = data.qc_pass_rate;
        let contribution = if qc > 0.95 {
            10.0
        } else if qc > 0.90 {
            5.0
        } else if qc < 0.85 {
            -10.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.qc_pass_rate", qc, contribution));

        let complaints = data.customer_complaint_ratio;
        let contribution = if complaints < 0.01 {
            10.0
        } else if complaints < 0.02 {
            5.0
        } else if complaints > 0.05 {
            -10.0
        } else {
            0.0
        };
        factors.push(make_factor("health.factor.satisfaction", complaints, contribution));

        let trend = if data.delayed_order_ratio < 0.10 {
            Trend::Up
        } else if data.delayed_order_ratio > 0.15 {
            Trend::Down
        } else {
            Trend::Stable
        };
        finish_dimension(factors, trend, -data.delayed_order_ratio)
    }
}

fn make_factor(name_key: &str, value: f64, contribution: f64) -> ScoreFactor {
    let status = if contribution > 0.0 {
        FactorStatus::Good
    } else if contribution >= -5.0 {
        FactorStatus::Warning
    } else {
        FactorStatus::Critical
    };
    ScoreFactor {
        name: t(name_key),
        value,
        contribution,
        status,
    }
}

fn finish_dimension(factors: Vec<ScoreFactor>, trend: Trend, change: f64) -> DimensionScore {
    let score = BASE_SCORE + factors.iter().map(|f| f.contribution).sum::<f64>();
    DimensionScore {
        score: score.clamp(0.0, 100.0),
        trend,
        change,
        factors,
    }
}

fn trend_from_change(change: f64) -> Trend {
    if change > TREND_DEAD_BAND {
        Trend::Up
    } else if change < -TREND_DEAD_BAND {
        Trend::Down
    } else {
        Trend::Stable
    }
}
