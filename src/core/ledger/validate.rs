//! 账本校验：价格合理性 + 时间格式

use super::record::{Ledger, PositionRecord};
use chrono::{NaiveDateTime, NaiveTime};
use log::{info, warn};
use std::collections::BTreeSet;
use std::fmt;

pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Open prices above this are treated as digit misreads.
    pub price_ceiling: f64,
    /// Max relative open/close price gap, against the smaller price.
    pub price_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            price_ceiling: 10000.0,
            price_tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    PriceAboveCeiling { order: String, price: f64 },
    PriceGap { order: String, price: f64, end_price: f64 },
    BadEndTime { order: String, end_time: String },
    BadOpenTime { order: String, time: String },
}

impl Anomaly {
    pub fn is_time_format(&self) -> bool {
        matches!(self, Anomaly::BadEndTime { .. } | Anomaly::BadOpenTime { .. })
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::PriceAboveCeiling { order, price } => {
                write!(f, "order {}: price {} above ceiling", order, price)
            }
            Anomaly::PriceGap {
                order,
                price,
                end_price,
            } => write!(
                f,
                "order {}: open {} and close {} differ too much",
                order, price, end_price
            ),
            Anomaly::BadEndTime { order, end_time } => {
                write!(f, "order {}: end time {:?} is not HH:MM:SS", order, end_time)
            }
            Anomaly::BadOpenTime { order, time } => {
                write!(f, "order {}: open time {:?} is not a full timestamp", order, time)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub types: BTreeSet<String>,
    pub symbols: BTreeSet<String>,
    pub anomalies: Vec<Anomaly>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Date correction needs every time to parse.
    pub fn allows_correction(&self) -> bool {
        !self.anomalies.iter().any(Anomaly::is_time_format)
    }
}

fn check_record(record: &PositionRecord, config: &ValidationConfig, anomalies: &mut Vec<Anomaly>) {
    let price = record.price.parse::<f64>().ok();
    let end_price = record
        .end_price
        .as_deref()
        .and_then(|p| p.parse::<f64>().ok());

    if let Some(price) = price {
        if price > config.price_ceiling {
            anomalies.push(Anomaly::PriceAboveCeiling {
                order: record.order.clone(),
                price,
            });
        }
    }
    if let (Some(price), Some(end_price)) = (price, end_price) {
        let base = price.min(end_price);
        if base > 0.0 && (price - end_price).abs() / base > config.price_tolerance {
            anomalies.push(Anomaly::PriceGap {
                order: record.order.clone(),
                price,
                end_price,
            });
        }
    }
    // 不看平仓价能否解析，日期补全会解析每一个平仓时间
    if let Some(end_time) = &record.end_time {
        if NaiveTime::parse_from_str(end_time, TIME_OF_DAY_FORMAT).is_err() {
            anomalies.push(Anomaly::BadEndTime {
                order: record.order.clone(),
                end_time: end_time.clone(),
            });
        }
    }
    if NaiveDateTime::parse_from_str(&record.time, DATE_TIME_FORMAT).is_err() {
        anomalies.push(Anomaly::BadOpenTime {
            order: record.order.clone(),
            time: record.time.clone(),
        });
    }
}

pub fn validate(ledger: &Ledger, config: &ValidationConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    for record in ledger.iter() {
        report.types.insert(record.kind.clone());
        report.symbols.insert(record.symbol.clone());
        check_record(record, config, &mut report.anomalies);
    }

    info!("Types seen: {:?}", report.types);
    info!("Symbols seen: {:?}", report.symbols);
    for anomaly in &report.anomalies {
        warn!("Validation: {}", anomaly);
    }
    if !report.allows_correction() {
        warn!("Malformed times found, end time correction skipped");
    }
    report
}
