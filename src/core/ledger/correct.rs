//! 平仓时间补全日期
//!
//! The on-screen clock has no date. Each close gets the date of the next
//! open in its (Symbol, Type) group, then moves one day back if that lands
//! after the next open, or one day forward if it lands before its own open.

use super::error::LedgerError;
use super::record::{Ledger, PositionRecord};
use super::validate::{DATE_TIME_FORMAT, TIME_OF_DAY_FORMAT};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectedRecord {
    #[serde(rename = "Order")]
    pub order: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "End Time")]
    pub end_time: Option<String>,
    #[serde(rename = "End Price")]
    pub end_price: Option<String>,
    pub frame_pos: u64,
}

fn open_time(record: &PositionRecord) -> Result<NaiveDateTime, LedgerError> {
    NaiveDateTime::parse_from_str(&record.time, DATE_TIME_FORMAT).map_err(|_| {
        LedgerError::TimeFormat {
            order: record.order.clone(),
            value: record.time.clone(),
        }
    })
}

/// Resolve one close time against its own open and the next open of its group.
pub fn resolve_end_time(
    end: NaiveTime,
    opened: NaiveDateTime,
    next_open: NaiveDateTime,
) -> NaiveDateTime {
    let mut closed = next_open.date().and_time(end);
    if closed > next_open {
        closed -= Duration::days(1);
    }
    if closed < opened {
        closed += Duration::days(1);
    }
    closed
}

pub fn correct_end_times(ledger: &Ledger) -> Result<Vec<CorrectedRecord>, LedgerError> {
    let records = ledger.records();
    let Some(last) = records.last() else {
        return Ok(Vec::new());
    };
    let last_time = open_time(last)?;
    let opened = records
        .iter()
        .map(open_time)
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups
            .entry((record.symbol.as_str(), record.kind.as_str()))
            .or_default()
            .push(idx);
    }

    let mut end_times: Vec<Option<NaiveDateTime>> = vec![None; records.len()];
    for members in groups.values() {
        for (pos, &idx) in members.iter().enumerate() {
            let record = &records[idx];
            let Some(end) = &record.end_time else {
                continue;
            };
            let end = NaiveTime::parse_from_str(end, TIME_OF_DAY_FORMAT).map_err(|_| {
                LedgerError::TimeFormat {
                    order: record.order.clone(),
                    value: end.clone(),
                }
            })?;
            let next_open = members
                .get(pos + 1)
                .map(|&next| opened[next])
                .unwrap_or(last_time);
            end_times[idx] = Some(resolve_end_time(end, opened[idx], next_open));
        }
    }

    Ok(records
        .iter()
        .zip(opened)
        .zip(end_times)
        .map(|((record, opened), end)| CorrectedRecord {
            order: record.order.clone(),
            time: opened.format(DATE_TIME_FORMAT).to_string(),
            kind: record.kind.clone(),
            size: record.size.clone(),
            symbol: record.symbol.clone(),
            price: record.price.clone(),
            end_time: end.map(|t| t.format(DATE_TIME_FORMAT).to_string()),
            end_price: record.end_price.clone(),
            frame_pos: record.frame_pos,
        })
        .collect())
}
