//! 持仓账本：按订单号追加，只允许补填一次平仓信息

use super::error::LedgerError;
use crate::core::ocr::RowFields;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column header of the staged and corrected CSV files.
pub const COLUMNS: [&str; 9] = [
    "Order",
    "Time",
    "Type",
    "Size",
    "Symbol",
    "Price",
    "End Time",
    "End Price",
    "frame_pos",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
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
    /// Clock time-of-day when the row left the screen.
    #[serde(rename = "End Time")]
    pub end_time: Option<String>,
    #[serde(rename = "End Price")]
    pub end_price: Option<String>,
    /// Frame position of the change that first showed the row.
    pub frame_pos: u64,
}

impl PositionRecord {
    pub fn open(order: String, fields: RowFields, frame_pos: u64) -> Self {
        Self {
            order,
            time: fields.time,
            kind: fields.kind,
            size: fields.size,
            symbol: fields.symbol,
            price: fields.price,
            end_time: None,
            end_price: None,
            frame_pos,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Records in first-seen order, indexed by order id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Vec<PositionRecord>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<PositionRecord>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for record in records {
            ledger.open(record)?;
        }
        Ok(ledger)
    }

    pub fn open(&mut self, record: PositionRecord) -> Result<(), LedgerError> {
        if self.index.contains_key(&record.order) {
            return Err(LedgerError::DuplicateOrder(record.order));
        }
        self.index.insert(record.order.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn close(&mut self, order: &str, end_time: String, end_price: String) -> Result<(), LedgerError> {
        let idx = *self
            .index
            .get(order)
            .ok_or_else(|| LedgerError::UnknownOrder(order.to_string()))?;
        let record = &mut self.records[idx];
        if record.is_closed() {
            return Err(LedgerError::AlreadyClosed(order.to_string()));
        }
        record.end_time = Some(end_time);
        record.end_price = Some(end_price);
        Ok(())
    }

    pub fn contains(&self, order: &str) -> bool {
        self.index.contains_key(order)
    }

    pub fn get(&self, order: &str) -> Option<&PositionRecord> {
        self.index.get(order).map(|&idx| &self.records[idx])
    }

    pub fn records(&self) -> &[PositionRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids of still-open records, in ledger order.
    pub fn open_orders(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.is_closed())
            .map(|r| r.order.clone())
            .collect()
    }

    pub fn last_frame_pos(&self) -> Option<u64> {
        self.records.last().map(|r| r.frame_pos)
    }
}
