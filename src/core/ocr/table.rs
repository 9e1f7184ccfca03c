//! 单帧表格读取：按固定像素区域把一帧映射成单元格文本

use super::error::OcrError;
use super::mode::{ReadMode, FIELD_MODES};
use super::reader::TextReader;
use crate::core::video::{Frame, TableLayout, CLOSE_PRICE_COLUMN, FIELD_COLUMNS, ID_COLUMN};
use once_cell::unsync::OnceCell;
use std::sync::Arc;

/// Columns 1..=5 of one table row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowFields {
    pub time: String,
    pub kind: String,
    pub size: String,
    pub symbol: String,
    pub price: String,
}

pub struct TableFrameReader {
    frame: Frame,
    layout: Arc<TableLayout>,
    text: TextReader,
    timestamp: OnceCell<String>,
}

impl TableFrameReader {
    pub fn new(frame: Frame, layout: Arc<TableLayout>, text: TextReader) -> Self {
        Self {
            frame,
            layout,
            text,
            timestamp: OnceCell::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn cell(&self, row: usize, column: usize, mode: ReadMode) -> Result<String, OcrError> {
        let region = self
            .layout
            .cell(row, column)
            .ok_or(OcrError::OutOfLayout { row, column })?;
        self.text.read(&self.frame.gray_region(&region), mode)
    }

    /// Order id of `row`.
    pub fn identity(&self, row: usize) -> Result<String, OcrError> {
        self.cell(row, ID_COLUMN, ReadMode::Digits)
    }

    pub fn identities(&self, rows: std::ops::Range<usize>) -> Result<Vec<String>, OcrError> {
        rows.map(|row| self.identity(row)).collect()
    }

    pub fn row_fields(&self, row: usize) -> Result<RowFields, OcrError> {
        let mut values = Vec::with_capacity(FIELD_MODES.len());
        for (column, mode) in FIELD_COLUMNS.zip(FIELD_MODES) {
            values.push(self.cell(row, column, mode)?);
        }
        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(RowFields {
            time: next(),
            kind: next(),
            size: next(),
            symbol: next(),
            price: next(),
        })
    }

    pub fn close_price(&self, row: usize) -> Result<String, OcrError> {
        self.cell(row, CLOSE_PRICE_COLUMN, ReadMode::Decimal)
    }

    /// On-screen clock, read once per frame.
    pub fn timestamp(&self) -> Result<&str, OcrError> {
        self.timestamp
            .get_or_try_init(|| {
                let img = self.frame.gray_region(&self.layout.clock);
                self.text.read(&img, ReadMode::TimeOfDay)
            })
            .map(String::as_str)
    }
}
