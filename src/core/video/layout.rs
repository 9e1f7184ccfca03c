//! 交易表格的屏幕几何配置

use super::error::VideoError;
use super::frame::{Region, Span};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ID_COLUMN: usize = 0;
pub const FIELD_COLUMNS: std::ops::RangeInclusive<usize> = 1..=5;
pub const CLOSE_PRICE_COLUMN: usize = 6;

/// Fixed pixel geometry of the recorded trading table.
///
/// `rows` and `columns` are relative to `table`; `id_strip` and `bar_strip`
/// are absolute horizontal spans spanning the table's vertical extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub table: Region,
    pub rows: Vec<Span>,
    pub columns: Vec<Span>,
    pub clock: Region,
    pub id_strip: Span,
    pub bar_strip: Span,
    pub id_row_inset: u32,
    pub bar_row_inset: u32,
    pub bar_brightness: f32,
    pub bar_tolerance: f32,
    pub diff_threshold: f32,
}

impl Default for TableLayout {
    fn default() -> Self {
        let rows = [
            (1, 19),
            (21, 39),
            (40, 58),
            (60, 78),
            (79, 97),
            (99, 117),
            (118, 136),
            (138, 156),
            (157, 175),
            (177, 195),
            (196, 214),
            (216, 234),
            (235, 253),
            (255, 273),
            (274, 292),
            (294, 312),
        ];
        let columns = [
            (0, 65),
            (110, 222),
            (265, 292),
            (315, 347),
            (365, 417),
            (440, 495),
            (675, 729),
        ];

        Self {
            table: Region::new(346, 658, 35, 764),
            rows: rows.iter().map(|&(a, b)| Span::new(a, b)).collect(),
            columns: columns.iter().map(|&(a, b)| Span::new(a, b)).collect(),
            clock: Region::new(55, 68, 80, 135),
            id_strip: Span::new(62, 96),
            bar_strip: Span::new(1060, 1063),
            id_row_inset: 3,
            bar_row_inset: 7,
            bar_brightness: 200.0,
            bar_tolerance: 10.0,
            diff_threshold: 5.0,
        }
    }
}

impl TableLayout {
    pub fn from_json_file(path: &Path) -> Result<Self, VideoError> {
        let text = fs::read_to_string(path)?;
        let layout: TableLayout = serde_json::from_str(&text)
            .map_err(|e| VideoError::Layout(format!("{}: {}", path.display(), e)))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), VideoError> {
        if self.rows.is_empty() {
            return Err(VideoError::Layout("no row bands".into()));
        }
        if self.columns.len() <= CLOSE_PRICE_COLUMN {
            return Err(VideoError::Layout(format!(
                "need {} column bands, got {}",
                CLOSE_PRICE_COLUMN + 1,
                self.columns.len()
            )));
        }
        let spans = self
            .rows
            .iter()
            .chain(self.columns.iter())
            .chain([&self.id_strip, &self.bar_strip]);
        for span in spans {
            if span.end <= span.start {
                return Err(VideoError::Layout(format!("inverted span {:?}", span)));
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 单元格的绝对像素区域
    pub fn cell(&self, row: usize, column: usize) -> Option<Region> {
        let rows = self.rows.get(row)?.offset(self.table.top);
        let cols = self.columns.get(column)?.offset(self.table.left);
        Some(Region::from_spans(rows, cols))
    }

    /// Absolute region of the identity fingerprint strip.
    pub fn id_region(&self) -> Region {
        Region::from_spans(self.table.rows(), self.id_strip)
    }

    pub fn bar_region(&self) -> Region {
        Region::from_spans(self.table.rows(), self.bar_strip)
    }

    /// Row band inside the identity strip image used for fingerprint comparison.
    pub fn id_row(&self, row: usize) -> Option<Span> {
        self.rows.get(row).map(|r| r.inset(self.id_row_inset))
    }

    /// Row band inside the bar strip image used for brightness scanning.
    pub fn bar_row(&self, row: usize) -> Option<Span> {
        self.rows.get(row).map(|r| r.inset(self.bar_row_inset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = TableLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.row_count(), 16);
        assert_eq!(layout.id_row(0), Some(Span::new(4, 16)));
        assert_eq!(layout.bar_row(15), Some(Span::new(301, 305)));
    }

    #[test]
    fn test_cell_is_absolute() {
        let layout = TableLayout::default();
        assert_eq!(
            layout.cell(1, CLOSE_PRICE_COLUMN),
            Some(Region::new(367, 385, 710, 764))
        );
        assert_eq!(layout.cell(16, 0), None);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let layout: TableLayout = serde_json::from_str(r#"{"diff_threshold": 3.5}"#).unwrap();
        assert_eq!(layout.diff_threshold, 3.5);
        assert_eq!(layout.rows.len(), 16);
    }

    #[test]
    fn test_too_few_columns_rejected() {
        let layout = TableLayout {
            columns: vec![Span::new(0, 10); 3],
            ..Default::default()
        };
        assert!(matches!(layout.validate(), Err(VideoError::Layout(_))));
    }
}
