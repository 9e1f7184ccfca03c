use super::frame::{mean_abs_diff, mean_brightness, Frame};
use super::layout::TableLayout;
use image::GrayImage;
use std::ops::Range;

/// Rows that must be re-read after a change: `start..end`, where `end` is
/// the newer shot's bar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRange {
    pub start: usize,
    pub end: usize,
}

impl ChangeRange {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn union(&self, other: &ChangeRange) -> ChangeRange {
        ChangeRange {
            start: self.start.min(other.start),
            end: other.end,
        }
    }
}

/// 单帧状态指纹：每行订单号图像 + 光标行
///
/// The bar row is the index of the first empty row below the populated part
/// of the table, so it doubles as the number of populated rows.
#[derive(Debug, Clone)]
pub struct Shot {
    frame: Frame,
    identity: GrayImage,
    bar: Option<usize>,
}

impl Shot {
    pub fn new(frame: Frame, layout: &TableLayout) -> Self {
        let identity = frame.gray_region(&layout.id_region());
        let bar = Self::locate_bar(&frame, layout);
        Self {
            frame,
            identity,
            bar,
        }
    }

    /// 从底部向上扫描光标条带，找到亮度接近目标值的第一行
    fn locate_bar(frame: &Frame, layout: &TableLayout) -> Option<usize> {
        let strip = frame.gray_region(&layout.bar_region());
        (0..layout.row_count()).rev().find(|&row| {
            layout.bar_row(row).is_some_and(|band| {
                !band.is_empty()
                    && (mean_brightness(&strip, band) - layout.bar_brightness).abs()
                        < layout.bar_tolerance
            })
        })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    pub fn bar(&self) -> Option<usize> {
        self.bar
    }

    fn row_matches(&self, other: &Shot, row: usize, layout: &TableLayout) -> bool {
        match layout.id_row(row) {
            Some(band) => {
                mean_abs_diff(&self.identity, &other.identity, band) < layout.diff_threshold
            }
            None => false,
        }
    }

    /// Same bar row and every identity row above it unchanged.
    pub fn is_similar(&self, other: &Shot, layout: &TableLayout) -> bool {
        match (self.bar, other.bar) {
            (Some(a), Some(b)) if a == b => {
                (0..a).rev().all(|row| self.row_matches(other, row, layout))
            }
            _ => false,
        }
    }

    /// First differing identity row above `newer`'s bar (or 0), up to that bar.
    ///
    /// `None` when `newer` has no detectable bar.
    pub fn change_range(&self, newer: &Shot, layout: &TableLayout) -> Option<ChangeRange> {
        let end = newer.bar?;
        let start = (0..end)
            .find(|&row| !self.row_matches(newer, row, layout))
            .unwrap_or(0);
        Some(ChangeRange { start, end })
    }
}
