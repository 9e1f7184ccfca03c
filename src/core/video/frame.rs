use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Half-open pixel interval `[start, end)` along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shrink both ends by `inset`; collapses to an empty span rather than inverting.
    pub fn inset(&self, inset: u32) -> Span {
        let start = self.start + inset;
        let end = self.end.saturating_sub(inset).max(start);
        Span { start, end }
    }

    pub fn offset(&self, by: u32) -> Span {
        Span {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// 帧坐标系中的矩形区域（静态配置，不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Region {
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn from_spans(rows: Span, cols: Span) -> Self {
        Self::new(rows.start, rows.end, cols.start, cols.end)
    }

    pub fn rows(&self) -> Span {
        Span::new(self.top, self.bottom)
    }

    pub fn cols(&self) -> Span {
        Span::new(self.left, self.right)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// 解码后的视频帧（RGB 格式）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Integer BT.601 luma of one pixel; out-of-range reads are black.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        match self.data.get(idx..idx + 3) {
            Some(rgb) => {
                ((rgb[0] as u32 * 299 + rgb[1] as u32 * 587 + rgb[2] as u32 * 114) / 1000) as u8
            }
            None => 0,
        }
    }

    /// 裁剪并灰度化指定区域，超出帧边界的部分被截掉
    pub fn gray_region(&self, region: &Region) -> GrayImage {
        let right = region.right.min(self.width);
        let bottom = region.bottom.min(self.height);
        let left = region.left.min(right);
        let top = region.top.min(bottom);

        GrayImage::from_fn(right - left, bottom - top, |x, y| {
            image::Luma([self.luma(left + x, top + y)])
        })
    }

    pub fn to_gray(&self) -> GrayImage {
        self.gray_region(&Region::new(0, self.height, 0, self.width))
    }
}

/// Mean intensity of rows `rows` of `img`; 0.0 for an empty band.
pub fn mean_brightness(img: &GrayImage, rows: Span) -> f32 {
    let bottom = rows.end.min(img.height());
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in rows.start.min(bottom)..bottom {
        for x in 0..img.width() {
            sum += img.get_pixel(x, y)[0] as u64;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum as f32 / count as f32
    }
}

/// Mean absolute pixel difference of two images over the band `rows`.
///
/// Pixels outside either image count as maximally different, so a size
/// mismatch never reads as "similar".
pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage, rows: Span) -> f32 {
    let width = a.width().max(b.width());
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in rows.start..rows.end {
        for x in 0..width {
            let pa = a.get_pixel_checked(x, y).map(|p| p[0]);
            let pb = b.get_pixel_checked(x, y).map(|p| p[0]);
            sum += match (pa, pb) {
                (Some(pa), Some(pb)) => pa.abs_diff(pb) as u64,
                (None, None) => 0,
                _ => 255,
            };
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum as f32 / count as f32
    }
}
