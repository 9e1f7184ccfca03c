//! Synthetic screens for tests: every cell is a uniform gray patch whose
//! level is looked up in a [`Palette`], and [`Palette::recognizer`] reads
//! the level back into text.

use crate::core::ocr::MockRecognizer;
use crate::core::video::{Frame, Region, Span, TableLayout, VecFrameSource};
use std::collections::HashMap;

const BAR_LEVEL: u8 = 200;

/// Six-row table in an 80x80 frame.
pub fn compact_layout() -> TableLayout {
    TableLayout {
        table: Region::new(20, 80, 0, 70),
        rows: (0..6).map(|i| Span::new(i * 10 + 1, i * 10 + 9)).collect(),
        columns: (0..7).map(|c| Span::new(c * 10, c * 10 + 10)).collect(),
        clock: Region::new(2, 10, 0, 20),
        id_strip: Span::new(2, 8),
        bar_strip: Span::new(74, 78),
        id_row_inset: 2,
        bar_row_inset: 2,
        bar_brightness: 200.0,
        bar_tolerance: 10.0,
        diff_threshold: 5.0,
    }
}

#[derive(Default)]
pub struct Palette {
    codes: HashMap<String, u8>,
    texts: HashMap<u8, String>,
    next: u16,
}

impl Palette {
    pub fn new() -> Self {
        Self {
            next: 12,
            ..Default::default()
        }
    }

    fn allocate(&mut self) -> u8 {
        let code = self.next as u8;
        assert!(self.next <= 252, "palette exhausted");
        self.next += 6;
        code
    }

    pub fn code(&mut self, text: &str) -> u8 {
        if let Some(&code) = self.codes.get(text) {
            return code;
        }
        let code = self.allocate();
        self.codes.insert(text.to_string(), code);
        self.texts.insert(code, text.to_string());
        code
    }

    /// Render `actual` with its own gray level but have it read back as `read_as`.
    pub fn misread(&mut self, actual: &str, read_as: &str) {
        let code = self.allocate();
        self.codes.insert(actual.to_string(), code);
        self.texts.insert(code, read_as.to_string());
    }

    pub fn recognizer(&self) -> MockRecognizer {
        let texts = self.texts.clone();
        MockRecognizer::with_fn(move |img, _mode| {
            let pixels = img.as_raw();
            if pixels.is_empty() {
                return String::new();
            }
            let mean = pixels.iter().map(|&p| p as u32).sum::<u32>() as f32 / pixels.len() as f32;
            texts
                .get(&(mean.round() as u8))
                .cloned()
                .unwrap_or_default()
        })
    }
}

#[derive(Debug, Clone)]
pub struct RowCells {
    pub id: String,
    pub time: String,
    pub kind: String,
    pub size: String,
    pub symbol: String,
    pub price: String,
    pub current_price: String,
}

impl RowCells {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            time: "20230815143025".to_string(),
            kind: "sell".to_string(),
            size: "0.10".to_string(),
            symbol: "xauusd".to_string(),
            price: "1925.50".to_string(),
            current_price: "1926.10".to_string(),
        }
    }

    pub fn time(mut self, time: &str) -> Self {
        self.time = time.to_string();
        self
    }

    pub fn current_price(mut self, price: &str) -> Self {
        self.current_price = price.to_string();
        self
    }

    fn cells(&self) -> [&str; 7] {
        [
            &self.id,
            &self.time,
            &self.kind,
            &self.size,
            &self.symbol,
            &self.price,
            &self.current_price,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    pub rows: Vec<RowCells>,
    pub clock: String,
    pub bar: Option<usize>,
}

impl Screen {
    pub fn new(rows: Vec<RowCells>, clock: &str) -> Self {
        let bar = Some(rows.len());
        Self {
            rows,
            clock: clock.to_string(),
            bar,
        }
    }

    pub fn with_ids(ids: &[&str]) -> Self {
        Self::new(ids.iter().map(|id| RowCells::new(id)).collect(), "12:00:00")
    }

    /// Mid-scroll frame: no bar, garbage in the id strip.
    pub fn transient() -> Self {
        Self {
            rows: Vec::new(),
            clock: String::new(),
            bar: None,
        }
    }

    pub fn render(&self, layout: &TableLayout, palette: &mut Palette, frame_number: u64) -> Frame {
        let (width, height) = (80u32, 80u32);
        let mut data = vec![0u8; (width * height * 3) as usize];
        let mut fill = |region: Region, level: u8| {
            for y in region.top..region.bottom.min(height) {
                for x in region.left..region.right.min(width) {
                    let idx = ((y * width + x) * 3) as usize;
                    data[idx..idx + 3].copy_from_slice(&[level, level, level]);
                }
            }
        };

        if !self.clock.is_empty() {
            fill(layout.clock, palette.code(&self.clock));
        }
        for (row, cells) in self.rows.iter().enumerate() {
            for (column, text) in cells.cells().iter().enumerate() {
                if let Some(region) = layout.cell(row, column) {
                    fill(region, palette.code(text));
                }
            }
        }
        match self.bar.and_then(|bar| layout.rows.get(bar)) {
            Some(band) => fill(
                Region::from_spans(band.offset(layout.table.top), layout.bar_strip),
                BAR_LEVEL,
            ),
            None if self.bar.is_none() => fill(layout.id_region(), 97),
            None => {}
        }

        Frame::new(width, height, data, frame_number * 500, frame_number)
    }
}

/// Render `(screen, repeat)` segments back to back.
pub fn frames(
    segments: &[(&Screen, usize)],
    layout: &TableLayout,
    palette: &mut Palette,
) -> Vec<Frame> {
    let mut frames = Vec::new();
    for (screen, repeat) in segments {
        for _ in 0..*repeat {
            let n = frames.len() as u64;
            frames.push(screen.render(layout, palette, n));
        }
    }
    frames
}

/// [`frames`] replayed at 2 fps.
pub fn source(
    segments: &[(&Screen, usize)],
    layout: &TableLayout,
    palette: &mut Palette,
) -> VecFrameSource {
    VecFrameSource::new(frames(segments, layout, palette), 2.0)
}
