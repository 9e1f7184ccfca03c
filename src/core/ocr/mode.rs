/// Semantic read mode: decides the recognition charset and the cleanup rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadMode {
    /// Order ids.
    Digits,
    /// Sizes and prices.
    Decimal,
    /// `HH:MM:SS` clock.
    TimeOfDay,
    /// 14-digit open timestamp, reformatted to `YYYY-MM-DD HH:MM:SS`.
    FullTimestamp,
    /// `buy` / `sell`.
    Direction,
    /// Lowercase instrument symbol.
    Word,
}

impl ReadMode {
    pub fn charset(&self) -> &'static str {
        match self {
            ReadMode::Digits => "0123456789",
            ReadMode::Decimal => "0123456789.",
            ReadMode::TimeOfDay => "0123456789:",
            ReadMode::FullTimestamp => "0123456789.:",
            ReadMode::Direction => "buysell",
            ReadMode::Word => "abcdefghijklmnopqrstuvwxyz",
        }
    }
}

/// Modes of the row columns 1..=5: open time, type, size, symbol, price.
pub const FIELD_MODES: [ReadMode; 5] = [
    ReadMode::FullTimestamp,
    ReadMode::Direction,
    ReadMode::Decimal,
    ReadMode::Word,
    ReadMode::Decimal,
];
