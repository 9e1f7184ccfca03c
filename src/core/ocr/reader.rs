use super::error::OcrError;
use super::mode::ReadMode;
use super::recognizer::Recognizer;
use image::GrayImage;
use log::warn;
use std::sync::Arc;

/// Whole-string misreads seen on the trading screen.
const CORRECTIONS: [(&str, &str); 5] = [
    ("buy", "buy "),
    ("auusd", "xauusd"),
    ("yauusd", "xauusd"),
    ("usdead", "usdcad"),
    ("14.00", "1.00"),
];

/// Recognizes a region and normalizes the text for its mode.
#[derive(Clone)]
pub struct TextReader {
    recognizer: Arc<dyn Recognizer>,
}

impl TextReader {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self { recognizer }
    }

    pub fn read(&self, image: &GrayImage, mode: ReadMode) -> Result<String, OcrError> {
        let raw = self.recognizer.recognize(image, mode)?;
        Ok(clean(&raw, mode))
    }
}

/// 识别结果清洗：去空白和两端的点，按模式修正，最后查纠错表
pub fn clean(raw: &str, mode: ReadMode) -> String {
    let text = raw.trim().trim_matches('.');

    let text = match mode {
        ReadMode::FullTimestamp => format_timestamp(text).unwrap_or_else(|| {
            warn!("Timestamp {:?} does not hold 14 digits, keeping raw text", text);
            text.to_string()
        }),
        ReadMode::Decimal => match text.strip_prefix("4.") {
            Some(rest) => format!("1.{}", rest),
            None => text.to_string(),
        },
        _ => text.to_string(),
    };

    CORRECTIONS
        .iter()
        .find(|(from, _)| *from == text)
        .map(|(_, to)| to.to_string())
        .unwrap_or(text)
}

/// `YYYYMMDDHHMMSS` -> `YYYY-MM-DD HH:MM:SS`. Separators the recognizer
/// emits between the digits are dropped first.
pub fn format_timestamp(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 14 {
        return None;
    }
    Some(format!(
        "{}-{}-{} {}:{}:{}",
        &digits[0..4],
        &digits[4..6],
        &digits[6..8],
        &digits[8..10],
        &digits[10..12],
        &digits[12..14]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ocr::MockRecognizer;

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(
            clean("20230815143025", ReadMode::FullTimestamp),
            "2023-08-15 14:30:25"
        );
        // 13 位原样返回
        assert_eq!(
            clean("2023081514302", ReadMode::FullTimestamp),
            "2023081514302"
        );
        assert_eq!(format_timestamp("2023081514302a"), None);
    }

    #[test]
    fn test_timestamp_with_separators() {
        assert_eq!(
            clean("2023.08.15 14:30:25", ReadMode::FullTimestamp),
            "2023-08-15 14:30:25"
        );
        assert_eq!(
            clean("2023.08.1514:30:25\n", ReadMode::FullTimestamp),
            "2023-08-15 14:30:25"
        );
        // 分隔符不算位数，13 位仍原样返回
        assert_eq!(
            clean("2023.08.15 14:30:2", ReadMode::FullTimestamp),
            "2023.08.15 14:30:2"
        );
    }

    #[test]
    fn test_decimal_leading_four() {
        assert_eq!(clean("4.2345", ReadMode::Decimal), "1.2345");
        assert_eq!(clean("14.2345", ReadMode::Decimal), "14.2345");
        // 只在小数模式下修正
        assert_eq!(clean("4.2345", ReadMode::Digits), "4.2345");
    }

    #[test]
    fn test_trims_whitespace_and_dots() {
        assert_eq!(clean("  .1925.50.\n", ReadMode::Decimal), "1925.50");
        assert_eq!(clean(" 12:00:00 \n", ReadMode::TimeOfDay), "12:00:00");
    }

    #[test]
    fn test_correction_table() {
        assert_eq!(clean("buy", ReadMode::Direction), "buy ");
        assert_eq!(clean("sell", ReadMode::Direction), "sell");
        assert_eq!(clean("auusd", ReadMode::Word), "xauusd");
        assert_eq!(clean("yauusd\n", ReadMode::Word), "xauusd");
        assert_eq!(clean("usdead", ReadMode::Word), "usdcad");
        assert_eq!(clean("14.00", ReadMode::Decimal), "1.00");
        assert_eq!(clean("eurusd", ReadMode::Word), "eurusd");
    }

    #[test]
    fn test_reader_cleans_recognizer_output() {
        let reader = TextReader::new(Arc::new(MockRecognizer::with_fixed_text(
            " 20230815143025\n",
        )));
        let img = GrayImage::new(3, 3);
        assert_eq!(
            reader.read(&img, ReadMode::FullTimestamp).unwrap(),
            "2023-08-15 14:30:25"
        );
    }
}
