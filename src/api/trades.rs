//! 交易记录提取器

use crate::core::ledger::CsvLedgerStore;
use crate::core::ocr::TesseractRecognizer;
use crate::core::reconstruct::{ReconstructConfig, ReconstructError, ReconstructOutcome, TradeReconstructor};
use crate::core::video::{FfmpegSource, TableLayout};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Defaults to the video's directory.
    pub output_dir: Option<PathBuf>,
    /// JSON table layout; the built-in screen geometry when `None`.
    pub layout: Option<PathBuf>,
    pub tesseract: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    pub config: ReconstructConfig,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            layout: None,
            tesseract: PathBuf::from("tesseract"),
            tessdata_dir: None,
            config: ReconstructConfig::default(),
        }
    }
}

/// 交易记录提取器 - 录屏 -> 持仓账本 CSV
///
/// ```no_run
/// use trade_ocr::api::trades::{ExtractorOptions, TradeLogExtractor};
///
/// let mut extractor =
///     TradeLogExtractor::create("session.mp4".as_ref(), ExtractorOptions::default())?;
/// let outcome = extractor.run()?;
/// println!("{} records", outcome.records);
/// # Ok::<(), trade_ocr::core::reconstruct::ReconstructError>(())
/// ```
pub struct TradeLogExtractor {
    video: PathBuf,
    source: Option<FfmpegSource>,
    staged: PathBuf,
    corrected: PathBuf,
    reconstructor: TradeReconstructor,
}

impl TradeLogExtractor {
    /// Open the video and prepare the output files. Fails before any processing
    /// when the video cannot be opened.
    pub fn create(video: &Path, options: ExtractorOptions) -> Result<Self, ReconstructError> {
        let source = FfmpegSource::open(video)?;
        let layout = match &options.layout {
            Some(path) => TableLayout::from_json_file(path)?,
            None => TableLayout::default(),
        };
        let recognizer = TesseractRecognizer::new()
            .with_binary(options.tesseract)
            .with_tessdata_dir(options.tessdata_dir);
        let store = CsvLedgerStore::for_video(video, options.output_dir.as_deref())?;
        let staged = store.staged_path().to_path_buf();
        let corrected = store.corrected_path().to_path_buf();

        info!("🎬 TradeLogExtractor: created for {}", video.display());
        Ok(Self {
            video: video.to_path_buf(),
            source: Some(source),
            staged,
            corrected,
            reconstructor: TradeReconstructor::new(
                Arc::new(layout),
                Arc::new(recognizer),
                Box::new(store),
                options.config,
            ),
        })
    }

    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    pub fn corrected_path(&self) -> &Path {
        &self.corrected
    }

    /// Scan the video to the end (or the commit limit) and write the ledgers.
    pub fn run(&mut self) -> Result<ReconstructOutcome, ReconstructError> {
        let source = match self.source.take() {
            Some(source) => source,
            None => FfmpegSource::open(&self.video)?,
        };
        info!("▶️ TradeLogExtractor: scanning {}", self.video.display());
        let outcome = self.reconstructor.run(Box::new(source))?;

        info!(
            "✅ TradeLogExtractor: {} commits, {} records ({} open)",
            outcome.commits, outcome.records, outcome.open_positions
        );
        if outcome.corrected {
            info!("📄 Corrected ledger: {}", self.corrected.display());
        } else {
            info!("📄 Staged ledger only: {}", self.staged.display());
        }
        Ok(outcome)
    }
}

impl Drop for TradeLogExtractor {
    fn drop(&mut self) {
        info!("🗑️ TradeLogExtractor: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::VideoError;

    #[test]
    fn test_missing_video_fails_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("missing.mp4");
        let result = TradeLogExtractor::create(&video, ExtractorOptions::default());

        assert!(matches!(
            result,
            Err(ReconstructError::Video(VideoError::Open { .. }))
        ));
        assert!(!dir.path().join("missing_raw.csv").exists());
    }

    #[test]
    fn test_default_options() {
        let options = ExtractorOptions::default();
        assert_eq!(options.tesseract, PathBuf::from("tesseract"));
        assert!(options.config.resume);
        assert_eq!(options.config.max_collision_retries, 16);
    }
}
