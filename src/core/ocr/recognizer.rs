//! 文字识别后端

use super::error::OcrError;
use super::mode::ReadMode;
use image::{DynamicImage, GrayImage, ImageOutputFormat};
use log::debug;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Best-effort text recognition of one image region.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage, mode: ReadMode) -> Result<String, OcrError>;
}

/// Shells out to the `tesseract` CLI in single-line mode with the mode's
/// charset as whitelist.
pub struct TesseractRecognizer {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn encode_png(image: &GrayImage) -> Result<Vec<u8>, OcrError> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image.clone()).write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage, mode: ReadMode) -> Result<String, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(String::new());
        }
        let png = Self::encode_png(image)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout");
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.args(["--psm", "7", "-c"])
            .arg(format!("tessedit_char_whitelist={}", mode.charset()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(OcrError::Spawn)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OcrError::Timeout(self.timeout.as_secs()));
            }
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }
        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            return Err(OcrError::Backend(stderr.trim().to_string()));
        }

        debug!("tesseract {:?} -> {:?}", mode, stdout.trim());
        Ok(stdout)
    }
}

type RecognizeFn = dyn Fn(&GrayImage, ReadMode) -> String + Send + Sync;

pub struct MockRecognizer {
    respond: Option<Box<RecognizeFn>>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self { respond: None }
    }

    pub fn with_fn<F>(respond: F) -> Self
    where
        F: Fn(&GrayImage, ReadMode) -> String + Send + Sync + 'static,
    {
        Self {
            respond: Some(Box::new(respond)),
        }
    }

    pub fn with_fixed_text(text: &str) -> Self {
        let text = text.to_string();
        Self::with_fn(move |_, _| text.clone())
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(&self, image: &GrayImage, mode: ReadMode) -> Result<String, OcrError> {
        Ok(self
            .respond
            .as_ref()
            .map(|f| f(image, mode))
            .unwrap_or_default())
    }
}
