use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to run tesseract: {0}")]
    Spawn(std::io::Error),
    #[error("Tesseract timed out after {0}s")]
    Timeout(u64),
    #[error("Tesseract failed: {0}")]
    Backend(String),
    #[error("Row {row} column {column} is outside the table layout")]
    OutOfLayout { row: usize, column: usize },
}
