use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open video {path:?}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("Failed to run {tool}: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Decoder error: {0}")]
    Decode(String),
    #[error("Invalid table layout: {0}")]
    Layout(String),
    #[error("Video has no readable frame at position {0}")]
    EmptyAt(u64),
}
