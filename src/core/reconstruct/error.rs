use crate::core::ledger::LedgerError;
use crate::core::ocr::OcrError;
use crate::core::video::VideoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error(transparent)]
    Video(#[from] VideoError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(
        "Order ids kept colliding after {retries} deferrals (change at frame {frame_pos}, last read {ids:?})"
    )]
    PersistentCollision {
        frame_pos: u64,
        retries: u32,
        ids: Vec<String>,
    },
}
