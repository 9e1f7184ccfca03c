use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Checkpoint JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Order {0} is already in the ledger")]
    DuplicateOrder(String),
    #[error("Order {0} is not in the ledger")]
    UnknownOrder(String),
    #[error("Order {0} is already closed")]
    AlreadyClosed(String),
    #[error("Order {order}: cannot parse time {value:?}")]
    TimeFormat { order: String, value: String },
}
