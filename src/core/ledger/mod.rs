pub mod correct;
pub mod error;
pub mod record;
pub mod store;
pub mod validate;
pub mod visible;

pub use correct::{correct_end_times, resolve_end_time, CorrectedRecord};
pub use error::LedgerError;
pub use record::{Ledger, PositionRecord, COLUMNS};
pub use store::{Checkpoint, CsvLedgerStore, LedgerStore, MemoryLedgerStore};
pub use validate::{validate, Anomaly, ValidationConfig, ValidationReport};
pub use visible::{all_distinct, VisibleRows};
