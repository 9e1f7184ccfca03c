pub mod config;
pub mod error;
pub mod processor;
pub mod state;

pub use config::ReconstructConfig;
pub use error::ReconstructError;
pub use processor::{ReconstructOutcome, TradeReconstructor};
pub use state::Phase;
