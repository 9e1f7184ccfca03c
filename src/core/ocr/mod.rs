pub mod error;
pub mod mode;
pub mod reader;
pub mod recognizer;
pub mod table;

pub use error::OcrError;
pub use mode::{ReadMode, FIELD_MODES};
pub use reader::{clean, format_timestamp, TextReader};
pub use recognizer::{MockRecognizer, Recognizer, TesseractRecognizer};
pub use table::{RowFields, TableFrameReader};
