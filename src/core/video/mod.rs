pub mod cursor;
pub mod error;
pub mod frame;
pub mod layout;
pub mod shot;
pub mod source;

pub use cursor::{CursorState, FrameChange, FrameCursor};
pub use error::VideoError;
pub use frame::{mean_abs_diff, mean_brightness, Frame, Region, Span};
pub use layout::{TableLayout, CLOSE_PRICE_COLUMN, FIELD_COLUMNS, ID_COLUMN};
pub use shot::{ChangeRange, Shot};
pub use source::{FfmpegSource, FrameSource, VecFrameSource, VideoInfo};
