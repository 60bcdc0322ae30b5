pub mod duration;
pub mod error;
pub mod models;
pub mod storage;

pub use duration::{format_duration, parse_duration, parse_duration_at, ParsedDuration};
pub use error::{Error, Result};
