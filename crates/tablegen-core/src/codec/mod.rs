//! Value transcoding between storage and application representations.

pub mod datetime;
mod value;

pub use datetime::{DateTimeCodec, TemporalFormat};
pub use value::{Record, Value};
