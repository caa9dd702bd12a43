pub mod format;
pub mod key;

pub use format::{format_duration, format_speed, humanize_bytes};
pub use key::{file_key, prefixed_key, random_key};
