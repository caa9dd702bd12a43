mod meter;
mod stream;

pub use meter::{compute_progress, ProgressMeter, MIN_ELAPSED};
pub use stream::{memory_chunks, ProgressStream, DEFAULT_CHUNK_SIZE};
