mod chunks;
mod lines;

pub use chunks::{Chunks, Error as ChunksError};
pub use lines::JsonLines;
