//! Small helpers shared by the executors and the renderer

mod tail_buffer;

pub use tail_buffer::TailBuffer;
