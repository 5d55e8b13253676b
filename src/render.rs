//! Encoder-ready pixel buffers.

pub mod pixel_buffer;
