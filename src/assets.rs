//! Frame sources and image decoding.

pub mod decode;
pub mod source;
