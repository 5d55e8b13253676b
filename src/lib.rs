//! Stillcut assembles an ordered sequence of still images into an H.264 video file.
//!
//! # Pipeline overview
//!
//! 1. **Extract**: each [`FrameSource`] is resolved to decoded pixels, lazily, one at a time.
//!    Sources that cannot be resolved are logged and skipped.
//! 2. **Render**: pixels are drawn into a fixed-size [`PixelBuffer`] (`XRGB8888`).
//! 3. **Submit**: buffers go to a [`VideoWriter`] at `index × frame_duration`
//!    ([`PresentationClock`]), waiting on the writer's readiness signal.
//! 4. **Finalize**: the writer flushes the container and the completion callback fires.
//!
//! Encoding and muxing are delegated to the writer. [`FfmpegWriter`] stages frames with their
//! timestamps and encodes them with the system `ffmpeg` binary; [`InMemoryWriter`] records frames
//! for tests.
//!
//! ```no_run
//! use stillcut::{EncodingSettings, ImageSequenceEncoder, SessionConfig};
//!
//! # fn main() -> stillcut::StillcutResult<()> {
//! let settings = EncodingSettings::new(640, 480)?;
//! let encoder = ImageSequenceEncoder::new(settings, SessionConfig::new("out/slides.mov"))?;
//! let conversion = encoder.convert_files(["a.png", "b.png"], |path| {
//!     println!("wrote {}", path.display());
//! })?;
//! conversion.wait()?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod assets;
mod encode;
mod encoder;
mod foundation;
mod manifest;
mod render;

pub use assets::decode::{decode_image, decode_image_file};
pub use assets::source::FrameSource;
pub use encode::ffmpeg::{
    FfmpegWriter, FfmpegWriterOpts, SUPPORTED_CONTAINERS, ensure_parent_dir, is_ffmpeg_on_path,
};
pub use encode::readiness::ReadinessBackoff;
pub use encode::session::{EncodingSession, SessionState, remove_stale_output};
pub use encode::settings::{
    DEFAULT_OUTPUT_FILE_NAME, EncodingSettings, FrameFit, MACROBLOCK_SIZE, SessionConfig,
    VideoCodec,
};
pub use encode::writer::{InMemoryWriter, Recording, VideoWriter, WriterStatus};
pub use encoder::{Conversion, ConversionReport, ImageSequenceEncoder, WORKER_THREAD_NAME};
pub use foundation::core::{FrameIndex, MediaTime, PresentationClock};
pub use foundation::error::{StillcutError, StillcutResult};
pub use manifest::JobManifest;
pub use render::pixel_buffer::{PixelBuffer, PixelFormat, ROW_ALIGNMENT};
