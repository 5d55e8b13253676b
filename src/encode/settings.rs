use std::{fmt, path::PathBuf, time::Duration};

use crate::foundation::{
    core::{MediaTime, PresentationClock},
    error::{StillcutError, StillcutResult},
};

/// H.264 macroblock edge in pixels.
pub const MACROBLOCK_SIZE: u32 = 16;

/// File name used by [`SessionConfig::default`] inside the system temp directory.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "exportvideo.mov";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => f.write_str("h264"),
        }
    }
}

/// Output video format. Immutable once constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingSettings {
    width: u32,
    height: u32,
    codec: VideoCodec,
}

impl EncodingSettings {
    /// H.264 settings for a `width × height` frame.
    ///
    /// A width that is not a multiple of [`MACROBLOCK_SIZE`] is accepted but logged as a warning.
    pub fn new(width: u32, height: u32) -> StillcutResult<Self> {
        if width == 0 || height == 0 {
            return Err(StillcutError::validation(
                "video settings width/height must be non-zero",
            ));
        }
        let settings = Self {
            width,
            height,
            codec: VideoCodec::H264,
        };
        if let Some(msg) = settings.alignment_warning() {
            tracing::warn!(width, height, "{msg}");
        }
        Ok(settings)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    pub fn is_macroblock_aligned(&self) -> bool {
        self.width.is_multiple_of(MACROBLOCK_SIZE)
    }

    /// The warning emitted at construction, if any.
    pub fn alignment_warning(&self) -> Option<String> {
        if self.is_macroblock_aligned() {
            return None;
        }
        Some(format!(
            "video settings width {} is not divisible by {MACROBLOCK_SIZE}",
            self.width
        ))
    }
}

impl fmt::Display for EncodingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}x{}", self.codec, self.width, self.height)
    }
}

/// How a decoded image is placed into the fixed-size frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFit {
    /// Draw at native size anchored bottom-left; overflow is cropped, uncovered area is background.
    #[default]
    Native,
    /// Resample to exactly fill the frame.
    Stretch,
    /// Scale to fit inside the frame preserving aspect ratio, centered.
    Contain,
}

/// Per-session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Output file. Any existing file here is deleted when the session is prepared.
    pub destination: PathBuf,
    /// Duration of one frame slot.
    pub frame_duration: MediaTime,
    pub fit: FrameFit,
    /// Opaque RGB color under translucent or uncovered pixels.
    pub background: [u8; 3],
    /// Upper bound on waiting for the writer to accept the next buffer.
    pub ready_timeout: Duration,
}

impl SessionConfig {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn with_frame_duration(mut self, frame_duration: MediaTime) -> Self {
        self.frame_duration = frame_duration;
        self
    }

    pub fn with_fit(mut self, fit: FrameFit) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn clock(&self) -> StillcutResult<PresentationClock> {
        PresentationClock::new(self.frame_duration)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            destination: std::env::temp_dir().join(DEFAULT_OUTPUT_FILE_NAME),
            frame_duration: PresentationClock::DEFAULT_FRAME_DURATION,
            fit: FrameFit::default(),
            background: [0, 0, 0],
            ready_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/settings.rs"]
mod tests;
