use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    assets::source::FrameSource,
    encode::settings::{EncodingSettings, FrameFit, SessionConfig},
    foundation::{
        core::{MediaTime, PresentationClock},
        error::{StillcutError, StillcutResult},
    },
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
/// A conversion job stored as JSON.
///
/// Relative paths are resolved against the manifest's directory by [`JobManifest::load`].
pub struct JobManifest {
    /// Output frame width in pixels.
    pub width: u32,
    /// Output frame height in pixels.
    pub height: u32,
    /// Output video file (`.mov`, `.mp4` or `.m4v`).
    pub output: PathBuf,
    /// Duration of one frame slot; defaults to 1/5 s.
    #[serde(default = "default_frame_duration")]
    pub frame_duration: MediaTime,
    /// Image placement inside the frame.
    #[serde(default)]
    pub fit: FrameFit,
    /// Background RGB under translucent or uncovered pixels.
    #[serde(default)]
    pub background: [u8; 3],
    /// ffmpeg H.264 encoder override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<String>,
    /// Image files in presentation order.
    pub frames: Vec<PathBuf>,
}

fn default_frame_duration() -> MediaTime {
    PresentationClock::DEFAULT_FRAME_DURATION
}

impl JobManifest {
    pub fn from_json_str(s: &str) -> StillcutResult<Self> {
        serde_json::from_str(s).map_err(|e| StillcutError::serde(format!("parse manifest: {e}")))
    }

    /// Read a manifest file and resolve its relative paths against the file's directory.
    pub fn load(path: &Path) -> StillcutResult<Self> {
        let f = File::open(path).with_context(|| format!("open manifest '{}'", path.display()))?;
        let mut manifest: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            StillcutError::serde(format!("parse manifest '{}': {e}", path.display()))
        })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve_relative_to(root);
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn resolve_relative_to(&mut self, root: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        resolve(&mut self.output);
        self.frames.iter_mut().for_each(resolve);
    }

    pub fn validate(&self) -> StillcutResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StillcutError::validation(
                "manifest width/height must be > 0",
            ));
        }
        if self.frame_duration.timescale == 0 || self.frame_duration.is_zero() {
            return Err(StillcutError::validation(
                "manifest frame_duration must have value>0 and timescale>0",
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(StillcutError::validation("manifest output must be non-empty"));
        }
        if let Some(encoder) = &self.encoder
            && encoder.trim().is_empty()
        {
            return Err(StillcutError::validation(
                "manifest encoder must be non-empty when given",
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> StillcutResult<EncodingSettings> {
        EncodingSettings::new(self.width, self.height)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(&self.output)
            .with_frame_duration(self.frame_duration)
            .with_fit(self.fit)
            .with_background(self.background)
    }

    pub fn frame_sources(&self) -> Vec<FrameSource> {
        self.frames.iter().cloned().map(FrameSource::File).collect()
    }
}

#[cfg(test)]
#[path = "../tests/unit/manifest.rs"]
mod tests;
