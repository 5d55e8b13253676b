use std::path::{Path, PathBuf};

use crate::{
    encode::{
        readiness::ReadinessBackoff,
        settings::{EncodingSettings, FrameFit, SessionConfig},
        writer::VideoWriter,
    },
    foundation::{
        core::{FrameIndex, MediaTime, PresentationClock},
        error::{StillcutError, StillcutResult},
    },
    render::pixel_buffer::PixelBuffer,
};

/// Where an [`EncodingSession`] is in its single pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Output prepared and writer attached; nothing written yet.
    Prepared,
    Writing,
    /// Container finalized. Terminal.
    Finished,
    /// A fatal error cancelled the writer. Terminal.
    Aborted,
}

/// One output file being written: destination, writer, buffer format and clock.
///
/// Enforces the append contract on top of the writer: strictly increasing presentation times, no
/// submission outside the `Writing` state.
pub struct EncodingSession<W> {
    destination: PathBuf,
    settings: EncodingSettings,
    fit: FrameFit,
    background: [u8; 3],
    clock: PresentationClock,
    backoff: ReadinessBackoff,
    writer: W,
    state: SessionState,
    last_pts: Option<MediaTime>,
    frames_written: u64,
}

impl<W: VideoWriter> EncodingSession<W> {
    /// Delete any stale file at the destination and attach `writer` to it.
    #[tracing::instrument(skip_all, fields(destination = %config.destination.display(), %settings))]
    pub fn prepare(
        settings: EncodingSettings,
        config: &SessionConfig,
        mut writer: W,
    ) -> StillcutResult<Self> {
        let clock = config.clock()?;
        remove_stale_output(&config.destination)?;
        writer.attach(&config.destination, &settings, clock.frame_duration())?;

        Ok(Self {
            destination: config.destination.clone(),
            settings,
            fit: config.fit,
            background: config.background,
            clock,
            backoff: ReadinessBackoff::with_timeout(config.ready_timeout),
            writer,
            state: SessionState::Prepared,
            last_pts: None,
            frames_written: 0,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    pub fn clock(&self) -> &PresentationClock {
        &self.clock
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Start the writer; the timeline begins at zero.
    pub fn begin(&mut self) -> StillcutResult<()> {
        if self.state != SessionState::Prepared {
            return Err(StillcutError::writer(format!(
                "session cannot begin from state {:?}",
                self.state
            )));
        }
        self.writer.start_writing()?;
        self.state = SessionState::Writing;
        tracing::debug!(destination = %self.destination.display(), "writing started");
        Ok(())
    }

    /// Rasterize `img` into a fresh buffer sized to the session's settings.
    pub fn render(&self, img: &image::RgbaImage) -> StillcutResult<PixelBuffer> {
        let mut buffer = PixelBuffer::for_settings(&self.settings)?;
        buffer.draw_image(img, self.fit, self.background)?;
        Ok(buffer)
    }

    /// Append `buffer` at the presentation time of `index`, waiting for writer readiness.
    pub fn submit(&mut self, index: FrameIndex, buffer: &PixelBuffer) -> StillcutResult<MediaTime> {
        if self.state != SessionState::Writing {
            return Err(StillcutError::writer(format!(
                "cannot submit frame {index} in state {:?}",
                self.state
            )));
        }
        let pts = self.clock.timestamp(index)?;
        if let Some(last) = self.last_pts
            && pts <= last
        {
            return Err(StillcutError::writer(format!(
                "frame {index} at {pts} does not follow {last}"
            )));
        }

        let writer = &self.writer;
        let misses = self
            .backoff
            .wait(|| writer.is_ready_for_more_media_data())?;
        if misses > 0 {
            tracing::trace!(%index, misses, "writer was busy");
        }
        self.writer.append(buffer, pts)?;

        self.last_pts = Some(pts);
        self.frames_written += 1;
        Ok(pts)
    }

    /// Mark the input finished and finalize the container.
    pub fn finish(&mut self) -> StillcutResult<()> {
        if self.state != SessionState::Writing {
            return Err(StillcutError::writer(format!(
                "session cannot finish from state {:?}",
                self.state
            )));
        }
        self.writer.mark_as_finished();
        self.writer.finish_writing()?;
        self.state = SessionState::Finished;
        Ok(())
    }

    /// Cancel the writer after a fatal error.
    pub fn abort(&mut self) {
        if matches!(self.state, SessionState::Finished | SessionState::Aborted) {
            return;
        }
        self.writer.cancel_writing();
        self.state = SessionState::Aborted;
    }

    /// End of the last appended frame's slot; zero before the first append.
    pub fn timeline_end(&self) -> StillcutResult<MediaTime> {
        match self.last_pts {
            None => Ok(MediaTime::ZERO),
            Some(pts) => pts
                .checked_add(self.clock.frame_duration())
                .ok_or_else(|| StillcutError::writer(format!("timeline end overflows after {pts}"))),
        }
    }
}

/// Delete whatever file sits at `path`. A missing file is fine; anything that cannot be removed
/// is a construction failure.
pub fn remove_stale_output(path: &Path) -> StillcutResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => {
            std::fs::remove_file(path).map_err(|e| {
                StillcutError::construction(format!(
                    "failed to remove stale output '{}': {e}",
                    path.display()
                ))
            })?;
            tracing::debug!(path = %path.display(), "removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StillcutError::construction(format!(
            "failed to inspect output path '{}': {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
