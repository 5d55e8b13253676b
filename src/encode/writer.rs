use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    encode::settings::EncodingSettings,
    foundation::{
        core::MediaTime,
        error::{StillcutError, StillcutResult},
    },
    render::pixel_buffer::PixelBuffer,
};

/// Lifecycle reported by a [`VideoWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterStatus {
    /// Attached but not started.
    Unknown,
    Writing,
    Completed,
    Failed,
    Cancelled,
}

/// The container/codec collaborator that turns pixel buffers into a video file.
///
/// Call order contract: `attach` once, `start_writing` once, then any number of `append` calls
/// with strictly increasing timestamps while `is_ready_for_more_media_data` holds, then
/// `mark_as_finished` and `finish_writing`. `cancel_writing` may be called at any point after
/// `attach` to abandon the output.
pub trait VideoWriter: Send {
    /// Bind the writer to an output file and format. Rejection is a construction failure.
    fn attach(
        &mut self,
        destination: &Path,
        settings: &EncodingSettings,
        frame_duration: MediaTime,
    ) -> StillcutResult<()>;
    /// Begin a session whose timeline starts at zero.
    fn start_writing(&mut self) -> StillcutResult<()>;
    /// Readiness signal; `append` must only be called while this is `true`.
    fn is_ready_for_more_media_data(&self) -> bool;
    /// Submit one buffer presented at `pts`.
    fn append(&mut self, buffer: &PixelBuffer, pts: MediaTime) -> StillcutResult<()>;
    /// No more buffers will follow.
    fn mark_as_finished(&mut self);
    /// Flush and finalize the container file.
    fn finish_writing(&mut self) -> StillcutResult<()>;
    /// Abandon the output. Best effort; never fails.
    fn cancel_writing(&mut self);
    fn status(&self) -> WriterStatus;
}

impl<W: VideoWriter + ?Sized> VideoWriter for Box<W> {
    fn attach(
        &mut self,
        destination: &Path,
        settings: &EncodingSettings,
        frame_duration: MediaTime,
    ) -> StillcutResult<()> {
        (**self).attach(destination, settings, frame_duration)
    }

    fn start_writing(&mut self) -> StillcutResult<()> {
        (**self).start_writing()
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        (**self).is_ready_for_more_media_data()
    }

    fn append(&mut self, buffer: &PixelBuffer, pts: MediaTime) -> StillcutResult<()> {
        (**self).append(buffer, pts)
    }

    fn mark_as_finished(&mut self) {
        (**self).mark_as_finished()
    }

    fn finish_writing(&mut self) -> StillcutResult<()> {
        (**self).finish_writing()
    }

    fn cancel_writing(&mut self) {
        (**self).cancel_writing()
    }

    fn status(&self) -> WriterStatus {
        (**self).status()
    }
}

/// Everything an [`InMemoryWriter`] observed.
#[derive(Debug, Default)]
pub struct Recording {
    pub destination: Option<PathBuf>,
    pub settings: Option<EncodingSettings>,
    pub frame_duration: Option<MediaTime>,
    /// Appended buffers in submission order.
    pub frames: Vec<(MediaTime, PixelBuffer)>,
    pub marked_finished: bool,
    pub finished: bool,
    pub cancelled: bool,
    /// Readiness polls answered with `false`.
    pub busy_polls: u64,
}

impl Recording {
    pub fn timestamps(&self) -> Vec<MediaTime> {
        self.frames.iter().map(|(pts, _)| *pts).collect()
    }
}

#[derive(Debug)]
struct Shared {
    recording: Recording,
    status: WriterStatus,
    /// Remaining polls to answer "not ready" before each append.
    busy_per_frame: u64,
    busy_left: u64,
    never_ready: bool,
}

/// Writer that keeps buffers in memory, for tests and debugging.
///
/// Clones share the same recording, so a clone kept by the caller can inspect what a writer moved
/// into an encoder received.
#[derive(Clone, Debug)]
pub struct InMemoryWriter {
    shared: Arc<Mutex<Shared>>,
}

impl InMemoryWriter {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                recording: Recording::default(),
                status: WriterStatus::Unknown,
                busy_per_frame: 0,
                busy_left: 0,
                never_ready: false,
            })),
        }
    }

    /// Report "not ready" `polls` times before accepting each buffer.
    pub fn with_busy_polls(self, polls: u64) -> Self {
        {
            let mut s = self.lock();
            s.busy_per_frame = polls;
            s.busy_left = polls;
        }
        self
    }

    /// Never report readiness.
    pub fn stalled(self) -> Self {
        self.lock().never_ready = true;
        self
    }

    /// Run `f` against the recording.
    pub fn with_recording<R>(&self, f: impl FnOnce(&Recording) -> R) -> R {
        f(&self.lock().recording)
    }

    pub fn frame_count(&self) -> usize {
        self.with_recording(|r| r.frames.len())
    }

    pub fn timestamps(&self) -> Vec<MediaTime> {
        self.with_recording(Recording::timestamps)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panic while holding the lock leaves the recording intact.
        self.shared
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for InMemoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for InMemoryWriter {
    fn attach(
        &mut self,
        destination: &Path,
        settings: &EncodingSettings,
        frame_duration: MediaTime,
    ) -> StillcutResult<()> {
        let mut s = self.lock();
        s.recording.destination = Some(destination.to_path_buf());
        s.recording.settings = Some(*settings);
        s.recording.frame_duration = Some(frame_duration);
        Ok(())
    }

    fn start_writing(&mut self) -> StillcutResult<()> {
        let mut s = self.lock();
        if s.status != WriterStatus::Unknown {
            return Err(StillcutError::writer(format!(
                "cannot start writing from status {:?}",
                s.status
            )));
        }
        s.status = WriterStatus::Writing;
        Ok(())
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        let mut s = self.lock();
        if s.status != WriterStatus::Writing || s.recording.marked_finished {
            return false;
        }
        if s.never_ready {
            s.recording.busy_polls += 1;
            return false;
        }
        if s.busy_left > 0 {
            s.busy_left -= 1;
            s.recording.busy_polls += 1;
            return false;
        }
        true
    }

    fn append(&mut self, buffer: &PixelBuffer, pts: MediaTime) -> StillcutResult<()> {
        let mut s = self.lock();
        if s.status != WriterStatus::Writing || s.recording.marked_finished {
            return Err(StillcutError::writer("append on a writer that is not writing"));
        }
        if let Some((last, _)) = s.recording.frames.last()
            && pts <= *last
        {
            return Err(StillcutError::writer(format!(
                "non-increasing presentation time {pts} after {last}"
            )));
        }
        s.recording.frames.push((pts, buffer.clone()));
        s.busy_left = s.busy_per_frame;
        Ok(())
    }

    fn mark_as_finished(&mut self) {
        self.lock().recording.marked_finished = true;
    }

    fn finish_writing(&mut self) -> StillcutResult<()> {
        let mut s = self.lock();
        if s.status != WriterStatus::Writing {
            return Err(StillcutError::writer(format!(
                "cannot finish writing from status {:?}",
                s.status
            )));
        }
        s.recording.marked_finished = true;
        s.recording.finished = true;
        s.status = WriterStatus::Completed;
        Ok(())
    }

    fn cancel_writing(&mut self) {
        let mut s = self.lock();
        s.recording.cancelled = true;
        s.status = WriterStatus::Cancelled;
    }

    fn status(&self) -> WriterStatus {
        self.lock().status
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/writer.rs"]
mod tests;
