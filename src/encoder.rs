use std::{
    path::{Path, PathBuf},
    thread::JoinHandle,
};

use anyhow::Context as _;

use crate::{
    assets::source::FrameSource,
    encode::{
        ffmpeg::FfmpegWriter,
        session::EncodingSession,
        settings::{EncodingSettings, SessionConfig},
        writer::VideoWriter,
    },
    foundation::{
        core::{FrameIndex, MediaTime},
        error::{StillcutError, StillcutResult},
    },
};

/// Name of the worker thread that extracts and submits frames.
pub const WORKER_THREAD_NAME: &str = "media-input-queue";

/// Outcome of a finished conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionReport {
    pub destination: PathBuf,
    /// Number of frame sources given.
    pub frames_total: u64,
    /// Buffers actually appended to the writer.
    pub frames_written: u64,
    /// Indices whose source could not be extracted. Their slots stay empty.
    pub skipped: Vec<FrameIndex>,
    /// Timeline length up to the end of the last written frame. Trailing skipped slots are not
    /// part of the file.
    pub duration: MediaTime,
}

/// Converts an ordered sequence of images into one H.264 video file.
///
/// The encoder owns a single [`EncodingSession`]; `convert` consumes it, so an encoder writes
/// exactly one file.
pub struct ImageSequenceEncoder<W = FfmpegWriter> {
    session: EncodingSession<W>,
}

impl ImageSequenceEncoder<FfmpegWriter> {
    /// Encoder backed by the system `ffmpeg`.
    pub fn new(settings: EncodingSettings, config: SessionConfig) -> StillcutResult<Self> {
        Self::with_writer(settings, config, FfmpegWriter::default())
    }
}

impl<W: VideoWriter + 'static> ImageSequenceEncoder<W> {
    /// Prepare a session on `writer`. Any file at `config.destination` is deleted.
    pub fn with_writer(
        settings: EncodingSettings,
        config: SessionConfig,
        writer: W,
    ) -> StillcutResult<Self> {
        let session = EncodingSession::prepare(settings, &config, writer)?;
        Ok(Self { session })
    }

    pub fn destination(&self) -> &Path {
        self.session.destination()
    }

    pub fn settings(&self) -> &EncodingSettings {
        self.session.settings()
    }

    /// Encode `frames` on a dedicated worker thread.
    ///
    /// `on_complete` receives the destination path once the file is finalized. It runs on the
    /// thread that calls [`Conversion::wait`], and never runs if the conversion fails.
    pub fn convert<I, F>(self, frames: I, on_complete: F) -> StillcutResult<Conversion>
    where
        I: IntoIterator<Item = FrameSource>,
        F: FnOnce(PathBuf) + 'static,
    {
        let frames: Vec<FrameSource> = frames.into_iter().collect();
        let session = self.session;
        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_batch(session, frames))
            .context("spawn media input worker")?;

        Ok(Conversion {
            worker: Some(worker),
            on_complete: Some(Box::new(on_complete)),
        })
    }

    /// [`convert`](Self::convert) over image files.
    pub fn convert_files<I, P, F>(self, paths: I, on_complete: F) -> StillcutResult<Conversion>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        F: FnOnce(PathBuf) + 'static,
    {
        self.convert(
            paths.into_iter().map(|p| FrameSource::File(p.into())),
            on_complete,
        )
    }

    /// [`convert`](Self::convert) over decoded in-memory images.
    pub fn convert_images<I, F>(self, images: I, on_complete: F) -> StillcutResult<Conversion>
    where
        I: IntoIterator<Item = image::RgbaImage>,
        F: FnOnce(PathBuf) + 'static,
    {
        self.convert(images.into_iter().map(FrameSource::image), on_complete)
    }

    /// Encode `frames` on the current thread.
    pub fn convert_blocking<I>(self, frames: I) -> StillcutResult<ConversionReport>
    where
        I: IntoIterator<Item = FrameSource>,
    {
        run_batch(self.session, frames.into_iter().collect())
    }
}

/// Handle to a conversion running on the worker thread.
///
/// Dropping it without calling [`wait`](Self::wait) lets the conversion finish in the background
/// and discards the completion callback.
pub struct Conversion {
    worker: Option<JoinHandle<StillcutResult<ConversionReport>>>,
    on_complete: Option<Box<dyn FnOnce(PathBuf)>>,
}

impl Conversion {
    /// `true` once the worker has stopped, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the worker stops, then run the completion callback on this thread.
    pub fn wait(mut self) -> StillcutResult<ConversionReport> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| StillcutError::writer("conversion already joined"))?;
        let report = worker
            .join()
            .map_err(|_| StillcutError::writer("media input worker panicked"))??;

        if let Some(on_complete) = self.on_complete.take() {
            on_complete(report.destination.clone());
        }
        Ok(report)
    }
}

#[tracing::instrument(skip_all, fields(destination = %session.destination().display(), frames = frames.len()))]
fn run_batch<W: VideoWriter>(
    mut session: EncodingSession<W>,
    frames: Vec<FrameSource>,
) -> StillcutResult<ConversionReport> {
    let mut skipped = Vec::new();
    match feed(&mut session, &frames, &mut skipped) {
        Ok(()) => {}
        Err(e) => {
            tracing::error!(error = %e, "conversion aborted");
            session.abort();
            return Err(e);
        }
    }

    let frames_total = frames.len() as u64;
    let report = ConversionReport {
        destination: session.destination().to_path_buf(),
        frames_total,
        frames_written: session.frames_written(),
        skipped,
        duration: session.timeline_end()?,
    };
    tracing::info!(
        written = report.frames_written,
        skipped = report.skipped.len(),
        "conversion finished"
    );
    Ok(report)
}

fn feed<W: VideoWriter>(
    session: &mut EncodingSession<W>,
    frames: &[FrameSource],
    skipped: &mut Vec<FrameIndex>,
) -> StillcutResult<()> {
    session.begin()?;
    for (i, source) in frames.iter().enumerate() {
        let index = FrameIndex(i as u64);
        let img = match source.extract() {
            Ok(img) => img,
            Err(e) if !e.is_fatal() => {
                tracing::warn!(%index, %source, error = %e, "could not extract frame; skipping");
                skipped.push(index);
                continue;
            }
            Err(e) => return Err(e),
        };
        let buffer = session.render(&img)?;
        session.submit(index, &buffer)?;
    }
    session.finish()
}

#[cfg(test)]
#[path = "../tests/unit/encoder.rs"]
mod tests;
