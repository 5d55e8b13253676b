use std::{
    fmt::Write as _,
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    encode::{
        settings::EncodingSettings,
        writer::{VideoWriter, WriterStatus},
    },
    foundation::{
        core::MediaTime,
        error::{StillcutError, StillcutResult},
    },
    render::pixel_buffer::PixelBuffer,
};

/// Container extensions the writer accepts; ffmpeg picks the muxer from the extension.
pub const SUPPORTED_CONTAINERS: &[&str] = &["mov", "mp4", "m4v"];

const CONCAT_SCRIPT: &str = "frames.ffconcat";

/// Options for [`FfmpegWriter`].
#[derive(Clone, Debug)]
pub struct FfmpegWriterOpts {
    /// `ffmpeg` executable, looked up on `PATH` when not absolute.
    pub program: PathBuf,
    /// H.264 encoder name, e.g. `libx264` or `h264_videotoolbox`.
    pub encoder: String,
}

impl Default for FfmpegWriterOpts {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            encoder: "libx264".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct Attached {
    destination: PathBuf,
    /// Directory holding the staged frames and the concat script.
    staging: PathBuf,
    settings: EncodingSettings,
    frame_duration: MediaTime,
}

#[derive(Clone, Debug)]
struct StagedFrame {
    file_name: String,
    pts: MediaTime,
}

/// Writer that encodes through the system `ffmpeg` (requires ffmpeg 5.1 or newer).
///
/// Appended buffers are staged as PNG files next to the destination. `finish_writing` hands them
/// to ffmpeg through an ffconcat script that carries every frame's presentation time, so a
/// skipped slot lengthens the previous sample instead of adding a picture. Each sample lasts at
/// least one frame duration.
pub struct FfmpegWriter {
    opts: FfmpegWriterOpts,
    attached: Option<Attached>,
    staged: Vec<StagedFrame>,
    input_finished: bool,
    status: WriterStatus,
}

impl FfmpegWriter {
    pub fn new(opts: FfmpegWriterOpts) -> Self {
        Self {
            opts,
            attached: None,
            staged: Vec::new(),
            input_finished: false,
            status: WriterStatus::Unknown,
        }
    }

    fn attached(&self) -> StillcutResult<&Attached> {
        self.attached
            .as_ref()
            .ok_or_else(|| StillcutError::writer("ffmpeg writer is not attached"))
    }

    /// Arguments passed to `ffmpeg` for the attached output, excluding the program name.
    pub fn command_args(&self) -> StillcutResult<Vec<String>> {
        let a = self.attached()?;
        let (w, h) = (a.settings.width(), a.settings.height());

        let mut args: Vec<String> = ["-y", "-loglevel", "error", "-f", "concat", "-i"]
            .map(String::from)
            .to_vec();
        args.push(a.staging.join(CONCAT_SCRIPT).to_string_lossy().into_owned());
        args.extend(["-an", "-c:v"].map(String::from));
        args.push(self.opts.encoder.clone());
        if !w.is_multiple_of(2) || !h.is_multiple_of(2) {
            // yuv420p needs even dimensions; pad with black on the right/bottom.
            args.push("-vf".to_string());
            args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string());
        }
        args.extend(["-fps_mode", "passthrough", "-pix_fmt", "yuv420p"].map(String::from));
        if let Some(first) = self.staged.first()
            && !first.pts.is_zero()
        {
            // Concat input starts at zero; shift it so a leading skip stays an empty edit.
            args.push("-output_ts_offset".to_string());
            args.push(seconds(micros(first.pts)));
        }
        args.extend(["-movflags", "+faststart"].map(String::from));
        args.push(a.destination.to_string_lossy().into_owned());
        Ok(args)
    }

    /// ffconcat script listing the staged frames with their display durations.
    pub fn concat_script(&self) -> StillcutResult<String> {
        let a = self.attached()?;
        let d = a.frame_duration;
        let mut script = String::from("ffconcat version 1.0\n");
        for (i, frame) in self.staged.iter().enumerate() {
            let end = match self.staged.get(i + 1) {
                Some(next) => next.pts,
                None => frame.pts.checked_add(d).ok_or_else(|| {
                    StillcutError::writer(format!("timeline end overflows after {}", frame.pts))
                })?,
            };
            let duration = micros(end) - micros(frame.pts);
            // `write!` into a String cannot fail.
            let _ = writeln!(script, "file '{}'", frame.file_name);
            let _ = writeln!(script, "option framerate {}/{}", d.timescale, d.value);
            let _ = writeln!(script, "duration {}", seconds(duration));
        }
        Ok(script)
    }

    /// Number of frames staged for encoding.
    pub fn staged_frames(&self) -> usize {
        self.staged.len()
    }

    fn stage(&self, buffer: &PixelBuffer, file_name: &str) -> StillcutResult<()> {
        let a = self.attached()?;
        let mut rgb = Vec::with_capacity(buffer.width() as usize * buffer.height() as usize * 3);
        for row in buffer.packed_rows() {
            for px in row.chunks_exact(4) {
                rgb.extend_from_slice(&px[1..4]);
            }
        }
        let img = image::RgbImage::from_raw(buffer.width(), buffer.height(), rgb)
            .ok_or_else(|| StillcutError::writer("staged frame has an unexpected size"))?;
        let path = a.staging.join(file_name);
        img.save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| {
                StillcutError::writer(format!("failed to stage frame '{}': {e}", path.display()))
            })
    }

    fn remove_staging(&self) {
        if let Some(a) = self.attached.as_ref()
            && let Err(e) = std::fs::remove_dir_all(&a.staging)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %a.staging.display(), error = %e, "could not remove staged frames");
        }
    }

    #[tracing::instrument(skip(self), fields(program = %self.opts.program.display(), frames = self.staged.len()))]
    fn run_ffmpeg(&self) -> StillcutResult<()> {
        let a = self.attached()?;
        std::fs::write(a.staging.join(CONCAT_SCRIPT), self.concat_script()?).map_err(|e| {
            StillcutError::writer(format!("failed to write ffmpeg concat script: {e}"))
        })?;
        let args = self.command_args()?;
        tracing::debug!(?args, "spawning ffmpeg");

        let mut child = Command::new(&self.opts.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StillcutError::writer(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StillcutError::writer("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok::<_, std::io::Error>(stderr_bytes)
        });

        let status = child
            .wait()
            .map_err(|e| StillcutError::writer(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| StillcutError::writer("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| StillcutError::writer(format!("ffmpeg stderr read failed: {e}")))?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StillcutError::writer(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new(FfmpegWriterOpts::default())
    }
}

impl VideoWriter for FfmpegWriter {
    fn attach(
        &mut self,
        destination: &Path,
        settings: &EncodingSettings,
        frame_duration: MediaTime,
    ) -> StillcutResult<()> {
        let ext = destination
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_CONTAINERS.contains(&ext.as_str()) {
            return Err(StillcutError::construction(format!(
                "unsupported container for '{}' (expected one of: {})",
                destination.display(),
                SUPPORTED_CONTAINERS.join(", ")
            )));
        }
        if frame_duration.is_zero() || frame_duration.timescale == 0 {
            return Err(StillcutError::construction("frame duration must be > 0"));
        }
        ensure_parent_dir(destination)
            .map_err(|e| StillcutError::construction(format!("{e:#}")))?;
        if !is_ffmpeg_available(&self.opts.program) {
            return Err(StillcutError::construction(format!(
                "'{}' is required for H.264 encoding, but could not be run",
                self.opts.program.display()
            )));
        }

        self.attached = Some(Attached {
            destination: destination.to_path_buf(),
            staging: staging_dir_for(destination),
            settings: *settings,
            frame_duration,
        });
        Ok(())
    }

    fn start_writing(&mut self) -> StillcutResult<()> {
        if self.status != WriterStatus::Unknown {
            return Err(StillcutError::writer(format!(
                "cannot start writing from status {:?}",
                self.status
            )));
        }
        let staging = self.attached()?.staging.clone();
        self.remove_staging();
        std::fs::create_dir_all(&staging).map_err(|e| {
            self.status = WriterStatus::Failed;
            StillcutError::writer(format!(
                "failed to create frame staging directory '{}': {e}",
                staging.display()
            ))
        })?;
        tracing::debug!(staging = %staging.display(), "writing started");

        self.staged.clear();
        self.input_finished = false;
        self.status = WriterStatus::Writing;
        Ok(())
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        // Staging is synchronous, so a writing session is always ready.
        self.status == WriterStatus::Writing && !self.input_finished
    }

    fn append(&mut self, buffer: &PixelBuffer, pts: MediaTime) -> StillcutResult<()> {
        if self.status != WriterStatus::Writing || self.input_finished {
            return Err(StillcutError::writer("ffmpeg writer is not accepting frames"));
        }
        let a = self.attached()?;
        if buffer.width() != a.settings.width() || buffer.height() != a.settings.height() {
            return Err(StillcutError::writer(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                buffer.width(),
                buffer.height(),
                a.settings.width(),
                a.settings.height()
            )));
        }
        if let Some(last) = self.staged.last()
            && pts <= last.pts
        {
            return Err(StillcutError::writer(format!(
                "out-of-order presentation time {pts} after {}",
                last.pts
            )));
        }

        let file_name = format!("frame_{:06}.png", self.staged.len());
        self.stage(buffer, &file_name)?;
        self.staged.push(StagedFrame { file_name, pts });
        Ok(())
    }

    fn mark_as_finished(&mut self) {
        self.input_finished = true;
    }

    fn finish_writing(&mut self) -> StillcutResult<()> {
        if self.status != WriterStatus::Writing {
            return Err(StillcutError::writer(format!(
                "cannot finish writing from status {:?}",
                self.status
            )));
        }
        self.input_finished = true;

        if self.staged.is_empty() {
            self.remove_staging();
            self.status = WriterStatus::Completed;
            tracing::info!("no frames appended; no video file written");
            return Ok(());
        }

        let result = self.run_ffmpeg();
        self.remove_staging();
        match result {
            Ok(()) => {
                self.status = WriterStatus::Completed;
                Ok(())
            }
            Err(e) => {
                self.status = WriterStatus::Failed;
                Err(e)
            }
        }
    }

    fn cancel_writing(&mut self) {
        self.input_finished = true;
        self.remove_staging();
        if let Some(a) = self.attached.as_ref() {
            let _ = std::fs::remove_file(&a.destination);
        }
        self.status = WriterStatus::Cancelled;
    }

    fn status(&self) -> WriterStatus {
        self.status
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.status == WriterStatus::Writing {
            self.cancel_writing();
        }
    }
}

/// `.<file name>.frames` beside `destination`.
fn staging_dir_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.frames"))
}

/// `t` in whole microseconds, rounded to nearest.
fn micros(t: MediaTime) -> u128 {
    let ts = u128::from(t.timescale);
    (u128::from(t.value) * 1_000_000 + ts / 2) / ts
}

fn seconds(us: u128) -> String {
    format!("{}.{:06}", us / 1_000_000, us % 1_000_000)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StillcutResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_ffmpeg_available(Path::new("ffmpeg"))
}

fn is_ffmpeg_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
