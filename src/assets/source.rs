use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    assets::decode::{decode_image, decode_image_file},
    foundation::error::{StillcutError, StillcutResult},
};

/// One item of an image sequence.
#[derive(Clone)]
pub enum FrameSource {
    /// Image file on disk, read and decoded when the frame is reached.
    File(PathBuf),
    /// Encoded image bytes held in memory.
    Encoded(Arc<[u8]>),
    /// Already decoded straight-alpha RGBA8 image.
    Image(Arc<image::RgbaImage>),
}

impl FrameSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn encoded(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Encoded(bytes.into())
    }

    pub fn image(img: image::RgbaImage) -> Self {
        Self::Image(Arc::new(img))
    }

    /// Resolve this source to decoded pixels.
    ///
    /// Failures are [`StillcutError::Extract`]; the caller decides whether to skip.
    pub fn extract(&self) -> StillcutResult<Arc<image::RgbaImage>> {
        match self {
            Self::File(path) => decode_image_file(path).map(Arc::new),
            Self::Encoded(bytes) => decode_image(bytes)
                .map(Arc::new)
                .map_err(|e| StillcutError::extract(format!("failed to decode image bytes: {e}"))),
            Self::Image(img) => {
                if img.width() == 0 || img.height() == 0 {
                    return Err(StillcutError::extract("in-memory image is empty"));
                }
                Ok(Arc::clone(img))
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Encoded(_) | Self::Image(_) => None,
        }
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => f.debug_tuple("File").field(p).finish(),
            Self::Encoded(b) => f.debug_struct("Encoded").field("len", &b.len()).finish(),
            Self::Image(img) => f
                .debug_struct("Image")
                .field("width", &img.width())
                .field("height", &img.height())
                .finish(),
        }
    }
}

impl fmt::Display for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "file '{}'", p.display()),
            Self::Encoded(b) => write!(f, "{} encoded bytes", b.len()),
            Self::Image(img) => write!(f, "{}x{} image", img.width(), img.height()),
        }
    }
}

impl From<PathBuf> for FrameSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for FrameSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<image::RgbaImage> for FrameSource {
    fn from(img: image::RgbaImage) -> Self {
        Self::image(img)
    }
}

impl From<image::DynamicImage> for FrameSource {
    fn from(img: image::DynamicImage) -> Self {
        Self::image(img.to_rgba8())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
