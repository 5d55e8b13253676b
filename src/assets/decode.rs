use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{StillcutError, StillcutResult};

/// Decode encoded image bytes (PNG, JPEG, ...) into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> StillcutResult<image::RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode an image file.
///
/// Both the read and the decode are reported as [`StillcutError::Extract`] so the encoder can
/// skip the frame instead of aborting.
pub fn decode_image_file(path: &Path) -> StillcutResult<image::RgbaImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        StillcutError::extract(format!("failed to read image '{}': {e}", path.display()))
    })?;
    decode_image(&bytes).map_err(|e| {
        StillcutError::extract(format!("failed to decode image '{}': {e}", path.display()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
