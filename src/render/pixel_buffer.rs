use std::fmt;

use image::imageops::FilterType;

use crate::{
    encode::settings::{EncodingSettings, FrameFit},
    foundation::{
        error::{StillcutError, StillcutResult},
        math::{align_up, over_u8},
    },
};

/// Row stride alignment, matching what hardware encoders expect of their input surfaces.
pub const ROW_ALIGNMENT: usize = 64;

/// Memory layout of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit packed RGB with a leading padding byte: `X R G B` in memory order.
    Xrgb8888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Xrgb8888 => 4,
        }
    }
}

/// Uncompressed frame in the encoder's input format.
///
/// Rows are `bytes_per_row` apart; only the first `width * 4` bytes of each row are pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

const PAD: u8 = 0xff;

impl PixelBuffer {
    /// Allocate a zeroed (black) buffer. Fails on zero or unrepresentable dimensions, or when the
    /// allocator refuses the request.
    pub fn allocate(width: u32, height: u32) -> StillcutResult<Self> {
        if width == 0 || height == 0 {
            return Err(StillcutError::render(format!(
                "cannot allocate a {width}x{height} pixel buffer"
            )));
        }
        let format = PixelFormat::Xrgb8888;
        let bytes_per_row = (width as usize)
            .checked_mul(format.bytes_per_pixel())
            .and_then(|n| align_up(n, ROW_ALIGNMENT))
            .ok_or_else(|| StillcutError::render("pixel buffer row size overflow"))?;
        let len = bytes_per_row
            .checked_mul(height as usize)
            .ok_or_else(|| StillcutError::render("pixel buffer size overflow"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            StillcutError::render(format!(
                "pixel buffer allocation of {len} bytes failed: {e}"
            ))
        })?;
        data.resize(len, 0);

        let mut buf = Self {
            width,
            height,
            bytes_per_row,
            format,
            data,
        };
        buf.fill([0, 0, 0]);
        Ok(buf)
    }

    /// Allocate a buffer sized to `settings`.
    pub fn for_settings(settings: &EncodingSettings) -> StillcutResult<Self> {
        Self::allocate(settings.width(), settings.height())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes of pixel data per row, excluding stride padding.
    pub fn packed_row_len(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Pixel rows without stride padding, top row first.
    pub fn packed_rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let len = self.packed_row_len();
        self.data
            .chunks_exact(self.bytes_per_row)
            .map(move |row| &row[..len])
    }

    /// `[x, r, g, b]` at `(x, y)`, origin top-left.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = y as usize * self.bytes_per_row + x as usize * 4;
        let px = self.data.get(off..off + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Paint every pixel with an opaque color.
    pub fn fill(&mut self, rgb: [u8; 3]) {
        let len = self.packed_row_len();
        for row in self.data.chunks_exact_mut(self.bytes_per_row) {
            for px in row[..len].chunks_exact_mut(4) {
                px.copy_from_slice(&[PAD, rgb[0], rgb[1], rgb[2]]);
            }
        }
    }

    /// Rasterize a straight-alpha RGBA8 image into this buffer over `background`.
    pub fn draw_image(
        &mut self,
        img: &image::RgbaImage,
        fit: FrameFit,
        background: [u8; 3],
    ) -> StillcutResult<()> {
        if img.width() == 0 || img.height() == 0 {
            return Err(StillcutError::render("cannot draw an empty image"));
        }
        self.fill(background);

        let (w, h) = (self.width, self.height);
        match fit {
            FrameFit::Native => {
                // Bottom-left anchor: the image's last row lands on the frame's last row.
                let y0 = i64::from(h) - i64::from(img.height());
                self.blit(img, 0, y0);
            }
            FrameFit::Stretch => {
                if img.dimensions() == (w, h) {
                    self.blit(img, 0, 0);
                } else {
                    let scaled = image::imageops::resize(img, w, h, FilterType::Triangle);
                    self.blit(&scaled, 0, 0);
                }
            }
            FrameFit::Contain => {
                let (nw, nh) = contain_size(img.width(), img.height(), w, h);
                let x0 = i64::from((w - nw) / 2);
                let y0 = i64::from((h - nh) / 2);
                if (nw, nh) == img.dimensions() {
                    self.blit(img, x0, y0);
                } else {
                    let scaled = image::imageops::resize(img, nw, nh, FilterType::Triangle);
                    self.blit(&scaled, x0, y0);
                }
            }
        }
        Ok(())
    }

    /// Composite `img` with its top-left corner at `(x0, y0)`; out-of-frame pixels are clipped.
    fn blit(&mut self, img: &image::RgbaImage, x0: i64, y0: i64) {
        let (fw, fh) = (i64::from(self.width), i64::from(self.height));
        let x_start = x0.max(0);
        let x_end = (x0 + i64::from(img.width())).min(fw);
        if x_start >= x_end {
            return;
        }
        for sy in 0..img.height() {
            let dy = y0 + i64::from(sy);
            if dy < 0 {
                continue;
            }
            if dy >= fh {
                break;
            }
            let row_off = dy as usize * self.bytes_per_row;
            for dx in x_start..x_end {
                let sx = (dx - x0) as u32;
                let s = img.get_pixel(sx, sy).0;
                let off = row_off + dx as usize * 4;
                let d = &mut self.data[off..off + 4];
                d[0] = PAD;
                if s[3] == 255 {
                    d[1..4].copy_from_slice(&s[..3]);
                } else {
                    d[1] = over_u8(s[0], s[3], d[1]);
                    d[2] = over_u8(s[1], s[3], d[2]);
                    d[3] = over_u8(s[2], s[3], d[3]);
                }
            }
        }
    }
}

fn contain_size(iw: u32, ih: u32, fw: u32, fh: u32) -> (u32, u32) {
    let scale = (f64::from(fw) / f64::from(iw)).min(f64::from(fh) / f64::from(ih));
    let nw = ((f64::from(iw) * scale).round() as u32).clamp(1, fw);
    let nh = ((f64::from(ih) * scale).round() as u32).clamp(1, fh);
    (nw, nh)
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_row", &self.bytes_per_row)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pixel_buffer.rs"]
mod tests;
