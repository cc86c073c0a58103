use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{PulseError, PulseResult};
use crate::render::composite::flatten_over_opaque;

/// A rendered frame as RGBA8 pixels.
///
/// Frames coming out of [`crate::render::surface::RasterSurface`] are premultiplied alpha; the flag
/// keeps that explicit at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`, `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Opaque copy of the frame flattened over black.
    pub fn to_opaque(&self) -> PulseResult<Vec<u8>> {
        if !self.premultiplied {
            return Err(PulseError::validation(
                "expected premultiplied frame for flattening",
            ));
        }
        let mut out = vec![0u8; self.data.len()];
        flatten_over_opaque(&self.data, &mut out, [0, 0, 0])?;
        Ok(out)
    }

    /// Write the frame as an opaque PNG.
    pub fn save_png(&self, path: &Path) -> PulseResult<()> {
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_opaque()?)
            .ok_or_else(|| PulseError::validation("frame buffer does not match dimensions"))?;
        img.save(path)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
