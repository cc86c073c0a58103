use crate::foundation::error::{PulseError, PulseResult};
use crate::foundation::math::mul_div255_u8;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for one premultiplied pixel with an extra opacity multiplier.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite `src` over `dst`, both full-size RGBA8 buffers of equal length.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> PulseResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PulseError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Pixel-aligned rectangle inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Bounding box of pixels with non-zero alpha, grown by `pad` and clipped to the frame.
pub fn alpha_bounds(rgba: &[u8], width: u32, height: u32, pad: u32) -> Option<PixelRect> {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
    for (i, px) in rgba.chunks_exact(4).enumerate() {
        if px[3] == 0 {
            continue;
        }
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        x0 = x0.min(x);
        y0 = y0.min(y);
        x1 = x1.max(x);
        y1 = y1.max(y);
    }
    if x0 == u32::MAX || height == 0 {
        return None;
    }
    let x0 = x0.saturating_sub(pad);
    let y0 = y0.saturating_sub(pad);
    let x1 = x1.saturating_add(pad).min(width - 1);
    let y1 = y1.saturating_add(pad).min(height - 1);
    Some(PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    })
}

/// Copy `rect` out of a frame into a tightly packed buffer.
pub fn extract_region(rgba: &[u8], frame_width: u32, rect: PixelRect) -> Vec<u8> {
    let mut out = Vec::with_capacity(rect.width as usize * rect.height as usize * 4);
    for row in rect.y..rect.y + rect.height {
        let start = (row as usize * frame_width as usize + rect.x as usize) * 4;
        out.extend_from_slice(&rgba[start..start + rect.width as usize * 4]);
    }
    out
}

/// Composite a tightly packed `src` region over `dst` at `rect`.
pub fn over_region(
    dst: &mut [u8],
    frame_width: u32,
    src: &[u8],
    rect: PixelRect,
    opacity: f32,
) -> PulseResult<()> {
    let row_bytes = rect.width as usize * 4;
    if src.len() != row_bytes * rect.height as usize {
        return Err(PulseError::validation(
            "over_region expects src matching rect size",
        ));
    }
    for (r, src_row) in src.chunks_exact(row_bytes).enumerate() {
        let start = ((rect.y as usize + r) * frame_width as usize + rect.x as usize) * 4;
        let dst_row = dst
            .get_mut(start..start + row_bytes)
            .ok_or_else(|| PulseError::validation("over_region rect outside frame"))?;
        over_in_place(dst_row, src_row, opacity)?;
    }
    Ok(())
}

/// Flatten premultiplied RGBA8 over an opaque background into opaque RGBA8.
pub fn flatten_over_opaque(src: &[u8], dst: &mut [u8], bg: [u8; 3]) -> PulseResult<()> {
    if src.len() != dst.len() || !src.len().is_multiple_of(4) {
        return Err(PulseError::validation(
            "flatten expects equal-length rgba8 buffers",
        ));
    }
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let inv = 255u16 - u16::from(s[3]);
        for c in 0..3 {
            d[c] = s[c].saturating_add(mul_div255_u8(u16::from(bg[c]), inv));
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
