use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Affine, BezPath, Canvas, Color, Point, Rect, Vec2};
use crate::foundation::error::{PulseError, PulseResult};
use crate::render::blur::{blur_rgba8_premul, glow_sigma};
use crate::render::composite::{alpha_bounds, extract_region, over_in_place, over_region};
use crate::render::frame::FrameRGBA;

/// Drawing surface used by the scene code.
///
/// Coordinates are in surface pixels, mapped through the current transform. `save`/`restore`
/// bracket transform changes the way a 2D canvas context does.
pub trait Painter {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);
    /// Current transform.
    fn transform(&self) -> Affine;
    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine);
    /// Push the current transform.
    fn save(&mut self);
    /// Pop the last saved transform (no-op when nothing is saved).
    fn restore(&mut self);

    /// Fill a path with a solid color.
    fn fill_path(&mut self, path: &BezPath, color: Color);
    /// Stroke a path with round caps.
    fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color);
    /// Draw `image` scaled into `dst`.
    fn draw_image(&mut self, image: &PreparedImage, dst: Rect, opacity: f32) -> PulseResult<()>;
    /// Fill `rect` with a vertical two-stop gradient.
    fn fill_vertical_gradient(&mut self, rect: Rect, top: Color, bottom: Color)
    -> PulseResult<()>;
    /// Start a layer whose content is composited with a blurred copy underneath.
    fn begin_glow(&mut self, radius: f64) -> PulseResult<()>;
    /// Close the layer opened by [`Painter::begin_glow`].
    fn end_glow(&mut self) -> PulseResult<()>;

    /// Post-multiply a translation.
    fn translate(&mut self, offset: Vec2) {
        let t = self.transform() * Affine::translate(offset);
        self.set_transform(t);
    }

    /// Post-multiply a uniform scale.
    fn scale(&mut self, s: f64) {
        let t = self.transform() * Affine::scale(s);
        self.set_transform(t);
    }

    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let path = kurbo::Shape::to_path(&rect, 0.1);
        self.fill_path(&path, color);
    }

    /// Fill a disc.
    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        let path = kurbo::Shape::to_path(&kurbo::Circle::new(center, radius), 0.1);
        self.fill_path(&path, color);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GradientKey {
    top: Color,
    bottom: Color,
    w: u32,
    h: u32,
}

/// CPU raster surface backed by `vello_cpu`.
///
/// Drawing is recorded into a render context and rasterized in segments: every glow layer
/// boundary flushes the pending segment into a scratch pixmap, which is then composited onto the
/// frame buffer (blurred first when the segment is a glow layer).
pub struct RasterSurface {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    scratch: vello_cpu::Pixmap,
    ctx: vello_cpu::RenderContext,
    pending: bool,
    transform: Affine,
    stack: Vec<Affine>,
    glow_radius: Option<u32>,
    images: Vec<(Arc<Vec<u8>>, vello_cpu::Image)>,
    gradient: Option<(GradientKey, vello_cpu::Image)>,
}

const IMAGE_CACHE_CAP: usize = 4;

impl RasterSurface {
    /// Allocate a transparent surface for `canvas`.
    pub fn new(canvas: Canvas) -> PulseResult<Self> {
        let (w, h) = surface_dims(canvas)?;
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            frame: vec![0u8; canvas.width as usize * canvas.height as usize * 4],
            scratch: vello_cpu::Pixmap::new(w, h),
            ctx: vello_cpu::RenderContext::new(w, h),
            pending: false,
            transform: Affine::IDENTITY,
            stack: Vec::new(),
            glow_radius: None,
            images: Vec::new(),
            gradient: None,
        })
    }

    /// Surface dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Clear to transparent and reset the transform stack.
    pub fn begin_frame(&mut self) {
        self.frame.fill(0);
        self.ctx.reset();
        self.pending = false;
        self.transform = Affine::IDENTITY;
        self.stack.clear();
        self.glow_radius = None;
    }

    /// Rasterize all pending drawing into the frame buffer.
    pub fn finish(&mut self) -> PulseResult<()> {
        self.glow_radius = None;
        self.flush_segment()
    }

    /// Rasterize pending drawing and return a copy of the finished frame.
    pub fn finish_frame(&mut self) -> PulseResult<FrameRGBA> {
        self.finish()?;
        Ok(self.frame())
    }

    /// Copy of the frame buffer as of the last [`RasterSurface::finish`].
    pub fn frame(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.width,
            height: self.height,
            data: self.frame.clone(),
            premultiplied: true,
        }
    }

    /// Frame buffer bytes (premultiplied RGBA8).
    pub fn frame_bytes(&self) -> &[u8] {
        &self.frame
    }

    fn flush_segment(&mut self) -> PulseResult<()> {
        if !self.pending {
            return Ok(());
        }
        self.ctx.flush();
        clear_pixmap(&mut self.scratch);
        self.ctx.render_to_pixmap(&mut self.scratch);
        self.ctx.reset();
        self.pending = false;

        let src = self.scratch.data_as_u8_slice();
        match self.glow_radius.filter(|r| *r > 0) {
            Some(r) => {
                let Some(rect) = alpha_bounds(src, self.width, self.height, r) else {
                    return Ok(());
                };
                let region = extract_region(src, self.width, rect);
                let blurred = blur_rgba8_premul(&region, rect.width, rect.height, r, glow_sigma(r))?;
                over_region(&mut self.frame, self.width, &blurred, rect, 1.0)?;
                over_region(&mut self.frame, self.width, &region, rect, 1.0)
            }
            None => over_in_place(&mut self.frame, src, 1.0),
        }
    }

    fn image_paint(&mut self, image: &PreparedImage) -> PulseResult<vello_cpu::Image> {
        if let Some((_, paint)) = self
            .images
            .iter()
            .find(|(bytes, _)| Arc::ptr_eq(bytes, &image.rgba8_premul))
        {
            return Ok(paint.clone());
        }
        let pixmap = image_premul_bytes_to_pixmap(&image.rgba8_premul, image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        if self.images.len() >= IMAGE_CACHE_CAP {
            self.images.remove(0);
        }
        self.images
            .push((image.rgba8_premul.clone(), paint.clone()));
        Ok(paint)
    }

    fn gradient_paint(
        &mut self,
        top: Color,
        bottom: Color,
        w: u32,
        h: u32,
    ) -> PulseResult<vello_cpu::Image> {
        let key = GradientKey { top, bottom, w, h };
        if let Some((k, img)) = &self.gradient
            && *k == key
        {
            return Ok(img.clone());
        }
        let mut bytes = vec![0u8; (w as usize).saturating_mul(h as usize).saturating_mul(4)];
        let h1 = f64::from(h.max(1) - 1);
        for y in 0..h {
            let t = if h1 <= 0.0 { 0.0 } else { f64::from(y) / h1 };
            let c = top.lerp(bottom, t).premul();
            let px = [c.r, c.g, c.b, c.a];
            let row = y as usize * w as usize * 4;
            for chunk in bytes[row..row + w as usize * 4].chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
        let pixmap = image_premul_bytes_to_pixmap(&bytes, w, h)?;
        let img = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.gradient = Some((key, img.clone()));
        Ok(img)
    }

    fn fill_paint_rect(
        &mut self,
        paint: vello_cpu::Image,
        paint_w: u32,
        paint_h: u32,
        dst: Rect,
        opacity: f32,
    ) {
        if dst.width() <= 0.0 || dst.height() <= 0.0 || opacity <= 0.0 {
            return;
        }
        let pw = f64::from(paint_w.max(1));
        let ph = f64::from(paint_h.max(1));
        let t = self.transform
            * Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / pw, dst.height() / ph);
        self.ctx.set_transform(affine_to_cpu(t));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(paint);
        if opacity < 1.0 {
            self.ctx.push_opacity_layer(opacity);
        }
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, pw, ph));
        if opacity < 1.0 {
            self.ctx.pop_layer();
        }
        self.pending = true;
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pending", &self.pending)
            .finish()
    }
}

impl Painter for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
    }

    fn restore(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.transform = t;
        }
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        if color.a == 0 {
            return;
        }
        self.ctx.set_transform(affine_to_cpu(self.transform));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.fill_path(&bezpath_to_cpu(path));
        self.pending = true;
    }

    fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color) {
        if color.a == 0 || !(width > 0.0) {
            return;
        }
        self.ctx.set_transform(affine_to_cpu(self.transform));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_stroke(
            vello_cpu::kurbo::Stroke::new(width).with_caps(vello_cpu::kurbo::Cap::Round),
        );
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.stroke_path(&bezpath_to_cpu(path));
        self.pending = true;
    }

    fn draw_image(&mut self, image: &PreparedImage, dst: Rect, opacity: f32) -> PulseResult<()> {
        let paint = self.image_paint(image)?;
        self.fill_paint_rect(paint, image.width, image.height, dst, opacity);
        Ok(())
    }

    fn fill_vertical_gradient(
        &mut self,
        rect: Rect,
        top: Color,
        bottom: Color,
    ) -> PulseResult<()> {
        let w = rect.width().ceil().max(1.0) as u32;
        let h = rect.height().ceil().max(1.0) as u32;
        let paint = self.gradient_paint(top, bottom, w, h)?;
        self.fill_paint_rect(paint, w, h, rect, 1.0);
        Ok(())
    }

    fn begin_glow(&mut self, radius: f64) -> PulseResult<()> {
        self.flush_segment()?;
        let r = if radius.is_finite() {
            radius.round().clamp(0.0, 255.0) as u32
        } else {
            0
        };
        self.glow_radius = Some(r);
        Ok(())
    }

    fn end_glow(&mut self) -> PulseResult<()> {
        self.flush_segment()?;
        self.glow_radius = None;
        Ok(())
    }
}

fn surface_dims(canvas: Canvas) -> PulseResult<(u16, u16)> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(PulseError::validation("surface size must be non-zero"));
    }
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| PulseError::validation("surface width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| PulseError::validation("surface height exceeds u16"))?;
    Ok((w, h))
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> PulseResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| PulseError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| PulseError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(PulseError::validation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
