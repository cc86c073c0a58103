use kurbo::Shape as _;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Affine, BezPath, Color, Rect};
use crate::foundation::error::PulseResult;
use crate::render::surface::Painter;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum DrawCall {
    Fill {
        path: BezPath,
        color: Color,
        transform: Affine,
    },
    Stroke {
        path: BezPath,
        width: f64,
        color: Color,
        transform: Affine,
    },
    Image {
        size: (u32, u32),
        dst: Rect,
        opacity: f32,
        transform: Affine,
    },
    Gradient {
        rect: Rect,
        top: Color,
        bottom: Color,
    },
    BeginGlow(f64),
    EndGlow,
}

impl DrawCall {
    pub(crate) fn bounds(&self) -> Option<Rect> {
        match self {
            Self::Fill { path, .. } | Self::Stroke { path, .. } => Some(path.bounding_box()),
            Self::Image { dst, .. } => Some(*dst),
            Self::Gradient { rect, .. } => Some(*rect),
            Self::BeginGlow(_) | Self::EndGlow => None,
        }
    }
}

/// Painter that records calls instead of rasterizing.
#[derive(Debug)]
pub(crate) struct RecordingPainter {
    width: u32,
    height: u32,
    transform: Affine,
    stack: Vec<Affine>,
    pub(crate) calls: Vec<DrawCall>,
}

impl RecordingPainter {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            transform: Affine::IDENTITY,
            stack: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn fills(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Fill { .. }))
    }

    pub(crate) fn strokes(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Stroke { .. }))
    }
}

impl Painter for RecordingPainter {
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
        self.calls.push(DrawCall::Fill {
            path: path.clone(),
            color,
            transform: self.transform,
        });
    }

    fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color) {
        self.calls.push(DrawCall::Stroke {
            path: path.clone(),
            width,
            color,
            transform: self.transform,
        });
    }

    fn draw_image(&mut self, image: &PreparedImage, dst: Rect, opacity: f32) -> PulseResult<()> {
        self.calls.push(DrawCall::Image {
            size: (image.width, image.height),
            dst,
            opacity,
            transform: self.transform,
        });
        Ok(())
    }

    fn fill_vertical_gradient(
        &mut self,
        rect: Rect,
        top: Color,
        bottom: Color,
    ) -> PulseResult<()> {
        self.calls.push(DrawCall::Gradient { rect, top, bottom });
        Ok(())
    }

    fn begin_glow(&mut self, radius: f64) -> PulseResult<()> {
        self.calls.push(DrawCall::BeginGlow(radius));
        Ok(())
    }

    fn end_glow(&mut self) -> PulseResult<()> {
        self.calls.push(DrawCall::EndGlow);
        Ok(())
    }
}
