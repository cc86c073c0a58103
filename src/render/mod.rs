//! CPU rasterization.
//!
//! Scene code draws through the [`surface::Painter`] trait; [`surface::RasterSurface`] implements
//! it on top of `vello_cpu` and produces premultiplied [`frame::FrameRGBA`] frames.

/// Separable gaussian blur used for glow layers.
pub mod blur;
/// Premultiplied RGBA8 compositing helpers.
pub mod composite;
/// Finished frame type.
pub mod frame;
#[cfg(test)]
pub(crate) mod recording;
/// `vello_cpu` raster surface and the painter trait.
pub mod surface;
