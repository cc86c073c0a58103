//! pulseviz is an audio-reactive visualizer engine with video export.
//!
//! A [`Visualizer`] owns a decoded audio track, the frequency analyser fed by it, the scene
//! compositor and a CPU raster surface:
//!
//! - Load audio ([`load_audio_file`]) and optional logo/background images
//! - Drive it in real time with a [`FrameLoop`], or tick it yourself
//! - Bake the composition plus the original audio into a video with an [`ExportController`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Image decoding.
pub mod assets;
/// Audio decoding, transport and frequency analysis.
pub mod audio;
/// Render configuration and presets.
pub mod config;
/// Video encoders and format negotiation.
pub mod encode;
/// Export pipeline.
pub mod export;
/// Shared types and errors.
pub mod foundation;
/// CPU raster surface and pixel helpers.
pub mod render;
/// Particles, spectrum and per-frame composition.
pub mod scene;
/// Engine and real-time frame loop.
pub mod session;

pub use crate::foundation::core::{
    Affine, AspectRatio, BezPath, Canvas, Color, Fps, FrameIndex, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{PulseError, PulseResult};

pub use crate::assets::decode::{PreparedImage, decode_image, load_image};
pub use crate::audio::media::{AudioPcm, MediaElement, MediaEvent, load_audio_file};
pub use crate::config::model::{
    BackgroundBehavior, ConfigHandle, DynamicStyle, LogoBehavior, ParticleBehavior, RenderConfig,
};
pub use crate::encode::encoder::{EncoderEvent, InMemoryEncoder, MediaEncoder};
pub use crate::encode::ffmpeg::{FfmpegCapabilities, FfmpegEncoder};
pub use crate::encode::format::{Capabilities, ExportFormat, StaticCapabilities};
pub use crate::export::session::{ExportController, ExportOutcome, ExportState, StartOutcome};
pub use crate::render::frame::FrameRGBA;
pub use crate::scene::compositor::{SceneAssets, TickOutcome};
pub use crate::session::frame_loop::{FrameLoop, LoopStats};
pub use crate::session::visualizer::{TickReport, Visualizer, VisualizerOpts};
