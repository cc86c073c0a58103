//! The audio-reactive scene.

/// Per-frame orchestration and camera state.
pub mod compositor;
/// Particle population and behaviors.
pub mod particles;
/// Spectrum geometry.
pub mod spectrum;
