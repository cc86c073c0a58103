//! Engine ownership and real-time scheduling.

/// Threaded real-time scheduler.
pub mod frame_loop;
/// The engine that owns media, analysis, scene and surface.
pub mod visualizer;
