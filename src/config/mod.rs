//! Render configuration snapshots.
//!
//! A [`model::RenderConfig`] is immutable once published; edits and preset selection replace the
//! whole snapshot through [`model::ConfigHandle`].

/// Configuration model, validation and the shared handle.
pub mod model;
/// Built-in named presets.
pub mod presets;
