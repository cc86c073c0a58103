//! Audio input and per-frame feature extraction.

/// AnalyserNode-compatible FFT and frequency snapshots.
pub mod analyser;
/// Guarded analysis graph and export stream tap.
pub mod graph;
/// Audio decoding and the playback transport.
pub mod media;
