//! Video encoding for export.
//!
//! An encoder consumes captured frames in capture order plus a tapped audio track and reports the
//! encoded container back as [`encoder::EncoderEvent`] messages.

/// Generic encoder contract and the in-memory encoder.
pub mod encoder;
/// `ffmpeg`-backed encoder and capability probe.
pub mod ffmpeg;
/// Export container formats and negotiation.
pub mod format;
