use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};

use crate::encode::format::ExportFormat;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{PulseError, PulseResult};
use crate::render::frame::FrameRGBA;

/// Configuration handed to a [`MediaEncoder`] when encoding starts.
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Capture frame rate.
    pub fps: Fps,
    /// Negotiated output format.
    pub format: ExportFormat,
    /// Tapped audio, if any.
    pub audio: Option<AudioInputConfig>,
}

impl EncoderConfig {
    pub(crate) fn validate(&self) -> PulseResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(PulseError::validation("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(PulseError::validation(
                "encoder width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(PulseError::validation(
                "encoder width/height must be even (required for yuv420p output)",
            ));
        }
        if let Some(audio) = self.audio.as_ref() {
            if audio.sample_rate == 0 {
                return Err(PulseError::validation(
                    "audio sample_rate must be non-zero when audio is enabled",
                ));
            }
            if audio.channels == 0 {
                return Err(PulseError::validation(
                    "audio channels must be non-zero when audio is enabled",
                ));
            }
        }
        Ok(())
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Raw PCM audio input for encoders that mux audio.
#[derive(Clone, Debug)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Messages an encoder sends back while it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A piece of the encoded container, in output order.
    Chunk(Vec<u8>),
    /// All chunks have been delivered.
    StreamEnded,
    /// The encoder failed; no further events follow.
    Error(String),
}

/// Encoder contract used by the exporter.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order between
/// `start` and `finish`. Chunks may arrive on the returned channel at any time; after `finish`
/// the channel ends with exactly one `StreamEnded` or `Error`.
pub trait MediaEncoder: Send {
    /// Begin encoding. Returns the event channel for this run.
    fn start(&mut self, cfg: EncoderConfig) -> PulseResult<Receiver<EncoderEvent>>;
    /// Push one captured premultiplied frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> PulseResult<()>;
    /// Close the input and flush the remaining output.
    fn finish(&mut self) -> PulseResult<()>;
}

impl<E: MediaEncoder + ?Sized> MediaEncoder for Box<E> {
    fn start(&mut self, cfg: EncoderConfig) -> PulseResult<Receiver<EncoderEvent>> {
        (**self).start(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> PulseResult<()> {
        (**self).push_frame(idx, frame)
    }

    fn finish(&mut self) -> PulseResult<()> {
        (**self).finish()
    }
}

/// Encoder that emits every pushed frame as an opaque raw RGBA chunk.
///
/// Useful for tests and debugging: the output "container" is the concatenated frames, preceded by
/// the audio bytes when an audio input is configured.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    cfg: Option<EncoderConfig>,
    tx: Option<Sender<EncoderEvent>>,
    last_idx: Option<FrameIndex>,
    frames: u64,
    audio_bytes: u64,
    fail_after: Option<u64>,
    failed: bool,
}

impl InMemoryEncoder {
    /// Create a new in-memory encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder that reports `EncoderEvent::Error` once `frames` frames were pushed.
    pub fn failing_after(frames: u64) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::default()
        }
    }

    /// Configuration captured in `start`, if any.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.cfg.as_ref()
    }

    /// Frames pushed in the current or last run.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Audio bytes read at start of the current or last run.
    pub fn audio_bytes(&self) -> u64 {
        self.audio_bytes
    }

    fn sender(&self) -> PulseResult<&Sender<EncoderEvent>> {
        self.tx
            .as_ref()
            .ok_or_else(|| PulseError::encode("in-memory encoder not started"))
    }
}

impl MediaEncoder for InMemoryEncoder {
    fn start(&mut self, cfg: EncoderConfig) -> PulseResult<Receiver<EncoderEvent>> {
        cfg.validate()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        self.audio_bytes = 0;
        if let Some(audio) = cfg.audio.as_ref() {
            use anyhow::Context as _;
            let bytes = std::fs::read(&audio.path)
                .with_context(|| format!("read audio input '{}'", audio.path.display()))?;
            self.audio_bytes = bytes.len() as u64;
            if !bytes.is_empty() {
                let _ = tx.send(EncoderEvent::Chunk(bytes));
            }
        }
        self.cfg = Some(cfg);
        self.tx = Some(tx);
        self.last_idx = None;
        self.frames = 0;
        self.failed = false;
        Ok(rx)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> PulseResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| PulseError::encode("in-memory encoder not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(PulseError::encode(
                "encoder received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(PulseError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != cfg.frame_len() {
            return Err(PulseError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let chunk = frame.to_opaque()?;
        self.frames += 1;
        if self.failed {
            return Ok(());
        }
        let fail = self.fail_after.is_some_and(|n| self.frames > n);
        let tx = self.sender()?;
        if fail {
            let _ = tx.send(EncoderEvent::Error("scripted encoder failure".to_string()));
        } else {
            let _ = tx.send(EncoderEvent::Chunk(chunk));
        }
        self.failed = fail;
        Ok(())
    }

    fn finish(&mut self) -> PulseResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| PulseError::encode("in-memory encoder not started"))?;
        if !self.failed {
            let _ = tx.send(EncoderEvent::StreamEnded);
        }
        self.cfg = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
