use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{PulseError, PulseResult};

/// Sample rate used when decoding non-WAV sources through `ffmpeg`.
pub const DECODE_SAMPLE_RATE: u32 = 48_000;

#[derive(Clone, Debug)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Build single-channel PCM.
    pub fn from_mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: 1,
            interleaved_f32: samples,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Mono downmix of frame `i` (0.0 past the end).
    pub(crate) fn mono_at(&self, i: usize) -> f32 {
        let ch = usize::from(self.channels);
        let start = i * ch;
        match self.interleaved_f32.get(start..start + ch) {
            Some(frame) => frame.iter().sum::<f32>() / ch as f32,
            None => 0.0,
        }
    }

    fn ensure_loaded(&self) -> PulseResult<()> {
        if self.sample_rate == 0 || self.channels == 0 || self.frames() == 0 {
            return Err(PulseError::missing("audio source contains no samples"));
        }
        Ok(())
    }
}

/// Decode an audio file into PCM.
///
/// `.wav` files are read with `hound` at their native rate. Everything else is decoded through the
/// system `ffmpeg` into 48 kHz stereo.
#[tracing::instrument]
pub fn load_audio_file(path: &Path) -> PulseResult<AudioPcm> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    let pcm = if is_wav {
        decode_wav(path)?
    } else {
        decode_audio_f32_stereo(path, DECODE_SAMPLE_RATE)?
    };
    pcm.ensure_loaded()?;
    tracing::info!(
        sample_rate = pcm.sample_rate,
        channels = pcm.channels,
        duration_s = pcm.duration_secs(),
        "decoded audio"
    );
    Ok(pcm)
}

/// Decode a WAV file with `hound`.
pub fn decode_wav(path: &Path) -> PulseResult<AudioPcm> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("open wav '{}'", path.display()))?;
    let spec = reader.spec();
    let interleaved_f32 = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("read f32 wav samples")?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .context("read integer wav samples")?
        }
    };
    Ok(AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32,
    })
}

/// Decode audio from a media source to stereo interleaved `f32` PCM via `ffmpeg`.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> PulseResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            PulseError::unsupported(format!("failed to run ffmpeg for audio decode: {e}"))
        })?;

    if !out.status.success() {
        return Err(PulseError::validation(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(PulseError::validation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}

/// Transport signals emitted by a [`MediaElement`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaEvent {
    /// Playback started or resumed.
    Play,
    /// Playback paused (including the implicit pause at the end).
    Pause,
    /// The playback position moved.
    TimeUpdate {
        /// New position in seconds.
        current_time: f64,
    },
    /// Playback reached the end of the track.
    Ended,
}

/// A decoded audio track with a play/pause/seek transport.
///
/// The element does not own an output device: its clock moves only through [`MediaElement::advance`],
/// which the frame loop drives with wall-clock time and the exporter with capture time.
#[derive(Debug)]
pub struct MediaElement {
    pcm: Arc<AudioPcm>,
    current_time: f64,
    paused: bool,
    ended: bool,
    events: VecDeque<MediaEvent>,
}

impl MediaElement {
    /// Wrap decoded PCM. Fails with `MissingInput` for empty audio.
    pub fn new(pcm: AudioPcm) -> PulseResult<Self> {
        pcm.ensure_loaded()?;
        Ok(Self {
            pcm: Arc::new(pcm),
            current_time: 0.0,
            paused: true,
            ended: false,
            events: VecDeque::new(),
        })
    }

    /// Shared handle to the decoded PCM.
    pub fn pcm(&self) -> Arc<AudioPcm> {
        self.pcm.clone()
    }

    /// Track duration in seconds.
    pub fn duration(&self) -> f64 {
        self.pcm.duration_secs()
    }

    /// Current position in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// `true` while paused (initially, after `pause`, or after reaching the end).
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// `true` once playback reached the end and until the next seek/play.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Start playback. Playing an ended track restarts it from zero.
    pub fn play(&mut self) {
        if self.ended {
            self.ended = false;
            self.set_time(0.0);
        }
        if self.paused {
            self.paused = false;
            self.events.push_back(MediaEvent::Play);
        }
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push_back(MediaEvent::Pause);
        }
    }

    /// Move the playback position, clamped to the track.
    pub fn seek(&mut self, seconds: f64) {
        self.ended = false;
        self.set_time(seconds);
    }

    /// Advance the clock by `dt` seconds while playing.
    ///
    /// Emits `TimeUpdate`, and `Pause` + `Ended` exactly once when the end is reached.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || self.ended || !(dt > 0.0) {
            return;
        }
        let duration = self.duration();
        let next = self.current_time + dt;
        if next >= duration - 1e-9 {
            self.set_time(duration);
            self.paused = true;
            self.ended = true;
            self.events.push_back(MediaEvent::Pause);
            self.events.push_back(MediaEvent::Ended);
        } else {
            self.set_time(next);
        }
    }

    /// Take all pending transport events in emission order.
    pub fn drain_events(&mut self) -> Vec<MediaEvent> {
        self.events.drain(..).collect()
    }

    /// Fill `out` with the mono samples that end at the current position.
    ///
    /// Positions before the start of the track read as silence. When paused the element outputs
    /// silence, like a paused media element feeding an audio graph.
    pub fn read_window(&self, out: &mut [f32]) {
        if self.paused {
            out.fill(0.0);
            return;
        }
        let end = (self.current_time * f64::from(self.pcm.sample_rate)).floor() as i64;
        let start = end - out.len() as i64;
        for (i, slot) in out.iter_mut().enumerate() {
            let idx = start + i as i64;
            *slot = if idx < 0 {
                0.0
            } else {
                self.pcm.mono_at(idx as usize)
            };
        }
    }

    fn set_time(&mut self, seconds: f64) {
        let t = if seconds.is_finite() {
            seconds.clamp(0.0, self.duration())
        } else {
            0.0
        };
        self.current_time = t;
        self.events
            .push_back(MediaEvent::TimeUpdate { current_time: t });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/media.rs"]
mod tests;
