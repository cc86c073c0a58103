use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::audio::analyser::{AnalyserNode, BIN_COUNT, FFT_SIZE, FrequencySnapshot};
use crate::audio::media::{AudioPcm, MediaElement};
use crate::foundation::error::{PulseError, PulseResult};

/// Run state of the audio context behind the analysis graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet processing; the analyser sees silence.
    Suspended,
    /// Processing the source.
    Running,
}

/// Outcome of [`FeatureExtractor::ensure_audio_graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphInit {
    /// The graph was constructed by this call.
    Built,
    /// A graph already existed; nothing changed.
    AlreadyBuilt,
}

/// Parallel output of the graph that hands the source audio to a recorder.
#[derive(Debug)]
pub struct StreamTap {
    sample_rate: u32,
    channels: u16,
}

impl StreamTap {
    /// Sample rate of the tapped stream.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the tapped stream.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Open an audio capture track over the source's PCM.
    pub fn capture(&self, source: &MediaElement) -> AudioCaptureTrack {
        AudioCaptureTrack {
            pcm: Some(source.pcm()),
        }
    }
}

/// A live audio capture track handed to an encoder. Stopping it releases the samples.
#[derive(Debug)]
pub struct AudioCaptureTrack {
    pcm: Option<std::sync::Arc<AudioPcm>>,
}

impl AudioCaptureTrack {
    /// `true` until [`AudioCaptureTrack::stop`] is called.
    pub fn is_live(&self) -> bool {
        self.pcm.is_some()
    }

    /// Captured PCM, `None` once stopped.
    pub fn pcm(&self) -> Option<&AudioPcm> {
        self.pcm.as_deref()
    }

    /// Release the track.
    pub fn stop(&mut self) {
        self.pcm = None;
    }

    /// Write the captured samples as raw interleaved `f32le` for an encoder input.
    pub fn write_f32le(&self, path: &Path) -> PulseResult<()> {
        let pcm = self
            .pcm
            .as_deref()
            .ok_or_else(|| PulseError::missing("audio capture track already stopped"))?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create audio temp file '{}'", path.display()))?;
        let mut w = std::io::BufWriter::new(file);
        for s in &pcm.interleaved_f32 {
            w.write_all(&s.to_le_bytes())
                .context("write audio temp sample")?;
        }
        w.flush().context("flush audio temp file")?;
        Ok(())
    }
}

/// The constructed analysis graph: context, analyser and export tap.
#[derive(Debug)]
pub struct AudioGraph {
    state: ContextState,
    analyser: AnalyserNode,
    tap: StreamTap,
}

impl AudioGraph {
    /// Context run state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Export stream tap.
    pub fn tap(&self) -> &StreamTap {
        &self.tap
    }
}

/// Guarded owner of the single analysis graph.
///
/// The graph is built once on the first playback start and reused afterwards, including across
/// source reloads.
#[derive(Debug)]
pub struct FeatureExtractor {
    graph: Option<AudioGraph>,
    smoothing: f64,
    time_domain: Vec<f32>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl FeatureExtractor {
    /// Create an extractor; the graph is not built yet.
    pub fn new(smoothing: f64) -> Self {
        Self {
            graph: None,
            smoothing,
            time_domain: vec![0.0; FFT_SIZE],
        }
    }

    /// `true` once the graph exists.
    pub fn is_ready(&self) -> bool {
        self.graph.is_some()
    }

    /// The graph, if built.
    pub fn graph(&self) -> Option<&AudioGraph> {
        self.graph.as_ref()
    }

    /// Build the analysis graph for `source` unless it already exists.
    #[tracing::instrument(skip_all)]
    pub fn ensure_audio_graph(&mut self, source: Option<&MediaElement>) -> PulseResult<GraphInit> {
        let Some(source) = source else {
            return Err(PulseError::missing("no audio source loaded"));
        };
        if self.graph.is_some() {
            return Ok(GraphInit::AlreadyBuilt);
        }
        let pcm = source.pcm();
        self.graph = Some(AudioGraph {
            state: ContextState::Suspended,
            analyser: AnalyserNode::new(self.smoothing),
            tap: StreamTap {
                sample_rate: pcm.sample_rate,
                channels: pcm.channels,
            },
        });
        tracing::debug!(
            sample_rate = pcm.sample_rate,
            fft_size = FFT_SIZE,
            "audio graph built"
        );
        Ok(GraphInit::Built)
    }

    /// Resume a suspended context. Returns `true` when the state changed.
    pub fn resume(&mut self) -> bool {
        match self.graph.as_mut() {
            Some(g) if g.state == ContextState::Suspended => {
                g.state = ContextState::Running;
                true
            }
            _ => false,
        }
    }

    /// Playback-start hook: build the graph if needed, then resume the context.
    pub fn on_playback_start(&mut self, source: &MediaElement) -> PulseResult<()> {
        self.ensure_audio_graph(Some(source))?;
        self.resume();
        Ok(())
    }

    /// Re-bind the analyser smoothing if it differs from the applied value.
    pub fn apply_smoothing(&mut self, smoothing: f64) {
        if (smoothing - self.smoothing).abs() <= f64::EPSILON {
            return;
        }
        self.smoothing = smoothing;
        if let Some(g) = self.graph.as_mut() {
            g.analyser.set_smoothing(smoothing);
        }
    }

    /// Pull the current snapshot without blocking.
    ///
    /// A suspended context feeds silence through the analyser.
    pub fn snapshot(&mut self, source: &MediaElement) -> PulseResult<FrequencySnapshot> {
        let Some(g) = self.graph.as_mut() else {
            return Err(PulseError::missing("audio graph not initialized"));
        };
        if g.state == ContextState::Running {
            source.read_window(&mut self.time_domain);
        } else {
            self.time_domain.fill(0.0);
        }
        let mut bins = vec![0u8; BIN_COUNT];
        g.analyser
            .byte_frequency_data(&self.time_domain, &mut bins)?;
        Ok(FrequencySnapshot::from_bins(bins))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
