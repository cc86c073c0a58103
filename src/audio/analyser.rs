use std::f32::consts::PI;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex, num_complex::Complex32};

use crate::foundation::error::{PulseError, PulseResult};
use crate::foundation::math::mean_u8;

/// Analysis window length in samples.
pub const FFT_SIZE: usize = 2048;
/// Number of frequency bins exposed per snapshot.
pub const BIN_COUNT: usize = FFT_SIZE / 2;
/// Number of lowest bins averaged into the bass mean.
pub const BASS_BINS: usize = 16;
/// Mean amplitude above which audio counts as playing.
pub const PLAYING_THRESHOLD: f32 = 1.0;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// One frame of byte frequency data plus its derived scalars.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencySnapshot {
    bins: Vec<u8>,
    mean: f32,
    bass_mean: f32,
}

impl FrequencySnapshot {
    /// Wrap raw bins and compute the derived means.
    pub fn from_bins(bins: Vec<u8>) -> Self {
        let mean = mean_u8(&bins);
        let bass_mean = mean_u8(&bins[..bins.len().min(BASS_BINS)]);
        Self {
            bins,
            mean,
            bass_mean,
        }
    }

    /// All bins, lowest frequency first.
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    /// Mean amplitude over all bins (0-255).
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Mean amplitude over the lowest [`BASS_BINS`] bins.
    pub fn bass_mean(&self) -> f32 {
        self.bass_mean
    }

    /// `mean > 1`.
    pub fn is_audio_playing(&self) -> bool {
        self.mean > PLAYING_THRESHOLD
    }

    /// Bins between the `start` and `end` fractions of the full sequence.
    ///
    /// Bounds are floored to indices; `start >= end` yields an empty window.
    pub fn window(&self, start: f64, end: f64) -> &[u8] {
        let len = self.bins.len();
        let to_index = |f: f64| -> usize {
            if !f.is_finite() {
                return 0;
            }
            ((len as f64) * f.clamp(0.0, 1.0)).floor() as usize
        };
        let (s, e) = (to_index(start), to_index(end));
        if s >= e {
            return &[];
        }
        &self.bins[s..e]
    }
}

/// FFT analyser producing byte frequency data with temporal smoothing.
///
/// Blackman window, magnitude `|X[k]| / N`, exponential smoothing across calls, then decibels
/// mapped linearly from [-100, -30] dB onto 0-255.
pub struct AnalyserNode {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
    smoothing: f32,
}

impl AnalyserNode {
    /// Create an analyser with the given smoothing constant.
    pub fn new(smoothing: f64) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        Self {
            fft,
            window: blackman_window(FFT_SIZE),
            input,
            spectrum,
            scratch,
            smoothed: vec![0.0; BIN_COUNT],
            smoothing: clamp_smoothing(smoothing),
        }
    }

    /// Current smoothing constant.
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Re-bind the smoothing constant; keeps the accumulated spectrum.
    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.smoothing = clamp_smoothing(smoothing);
    }

    /// Analyse `time_domain` (exactly [`FFT_SIZE`] samples) into `out` ([`BIN_COUNT`] bytes).
    pub fn byte_frequency_data(&mut self, time_domain: &[f32], out: &mut [u8]) -> PulseResult<()> {
        if time_domain.len() != FFT_SIZE || out.len() != BIN_COUNT {
            return Err(PulseError::validation(format!(
                "analyser expects {FFT_SIZE} samples and {BIN_COUNT} output bins"
            )));
        }

        for ((dst, &s), &w) in self.input.iter_mut().zip(time_domain).zip(&self.window) {
            *dst = s * w;
        }
        self.fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| PulseError::validation(format!("fft failed: {e}")))?;

        let tau = self.smoothing;
        let norm = 1.0 / FFT_SIZE as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (k, byte) in out.iter_mut().enumerate() {
            let mag = self.spectrum[k].norm() * norm;
            let mut s = tau * self.smoothed[k] + (1.0 - tau) * mag;
            if !s.is_finite() {
                s = 0.0;
            }
            self.smoothed[k] = s;

            let db = if s > 0.0 {
                20.0 * s.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = (255.0 / range) * (db - MIN_DECIBELS);
            *byte = scaled.floor().clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }
}

impl std::fmt::Debug for AnalyserNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyserNode")
            .field("fft_size", &FFT_SIZE)
            .field("smoothing", &self.smoothing)
            .finish()
    }
}

fn clamp_smoothing(v: f64) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 0.999) as f32
    } else {
        0.0
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42f32, 0.5f32, 0.08f32);
    let nf = n as f32;
    (0..n)
        .map(|i| {
            let x = i as f32 / nf;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/audio/analyser.rs"]
mod tests;
