use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::foundation::core::Color;
use crate::foundation::error::{PulseError, PulseResult};

/// How the particle population moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticleBehavior {
    /// Downward drift, wrapping at the bottom edge.
    Gravity,
    /// Upward drift, wrapping at the top edge.
    AntiGravity,
    /// Outward polar motion from the center.
    RadialOut,
    /// Inward spiral toward the center.
    VortexIn,
    /// Free drift with elastic edge reflection.
    #[default]
    Static,
}

impl ParticleBehavior {
    /// Every behavior, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Gravity,
        Self::AntiGravity,
        Self::RadialOut,
        Self::VortexIn,
        Self::Static,
    ];
}

/// Motion applied to the background image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundBehavior {
    /// Slow horizontal pan across an overscaled image.
    Pan,
    /// Slow oscillating zoom.
    SlowZoom,
    /// Zoom driven by mean amplitude.
    Pulse,
    /// No motion.
    #[default]
    Static,
}

/// Motion applied to the logo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogoBehavior {
    /// Scale pulses with mean amplitude.
    #[default]
    Pulse,
    /// Random offset driven by bass energy.
    Shake,
    /// Sinusoidal vertical float.
    Float,
    /// No motion.
    Static,
}

/// Spectrum geometry drawn around the logo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DynamicStyle {
    /// Radial bars from a pulsing ring.
    #[default]
    PyroBurst,
    /// Star-shaped closed outline.
    GlacialShards,
    /// Smooth blooming closed outline.
    CelestialBloom,
    /// Particles only, no spectrum.
    QuantumEntanglement,
}

impl DynamicStyle {
    /// Every style, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::PyroBurst,
        Self::GlacialShards,
        Self::CelestialBloom,
        Self::QuantumEntanglement,
    ];
}

/// Immutable per-frame render configuration snapshot.
///
/// Snapshots are replaced wholesale through [`ConfigHandle`]; nothing mutates a published one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Particle motion mode.
    pub particle_behavior: ParticleBehavior,
    /// Background image motion mode.
    pub background_behavior: BackgroundBehavior,
    /// Logo motion mode.
    pub logo_behavior: LogoBehavior,
    /// Spectrum style.
    pub dynamic_style: DynamicStyle,

    /// Multiplier on every amplitude-driven spectrum contribution.
    pub motion_intensity: f64,
    /// Multiplier on bass-driven camera shake.
    pub camera_shake_intensity: f64,
    /// Analyser temporal smoothing constant in [0, 1).
    pub smoothing: f64,
    /// Number of spectrum bars / outline points.
    pub bar_count: u32,
    /// Start of the spectrum window as a fraction of all bins.
    pub frequency_range_start: f64,
    /// End of the spectrum window as a fraction of all bins.
    pub frequency_range_end: f64,
    /// Stroke width of spectrum geometry in pixels.
    pub bar_width: f64,
    /// Glow radius in pixels at full amplitude.
    pub glow_radius: f64,
    /// Logo size multiplier.
    pub logo_scale: f64,
    /// Star points for `GlacialShards`.
    pub spike_count: u32,

    /// Particle fill color.
    pub particle_color: Color,
    /// Spectrum gradient start (top).
    pub spectrum_color_start: Color,
    /// Spectrum gradient end (bottom).
    pub spectrum_color_end: Color,
    /// Background gradient top color (used without a background image).
    pub background_top: Color,
    /// Background gradient bottom color.
    pub background_bottom: Color,

    /// Enable the white flash on heavy bass.
    pub high_energy_fx: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            particle_behavior: ParticleBehavior::Static,
            background_behavior: BackgroundBehavior::Static,
            logo_behavior: LogoBehavior::Pulse,
            dynamic_style: DynamicStyle::PyroBurst,
            motion_intensity: 1.0,
            camera_shake_intensity: 1.0,
            smoothing: 0.8,
            bar_count: 128,
            frequency_range_start: 0.0,
            frequency_range_end: 0.5,
            bar_width: 3.0,
            glow_radius: 15.0,
            logo_scale: 1.0,
            spike_count: 8,
            particle_color: Color::rgb(255, 255, 255).with_alpha(200),
            spectrum_color_start: Color::rgb(255, 60, 0),
            spectrum_color_end: Color::rgb(255, 208, 0),
            background_top: Color::rgb(15, 12, 41),
            background_bottom: Color::rgb(48, 43, 99),
            high_energy_fx: true,
        }
    }
}

pub(crate) const BAR_COUNT_RANGE: (u32, u32) = (8, 512);
pub(crate) const GLOW_RADIUS_MAX: f64 = 50.0;

impl RenderConfig {
    /// Validate ranges, including the frame-cost guard on bar count and glow radius.
    pub fn validate(&self) -> PulseResult<()> {
        fn check(name: &str, v: f64, lo: f64, hi: f64) -> PulseResult<()> {
            if !v.is_finite() || v < lo || v > hi {
                return Err(PulseError::validation(format!(
                    "{name} must be within [{lo}, {hi}], got {v}"
                )));
            }
            Ok(())
        }

        check("motionIntensity", self.motion_intensity, 0.0, 5.0)?;
        check("cameraShakeIntensity", self.camera_shake_intensity, 0.0, 5.0)?;
        check("smoothing", self.smoothing, 0.0, 0.999)?;
        check("frequencyRangeStart", self.frequency_range_start, 0.0, 1.0)?;
        check("frequencyRangeEnd", self.frequency_range_end, 0.0, 1.0)?;
        check("barWidth", self.bar_width, 0.5, 20.0)?;
        check("glowRadius", self.glow_radius, 0.0, GLOW_RADIUS_MAX)?;
        check("logoScale", self.logo_scale, 0.1, 4.0)?;

        let (lo, hi) = BAR_COUNT_RANGE;
        if !(lo..=hi).contains(&self.bar_count) {
            return Err(PulseError::validation(format!(
                "barCount must be within [{lo}, {hi}], got {}",
                self.bar_count
            )));
        }
        if !(3..=24).contains(&self.spike_count) {
            return Err(PulseError::validation(format!(
                "spikeCount must be within [3, 24], got {}",
                self.spike_count
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON snapshot.
    pub fn from_json(s: &str) -> PulseResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| PulseError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> PulseResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PulseError::serde(e.to_string()))
    }
}

/// Shared, atomically replaceable [`RenderConfig`] snapshot.
///
/// Writers publish whole snapshots; the frame loop loads one snapshot per tick, so a frame never
/// sees a mix of old and new parameters.
#[derive(Clone, Debug)]
pub struct ConfigHandle {
    current: Arc<ArcSwap<RenderConfig>>,
}

impl ConfigHandle {
    /// Create a handle holding `cfg` (validated).
    pub fn new(cfg: RenderConfig) -> PulseResult<Self> {
        cfg.validate()?;
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(cfg)),
        })
    }

    /// Load the current snapshot.
    pub fn snapshot(&self) -> Arc<RenderConfig> {
        self.current.load_full()
    }

    /// Validate and publish a replacement snapshot.
    pub fn replace(&self, cfg: RenderConfig) -> PulseResult<()> {
        cfg.validate()?;
        self.current.store(Arc::new(cfg));
        Ok(())
    }

    /// Publish a built-in preset by name.
    pub fn select_preset(&self, name: &str) -> PulseResult<()> {
        let cfg = crate::config::presets::preset(name)?;
        self.replace(cfg)
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(RenderConfig::default())),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
