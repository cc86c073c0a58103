use crate::config::model::{
    BackgroundBehavior, DynamicStyle, LogoBehavior, ParticleBehavior, RenderConfig,
};
use crate::foundation::core::Color;
use crate::foundation::error::{PulseError, PulseResult};

/// Names of the built-in presets, in display order.
pub const PRESET_NAMES: [&str; 5] = ["default", "inferno", "glacier", "bloom", "quantum"];

/// Build a complete snapshot for a built-in preset.
pub fn preset(name: &str) -> PulseResult<RenderConfig> {
    let base = RenderConfig::default();
    let cfg = match name.trim().to_ascii_lowercase().as_str() {
        "default" => base,
        "inferno" => RenderConfig {
            particle_behavior: ParticleBehavior::AntiGravity,
            background_behavior: BackgroundBehavior::Pulse,
            logo_behavior: LogoBehavior::Shake,
            dynamic_style: DynamicStyle::PyroBurst,
            motion_intensity: 1.4,
            camera_shake_intensity: 1.6,
            smoothing: 0.7,
            bar_count: 180,
            frequency_range_start: 0.0,
            frequency_range_end: 0.4,
            glow_radius: 25.0,
            particle_color: Color::rgb(255, 140, 40).with_alpha(210),
            spectrum_color_start: Color::rgb(255, 40, 0),
            spectrum_color_end: Color::rgb(255, 220, 60),
            background_top: Color::rgb(30, 4, 4),
            background_bottom: Color::rgb(90, 20, 0),
            ..base
        },
        "glacier" => RenderConfig {
            particle_behavior: ParticleBehavior::Gravity,
            background_behavior: BackgroundBehavior::SlowZoom,
            logo_behavior: LogoBehavior::Float,
            dynamic_style: DynamicStyle::GlacialShards,
            motion_intensity: 1.0,
            camera_shake_intensity: 0.4,
            smoothing: 0.85,
            bar_count: 96,
            spike_count: 6,
            particle_color: Color::rgb(220, 240, 255).with_alpha(180),
            spectrum_color_start: Color::rgb(150, 220, 255),
            spectrum_color_end: Color::rgb(255, 255, 255),
            background_top: Color::rgb(4, 20, 40),
            background_bottom: Color::rgb(20, 60, 100),
            high_energy_fx: false,
            ..base
        },
        "bloom" => RenderConfig {
            particle_behavior: ParticleBehavior::RadialOut,
            background_behavior: BackgroundBehavior::Pan,
            logo_behavior: LogoBehavior::Pulse,
            dynamic_style: DynamicStyle::CelestialBloom,
            motion_intensity: 1.2,
            smoothing: 0.8,
            bar_count: 120,
            frequency_range_end: 0.6,
            glow_radius: 20.0,
            particle_color: Color::rgb(255, 200, 240).with_alpha(200),
            spectrum_color_start: Color::rgb(255, 120, 220),
            spectrum_color_end: Color::rgb(140, 100, 255),
            background_top: Color::rgb(25, 5, 40),
            background_bottom: Color::rgb(60, 20, 80),
            ..base
        },
        "quantum" => RenderConfig {
            particle_behavior: ParticleBehavior::VortexIn,
            background_behavior: BackgroundBehavior::Static,
            logo_behavior: LogoBehavior::Static,
            dynamic_style: DynamicStyle::QuantumEntanglement,
            camera_shake_intensity: 0.8,
            particle_color: Color::rgb(120, 255, 200).with_alpha(220),
            background_top: Color::rgb(0, 0, 0),
            background_bottom: Color::rgb(10, 30, 30),
            ..base
        },
        other => {
            return Err(PulseError::validation(format!(
                "unknown preset \"{other}\" (available: {})",
                PRESET_NAMES.join(", ")
            )));
        }
    };
    Ok(cfg)
}

#[cfg(test)]
#[path = "../../tests/unit/config/presets.rs"]
mod tests;
