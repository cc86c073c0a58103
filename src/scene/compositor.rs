use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assets::decode::PreparedImage;
use crate::audio::analyser::FrequencySnapshot;
use crate::audio::graph::FeatureExtractor;
use crate::audio::media::MediaElement;
use crate::config::model::{BackgroundBehavior, LogoBehavior, RenderConfig};
use crate::foundation::core::{Color, Rect, Vec2};
use crate::foundation::error::PulseResult;
use crate::render::surface::{Painter, RasterSurface};
use crate::scene::particles::ParticleState;
use crate::scene::spectrum;

/// Background clock increment per frame.
pub const BACKGROUND_CLOCK_STEP: f64 = 0.01;
/// Fraction of the remaining distance the camera covers per frame.
pub const CAMERA_EASE: f64 = 0.1;
/// Camera zoom at full mean amplitude.
pub const CAMERA_PULSE: f64 = 0.07;
/// Bass mean above which the flash fires.
pub const FLASH_THRESHOLD: f32 = 220.0;
/// Upper bound on flash opacity.
pub const FLASH_MAX_OPACITY: f64 = 0.7;

const FLASH_RAMP: f64 = 35.0;
const SHAKE_PIXELS: f64 = 20.0;
const LOGO_SIZE_FRACTION: f64 = 0.25;
const SPECTRUM_OFFSET_FRACTION: f64 = 0.1;
const LOGO_PULSE: f64 = 0.15;
const LOGO_SHAKE_PIXELS: f64 = 10.0;
const LOGO_FLOAT_PIXELS: f64 = 10.0;
const BACKGROUND_PAN_ZOOM: f64 = 1.15;
const BACKGROUND_PULSE: f64 = 0.08;

/// Smoothed camera and clock state carried across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    /// Current camera scale.
    pub camera_scale: f64,
    /// Monotonic background clock.
    pub background_clock: f64,
    /// Bass mean of the last drawn frame.
    pub last_bass_mean: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            camera_scale: 1.0,
            background_clock: 0.0,
            last_bass_mean: 0.0,
        }
    }
}

impl AnimationState {
    /// Camera scale target for a frame.
    pub fn camera_target(mean: f32, playing: bool) -> f64 {
        if playing {
            1.0 + f64::from(mean) / 255.0 * CAMERA_PULSE
        } else {
            1.0
        }
    }

    /// Ease the camera toward its target and return the new scale.
    pub fn step_camera(&mut self, mean: f32, playing: bool) -> f64 {
        let target = Self::camera_target(mean, playing);
        self.camera_scale += (target - self.camera_scale) * CAMERA_EASE;
        self.camera_scale
    }
}

/// Optional images drawn by the compositor.
#[derive(Clone, Debug, Default)]
pub struct SceneAssets {
    /// Logo drawn at the center.
    pub logo: Option<PreparedImage>,
    /// Background covering the surface.
    pub background: Option<PreparedImage>,
}

/// Why a tick drew nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No raster surface is attached.
    NoSurface,
    /// The feature extractor has no audio graph yet.
    ExtractorNotReady,
}

/// Per-frame values reported by a drawn tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
    /// Mean amplitude of the snapshot.
    pub mean: f32,
    /// Bass mean of the snapshot.
    pub bass_mean: f32,
    /// `mean > 1`.
    pub playing: bool,
    /// Camera scale applied this frame.
    pub camera_scale: f64,
    /// Camera shake offset applied this frame.
    pub shake: Vec2,
    /// Flash opacity, `0.0` when no flash was drawn.
    pub flash_opacity: f64,
}

/// Result of one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// A frame was drawn.
    Drawn(FrameStats),
    /// Nothing was drawn.
    Skipped(SkipReason),
}

/// Per-frame orchestration of background, particles, logo, spectrum and screen effects.
#[derive(Debug)]
pub struct SceneCompositor {
    animation: AnimationState,
    particles: ParticleState,
    assets: SceneAssets,
    rng: StdRng,
}

impl SceneCompositor {
    /// Compositor with entropy-seeded randomness.
    pub fn new(assets: SceneAssets) -> Self {
        Self {
            animation: AnimationState::default(),
            particles: ParticleState::new(),
            assets,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Compositor with deterministic particles and shake.
    pub fn with_seed(assets: SceneAssets, seed: u64) -> Self {
        Self {
            animation: AnimationState::default(),
            particles: ParticleState::with_seed(seed),
            assets,
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    /// Camera and clock state.
    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    /// Particle population.
    pub fn particles(&self) -> &ParticleState {
        &self.particles
    }

    /// Replace the logo.
    pub fn set_logo(&mut self, logo: Option<PreparedImage>) {
        self.assets.logo = logo;
    }

    /// Replace the background image.
    pub fn set_background(&mut self, background: Option<PreparedImage>) {
        self.assets.background = background;
    }

    /// Pull a snapshot and draw one frame into `surface`.
    ///
    /// A missing surface or an extractor without a graph skips the tick.
    pub fn tick(
        &mut self,
        surface: Option<&mut RasterSurface>,
        extractor: &mut FeatureExtractor,
        media: &MediaElement,
        config: &RenderConfig,
        elapsed: f64,
    ) -> PulseResult<TickOutcome> {
        let Some(surface) = surface else {
            return Ok(TickOutcome::Skipped(SkipReason::NoSurface));
        };
        if !extractor.is_ready() {
            return Ok(TickOutcome::Skipped(SkipReason::ExtractorNotReady));
        }
        extractor.apply_smoothing(config.smoothing);
        let snapshot = extractor.snapshot(media)?;

        surface.begin_frame();
        let stats = self.draw(surface, &snapshot, config, elapsed)?;
        surface.finish()?;
        Ok(TickOutcome::Drawn(stats))
    }

    /// Draw one frame from an already pulled snapshot.
    pub fn draw(
        &mut self,
        painter: &mut dyn Painter,
        snapshot: &FrequencySnapshot,
        config: &RenderConfig,
        elapsed: f64,
    ) -> PulseResult<FrameStats> {
        let Self {
            animation,
            particles,
            assets,
            rng,
        } = self;

        let playing = snapshot.is_audio_playing();
        let mean = snapshot.mean();
        let bass = snapshot.bass_mean();

        animation.background_clock += BACKGROUND_CLOCK_STEP;
        let camera_scale = animation.step_camera(mean, playing);
        animation.last_bass_mean = bass;
        let clock = animation.background_clock;

        let (w, h) = painter.size();
        let (wf, hf) = (f64::from(w), f64::from(h));
        let center = Vec2::new(wf * 0.5, hf * 0.5);

        let shake = if playing {
            let k = f64::from(bass) / 255.0 * config.camera_shake_intensity * SHAKE_PIXELS;
            Vec2::new(
                rng.random_range(-1.0..1.0) * k,
                rng.random_range(-1.0..1.0) * k,
            )
        } else {
            Vec2::ZERO
        };

        painter.save();
        painter.translate(center);
        painter.scale(camera_scale);
        painter.translate(shake);
        painter.translate(-center);

        draw_background(
            painter,
            assets.background.as_ref(),
            config,
            clock,
            mean,
            wf,
            hf,
        )?;
        particles.advance(painter, wf, hf, config, mean);

        if let Some(logo) = assets.logo.as_ref() {
            painter.save();
            painter.translate(center);
            let logo_h = wf.min(hf) * LOGO_SIZE_FRACTION * config.logo_scale;
            let logo_w = logo_h * logo.aspect();
            match config.logo_behavior {
                LogoBehavior::Pulse => {
                    painter.scale(1.0 + f64::from(mean) / 255.0 * LOGO_PULSE);
                }
                LogoBehavior::Shake => {
                    let k = f64::from(bass) / 255.0 * LOGO_SHAKE_PIXELS;
                    painter.translate(Vec2::new(
                        rng.random_range(-1.0..1.0) * k,
                        rng.random_range(-1.0..1.0) * k,
                    ));
                }
                LogoBehavior::Float => {
                    painter.translate(Vec2::new(0.0, (clock * 2.0).sin() * LOGO_FLOAT_PIXELS));
                }
                LogoBehavior::Static => {}
            }

            let glow = config.glow_radius * f64::from(mean) / 255.0;
            if playing {
                painter.save();
                painter.translate(Vec2::new(0.0, logo_h * SPECTRUM_OFFSET_FRACTION));
                painter.begin_glow(glow)?;
                spectrum::render(
                    painter,
                    config,
                    snapshot.window(config.frequency_range_start, config.frequency_range_end),
                    elapsed,
                    bass,
                );
                painter.end_glow()?;
                painter.restore();
            }

            painter.begin_glow(glow)?;
            painter.draw_image(
                logo,
                Rect::new(-logo_w * 0.5, -logo_h * 0.5, logo_w * 0.5, logo_h * 0.5),
                1.0,
            )?;
            painter.end_glow()?;
            painter.restore();
        }

        painter.restore();

        let flash_opacity = flash_opacity(config, playing, bass);
        if flash_opacity > 0.0 {
            let alpha = (flash_opacity * 255.0).round() as u8;
            painter.fill_rect(Rect::new(0.0, 0.0, wf, hf), Color::WHITE.with_alpha(alpha));
        }

        Ok(FrameStats {
            mean,
            bass_mean: bass,
            playing,
            camera_scale,
            shake,
            flash_opacity,
        })
    }
}

/// Flash opacity for a frame: linear above the threshold, capped.
pub fn flash_opacity(config: &RenderConfig, playing: bool, bass_mean: f32) -> f64 {
    if !config.high_energy_fx || !playing || bass_mean <= FLASH_THRESHOLD {
        return 0.0;
    }
    (f64::from(bass_mean - FLASH_THRESHOLD) / FLASH_RAMP).min(FLASH_MAX_OPACITY)
}

/// Destination rect that covers a `w`x`h` surface with the image, zoomed and panned.
pub fn background_rect(
    image_w: f64,
    image_h: f64,
    w: f64,
    h: f64,
    zoom: f64,
    pan: f64,
) -> Rect {
    let cover = (w / image_w.max(1.0)).max(h / image_h.max(1.0)) * zoom.max(1.0);
    let dw = image_w * cover;
    let dh = image_h * cover;
    let overscan = (dw - w) * 0.5;
    let x = -overscan + pan.clamp(-1.0, 1.0) * overscan;
    let y = (h - dh) * 0.5;
    Rect::new(x, y, x + dw, y + dh)
}

fn draw_background(
    painter: &mut dyn Painter,
    background: Option<&PreparedImage>,
    config: &RenderConfig,
    clock: f64,
    mean: f32,
    w: f64,
    h: f64,
) -> PulseResult<()> {
    let Some(img) = background else {
        return painter.fill_vertical_gradient(
            Rect::new(0.0, 0.0, w, h),
            config.background_top,
            config.background_bottom,
        );
    };
    let (zoom, pan) = match config.background_behavior {
        BackgroundBehavior::Pan => (BACKGROUND_PAN_ZOOM, (clock * 0.5).sin()),
        BackgroundBehavior::SlowZoom => (1.05 + 0.05 * (clock * 0.3).sin(), 0.0),
        BackgroundBehavior::Pulse => (1.0 + f64::from(mean) / 255.0 * BACKGROUND_PULSE, 0.0),
        BackgroundBehavior::Static => (1.0, 0.0),
    };
    let dst = background_rect(
        f64::from(img.width),
        f64::from(img.height),
        w,
        h,
        zoom,
        pan,
    );
    painter.draw_image(img, dst, 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/compositor.rs"]
mod tests;
