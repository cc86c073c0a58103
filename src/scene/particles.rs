use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::model::{ParticleBehavior, RenderConfig};
use crate::foundation::core::Point;
use crate::render::surface::Painter;

/// Fixed particle population size.
pub const PARTICLE_COUNT: usize = 100;

const FALL_SPEED: f64 = 1.5;
const RADIAL_BASE_SPEED: f64 = 1.0;
const RADIAL_AMP_SPEED: f64 = 8.0;
const VORTEX_BASE_SPEED: f64 = 1.0;
const VORTEX_AMP_SPEED: f64 = 5.0;
const VORTEX_ANGLE_STEP: f64 = 0.02;
const RADIAL_RESPAWN_DISTANCE: f64 = 50.0;

/// One particle.
///
/// Field meaning depends on the active behavior:
/// - `Gravity`, `AntiGravity`, `Static`: `x`, `y` are integrated from `vx`, `vy`.
/// - `RadialOut`, `VortexIn`: `angle` and `distance` (polar, around the surface center) drive `x`,
///   `y`; the velocity fields are unused.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels.
    pub y: f64,
    /// Disc radius in pixels.
    pub radius: f64,
    /// Base horizontal velocity per frame.
    pub vx: f64,
    /// Base vertical velocity per frame.
    pub vy: f64,
    /// Polar angle in radians.
    pub angle: f64,
    /// Polar distance from the center in pixels.
    pub distance: f64,
}

/// The particle population plus the behavior it was last seeded for.
#[derive(Debug)]
pub struct ParticleState {
    particles: Vec<Particle>,
    behavior: Option<ParticleBehavior>,
    rng: StdRng,
    reseeds: u64,
}

impl Default for ParticleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleState {
    /// Empty population seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Empty population with a deterministic generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            particles: Vec::new(),
            behavior: None,
            rng,
            reseeds: 0,
        }
    }

    /// Current particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Behavior the population was last seeded for.
    pub fn behavior(&self) -> Option<ParticleBehavior> {
        self.behavior
    }

    /// Number of full reseeds so far.
    pub fn reseed_count(&self) -> u64 {
        self.reseeds
    }

    /// Advance one frame and draw every particle as a filled disc.
    pub fn advance(
        &mut self,
        painter: &mut dyn Painter,
        width: f64,
        height: f64,
        config: &RenderConfig,
        mean_amplitude: f32,
    ) {
        self.step(width, height, config.particle_behavior, mean_amplitude);
        let color = config.particle_color;
        for p in &self.particles {
            painter.fill_circle(Point::new(p.x, p.y), p.radius, color);
        }
    }

    /// Advance one frame without drawing.
    ///
    /// The whole population is regenerated first when it is empty or `behavior` differs from the
    /// behavior it was seeded for.
    pub fn step(
        &mut self,
        width: f64,
        height: f64,
        behavior: ParticleBehavior,
        mean_amplitude: f32,
    ) {
        if self.particles.is_empty() || self.behavior != Some(behavior) {
            self.reseed(width, height, behavior);
        }
        let amp = f64::from(mean_amplitude.clamp(0.0, 255.0)) / 255.0;
        let center = (width * 0.5, height * 0.5);
        let max_distance = width.min(height) * 0.5;

        for i in 0..self.particles.len() {
            let mut p = self.particles[i];
            match behavior {
                ParticleBehavior::Gravity => {
                    p.y += FALL_SPEED;
                    p.x += p.vx;
                    if p.y > height {
                        p.y = 0.0;
                        p.x = self.rng.random_range(0.0..width.max(1.0));
                    }
                }
                ParticleBehavior::AntiGravity => {
                    p.y -= FALL_SPEED;
                    p.x += p.vx;
                    if p.y < 0.0 {
                        p.y = height;
                        p.x = self.rng.random_range(0.0..width.max(1.0));
                    }
                }
                ParticleBehavior::RadialOut => {
                    p.distance += RADIAL_BASE_SPEED + amp * RADIAL_AMP_SPEED;
                    place_polar(&mut p, center);
                    if p.x < 0.0 || p.x > width || p.y < 0.0 || p.y > height {
                        p.distance = self.rng.random::<f64>() * RADIAL_RESPAWN_DISTANCE;
                        p.angle = self.rng.random::<f64>() * std::f64::consts::TAU;
                        place_polar(&mut p, center);
                    }
                }
                ParticleBehavior::VortexIn => {
                    p.distance -= VORTEX_BASE_SPEED + amp * VORTEX_AMP_SPEED;
                    p.angle += VORTEX_ANGLE_STEP;
                    if p.distance < 1.0 {
                        p.distance = self.rng.random::<f64>() * max_distance;
                        p.angle = self.rng.random::<f64>() * std::f64::consts::TAU;
                    }
                    place_polar(&mut p, center);
                }
                ParticleBehavior::Static => {
                    p.x += p.vx;
                    p.y += p.vy;
                    if p.x < 0.0 || p.x > width {
                        p.vx = -p.vx;
                        p.x = p.x.clamp(0.0, width);
                    }
                    if p.y < 0.0 || p.y > height {
                        p.vy = -p.vy;
                        p.y = p.y.clamp(0.0, height);
                    }
                }
            }
            self.particles[i] = p;
        }
    }

    fn reseed(&mut self, width: f64, height: f64, behavior: ParticleBehavior) {
        let center = (width * 0.5, height * 0.5);
        let max_distance = width.min(height) * 0.5;
        self.particles.clear();
        for _ in 0..PARTICLE_COUNT {
            let mut p = Particle {
                x: self.rng.random::<f64>() * width,
                y: self.rng.random::<f64>() * height,
                radius: self.rng.random_range(1.0..3.0),
                vx: self.rng.random_range(-0.25..0.25),
                vy: self.rng.random_range(-0.25..0.25),
                angle: self.rng.random::<f64>() * std::f64::consts::TAU,
                distance: self.rng.random::<f64>() * max_distance,
            };
            if matches!(
                behavior,
                ParticleBehavior::RadialOut | ParticleBehavior::VortexIn
            ) {
                place_polar(&mut p, center);
            }
            self.particles.push(p);
        }
        self.behavior = Some(behavior);
        self.reseeds += 1;
        tracing::debug!(?behavior, count = PARTICLE_COUNT, "particles reseeded");
    }
}

fn place_polar(p: &mut Particle, center: (f64, f64)) {
    p.x = center.0 + p.angle.cos() * p.distance;
    p.y = center.1 + p.angle.sin() * p.distance;
}

#[cfg(test)]
#[path = "../../tests/unit/scene/particles.rs"]
mod tests;
