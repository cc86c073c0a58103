use std::f64::consts::TAU;

use crate::config::model::{DynamicStyle, RenderConfig};
use crate::foundation::core::{BezPath, Color, Point};
use crate::foundation::math::{mean_u8, triangle};
use crate::render::surface::Painter;

const PYRO_BASE_RADIUS: f64 = 80.0;
const PYRO_PULSE: f64 = 30.0;
const PYRO_BAR_LENGTH: f64 = 150.0;

const SHARD_INNER_RADIUS: f64 = 70.0;
const SHARD_OUTER_RADIUS: f64 = 120.0;
const SHARD_AMPLITUDE: f64 = 60.0;

const BLOOM_RADIUS: f64 = 90.0;
const BLOOM_AMPLITUDE: f64 = 70.0;

/// One radial bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Inner end on the base ring.
    pub from: Point,
    /// Outer end.
    pub to: Point,
    /// Stroke color sampled from the vertical gradient at the bar's midpoint.
    pub color: Color,
}

/// Geometry for one spectrum frame, centered at the origin.
#[derive(Clone, Debug, PartialEq)]
pub enum SpectrumShape {
    /// Nothing to draw.
    Empty,
    /// Radial bars around a pulsing ring.
    Rays {
        /// Ring radius the bars start from.
        base_radius: f64,
        /// Stroke width.
        width: f64,
        /// The bars.
        rays: Vec<Ray>,
    },
    /// One closed outline.
    Outline {
        /// The closed path.
        path: BezPath,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: Color,
    },
}

/// Build the geometry for `config.dynamic_style` from a frequency window.
///
/// `time` is elapsed seconds (drives the bloom oscillation). Sample indices wrap modulo the
/// window length; an empty window yields [`SpectrumShape::Empty`].
pub fn spectrum_shape(
    config: &RenderConfig,
    window: &[u8],
    time: f64,
    bass_mean: f32,
) -> SpectrumShape {
    let bars = config.bar_count as usize;
    if window.is_empty() || bars == 0 {
        return SpectrumShape::Empty;
    }
    let motion = config.motion_intensity;
    let sample = |i: usize| f64::from(window[i % window.len()]) / 255.0;

    match config.dynamic_style {
        DynamicStyle::QuantumEntanglement => SpectrumShape::Empty,
        DynamicStyle::PyroBurst => {
            let window_mean = f64::from(mean_u8(window)) / 255.0;
            let base_radius = PYRO_BASE_RADIUS + window_mean * PYRO_PULSE * motion;
            let extent = base_radius + PYRO_BAR_LENGTH * motion;
            let rays = (0..bars)
                .map(|i| {
                    let angle = i as f64 / bars as f64 * TAU;
                    let (sin, cos) = angle.sin_cos();
                    let len = sample(i) * PYRO_BAR_LENGTH * motion;
                    let from = Point::new(cos * base_radius, sin * base_radius);
                    let to = Point::new(cos * (base_radius + len), sin * (base_radius + len));
                    let mid_y = (from.y + to.y) * 0.5;
                    let t = if extent > 0.0 {
                        (mid_y + extent) / (2.0 * extent)
                    } else {
                        0.5
                    };
                    Ray {
                        from,
                        to,
                        color: config
                            .spectrum_color_start
                            .lerp(config.spectrum_color_end, t),
                    }
                })
                .collect();
            let bass = f64::from(bass_mean.clamp(0.0, 255.0)) / 255.0;
            SpectrumShape::Rays {
                base_radius,
                width: config.bar_width * (1.0 + bass),
                rays,
            }
        }
        DynamicStyle::GlacialShards => {
            let spikes = f64::from(config.spike_count.max(1));
            let mut path = BezPath::new();
            for i in 0..=bars {
                let pos = i as f64 / bars as f64;
                let angle = pos * TAU;
                let star = triangle(pos * spikes);
                let r = SHARD_INNER_RADIUS
                    + (SHARD_OUTER_RADIUS - SHARD_INNER_RADIUS) * star
                    + sample(i) * SHARD_AMPLITUDE * motion;
                let p = Point::new(angle.cos() * r, angle.sin() * r);
                if i == 0 {
                    path.move_to(p);
                } else {
                    path.line_to(p);
                }
            }
            path.close_path();
            SpectrumShape::Outline {
                path,
                width: config.bar_width,
                color: config.spectrum_color_start,
            }
        }
        DynamicStyle::CelestialBloom => {
            let bloom = (time * 2.0).sin() * 0.5 + 1.0;
            let points: Vec<Point> = (0..bars)
                .map(|i| {
                    let angle = i as f64 / bars as f64 * TAU;
                    let r = BLOOM_RADIUS + sample(i) * BLOOM_AMPLITUDE * motion * bloom;
                    Point::new(angle.cos() * r, angle.sin() * r)
                })
                .collect();
            let n = points.len();
            let mut path = BezPath::new();
            path.move_to(points[n - 1].midpoint(points[0]));
            for i in 0..n {
                let next = points[(i + 1) % n];
                path.quad_to(points[i], points[i].midpoint(next));
            }
            path.close_path();
            SpectrumShape::Outline {
                path,
                width: config.bar_width,
                color: config.spectrum_color_end,
            }
        }
    }
}

/// Draw the spectrum centered at the painter's current origin.
pub fn render(
    painter: &mut dyn Painter,
    config: &RenderConfig,
    window: &[u8],
    time: f64,
    bass_mean: f32,
) {
    match spectrum_shape(config, window, time, bass_mean) {
        SpectrumShape::Empty => {}
        SpectrumShape::Rays { width, rays, .. } => {
            for ray in rays {
                let mut path = BezPath::new();
                path.move_to(ray.from);
                path.line_to(ray.to);
                painter.stroke_path(&path, width, ray.color);
            }
        }
        SpectrumShape::Outline { path, width, color } => {
            painter.stroke_path(&path, width, color);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/spectrum.rs"]
mod tests;
