pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Arithmetic mean of byte samples, `0.0` for an empty slice.
pub(crate) fn mean_u8(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|&v| u64::from(v)).sum();
    (sum as f64 / samples.len() as f64) as f32
}

/// Triangle wave over `phase` in [0, 1): 0 at the ends, 1 at the midpoint.
pub(crate) fn triangle(phase: f64) -> f64 {
    let p = phase.rem_euclid(1.0);
    1.0 - (2.0 * p - 1.0).abs()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
