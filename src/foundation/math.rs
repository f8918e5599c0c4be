pub(crate) fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// One-shot bump in 0..1 centered at `center`: a squared tent of half-width `width`.
pub(crate) fn pulse01(t: f32, center: f32, width: f32) -> f32 {
    let d = (t - center).abs();
    let x = clamp(1.0 - d / width.max(1e-6), 0.0, 1.0);
    x * x
}

/// Euclidean remainder, so negative times wrap into `0..period`.
pub(crate) fn wrap(t: f32, period: f32) -> f32 {
    t.rem_euclid(period)
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
