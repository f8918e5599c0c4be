use crate::foundation::error::{PosecastError, PosecastResult};

/// Length of one motion loop in seconds.
pub const LOOP_DURATION_SECS: f32 = 3.0;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> PosecastResult<Self> {
        if den == 0 {
            return Err(PosecastError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(PosecastError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Number of whole frames covering `secs`, rounded to the nearest frame.
    pub fn frames_in(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }

    /// Inter-frame delay rounded to whole milliseconds.
    pub fn frame_delay_ms(self) -> u32 {
        (1000.0 * self.frame_duration_secs()).round() as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Straight color with alpha given as a 0..1 fraction (rounded to the nearest step).
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> PosecastResult<Self> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| PosecastError::validation(format!("color '{s}' must start with '#'")))?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return Err(PosecastError::validation(format!(
                "color '{s}' must be #rrggbb or #rrggbbaa"
            )));
        }
        let byte = |i: usize| -> PosecastResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| {
                PosecastError::validation(format!("color '{s}' has invalid hex digits"))
            })
        };
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, a))
    }

    /// Parse the CSS color forms `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` and
    /// `rgba(r, g, b, a)` with `a` in `0..=1`.
    pub fn from_css(input: &str) -> PosecastResult<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#')
            && hex.len() == 3
            && hex.is_ascii()
        {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            return Self::from_hex(&format!("#{expanded}"));
        }
        if s.starts_with('#') {
            return Self::from_hex(s);
        }

        let invalid = || PosecastError::validation(format!("unsupported color '{input}'"));
        let (args, has_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
            (rest.strip_suffix(')').ok_or_else(invalid)?, true)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (rest.strip_suffix(')').ok_or_else(invalid)?, false)
        } else {
            return Err(invalid());
        };

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != if has_alpha { 4 } else { 3 } {
            return Err(invalid());
        }
        let channel = |p: &str| -> PosecastResult<u8> { p.parse::<u8>().map_err(|_| invalid()) };
        let color = Self::rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?);
        if !has_alpha {
            return Ok(color);
        }
        let alpha: f32 = parts[3].parse().map_err(|_| invalid())?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(invalid());
        }
        Ok(color.with_alpha(alpha))
    }

    pub const fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }

    pub fn premultiplied(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
