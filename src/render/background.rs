use crate::foundation::core::Rgba8;

/// Named background color used as the renderer clear color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackgroundPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub color: Rgba8,
}

const fn preset(id: &'static str, label: &'static str, hex: u32) -> BackgroundPreset {
    BackgroundPreset {
        id,
        label,
        color: Rgba8::rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8),
    }
}

pub const DEFAULT_BACKGROUND: &str = "white";

pub const BACKGROUND_PRESETS: [BackgroundPreset; 26] = [
    preset("white", "White", 0xffffff),
    preset("dark", "Dark", 0x0a0a0a),
    preset("newPunkBlue", "New Punk Blue", 0x2a3f6e),
    preset("midnightNavy", "Midnight Navy", 0x0f1b2d),
    preset("deepIndigo", "Deep Indigo", 0x1b2140),
    preset("slateBlue", "Slate Blue", 0x3b4a63),
    preset("smokeBlue", "Smoke Blue", 0x5a6f86),
    preset("popYellow", "Pop Yellow", 0xffe600),
    preset("lemonYellow", "Lemon Yellow", 0xfff06a),
    preset("sunflower", "Sunflower", 0xffcc33),
    preset("electricCyan", "Electric Cyan", 0x00d7ff),
    preset("hotMagenta", "Hot Magenta", 0xff2fb3),
    preset("popCoral", "Pop Coral", 0xff6b4a),
    preset("stormTeal", "Storm Teal", 0x1b4a4c),
    preset("petrolGreen", "Petrol Green", 0x123c3a),
    preset("sage", "Sage", 0x7d8d7a),
    preset("moss", "Moss", 0x556a55),
    preset("oliveDrab", "Olive Drab", 0x4c4a2b),
    preset("warmSand", "Warm Sand", 0xd6c6a8),
    preset("paperBeige", "Paper Beige", 0xf1eadf),
    preset("clay", "Clay", 0xb08a77),
    preset("terracottaDust", "Terracotta Dust", 0x8f5f4d),
    preset("dustyRose", "Dusty Rose", 0xb58a93),
    preset("mauve", "Mauve", 0x7f6377),
    preset("plumInk", "Plum Ink", 0x2c1f2b),
    preset("charcoal", "Charcoal", 0x1a1a1f),
];

pub fn find_background(id: &str) -> Option<&'static BackgroundPreset> {
    BACKGROUND_PRESETS.iter().find(|p| p.id == id)
}

/// Clear color for `id`. Anything that is neither a preset id nor a CSS color falls back to
/// white; CSS colors are made opaque.
pub fn background_color(id: &str) -> Rgba8 {
    match find_background(id) {
        Some(p) => p.color,
        None => Rgba8::from_css(id).map_or(Rgba8::WHITE, Rgba8::opaque),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/background.rs"]
mod tests;
