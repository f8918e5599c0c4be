use crate::foundation::core::Rgba8;

/// Color triple for the speech overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeechStyle {
    pub id: &'static str,
    pub label: &'static str,
    pub text: Rgba8,
    pub frame: Rgba8,
    pub fill: Rgba8,
}

pub const DEFAULT_SPEECH_STYLE: &str = "classic";

// Alphas are CSS fractions scaled to 0..255 and rounded: 0.92 → 235, 0.95 → 242, 0.96 → 245,
// 0.97 → 247, 0.98 → 250.
const WHITE_FILL: Rgba8 = Rgba8::new(255, 255, 255, 245);

const fn accent(id: &'static str, label: &'static str, hex: u32) -> SpeechStyle {
    let c = Rgba8::rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8);
    SpeechStyle {
        id,
        label,
        text: c,
        frame: c,
        fill: WHITE_FILL,
    }
}

pub const SPEECH_STYLES: [SpeechStyle; 9] = [
    SpeechStyle {
        id: "classic",
        label: "Classic",
        text: Rgba8::new(0, 0, 0, 242),
        frame: Rgba8::new(0, 0, 0, 250),
        fill: WHITE_FILL,
    },
    SpeechStyle {
        id: "inverse",
        label: "Inverse",
        text: Rgba8::new(255, 255, 255, 247),
        frame: Rgba8::new(255, 255, 255, 250),
        fill: Rgba8::new(20, 20, 26, 235),
    },
    accent("newPunk", "New Punk", 0x2a3f6e),
    SpeechStyle {
        id: "popYellow",
        label: "Pop Yellow",
        text: Rgba8::rgb(0x11, 0x11, 0x14),
        frame: Rgba8::rgb(0x11, 0x11, 0x14),
        fill: Rgba8::new(255, 230, 0, 245),
    },
    accent("mint", "Mint", 0x006a7c),
    accent("electricCyan", "Electric Cyan", 0x00a9c9),
    accent("hotMagenta", "Hot Magenta", 0xd1007a),
    accent("popCoral", "Pop Coral", 0xc43a22),
    accent("charcoal", "Charcoal", 0x1a1a1f),
];

pub fn find_speech_style(id: &str) -> Option<&'static SpeechStyle> {
    SPEECH_STYLES.iter().find(|s| s.id == id)
}

/// Style for `id`; unknown ids fall back to classic.
pub fn speech_style(id: &str) -> SpeechStyle {
    find_speech_style(id).copied().unwrap_or(SPEECH_STYLES[0])
}

impl Default for SpeechStyle {
    fn default() -> Self {
        SPEECH_STYLES[0]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/style.rs"]
mod tests;
