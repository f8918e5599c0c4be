use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{PosecastError, PosecastResult};

/// Query parameter carrying a serialized lineup.
pub const LINEUP_QUERY_KEY: &str = "ids";

/// `Cache-Control` value served with sprite sheets; sprite content never changes per ID.
pub const SPRITE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Validated character identifier in `MIN..=MAX`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct CharacterId(u32);

impl CharacterId {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 20_000;
    pub const DEFAULT: Self = Self(4274);

    pub fn new(raw: u32) -> PosecastResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&raw) {
            return Err(PosecastError::validation(format!(
                "character id {raw} is outside {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(raw))
    }

    /// Boundary check for free-form numeric input: non-finite values are rejected, the value is
    /// floored, then range-checked.
    pub fn from_f64(raw: f64) -> PosecastResult<Self> {
        if !raw.is_finite() {
            return Err(PosecastError::validation(format!(
                "character id {raw} is not a finite number"
            )));
        }
        let floored = raw.floor();
        if floored < f64::from(Self::MIN) || floored > f64::from(Self::MAX) {
            return Err(PosecastError::validation(format!(
                "character id {raw} is outside {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(floored as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Same-origin path of the rigged character asset.
    pub fn asset_path(self) -> String {
        format!("/api/vrm/{}", self.0)
    }

    /// Same-origin path of the sprite sheet proxy.
    pub fn sprite_path(self) -> String {
        format!("/api/sprites/{}", self.0)
    }

    pub fn upstream_sprite_url(self) -> String {
        format!("https://files.meebits.app/sprites/{}.png", self.0)
    }

    /// Download name for an exported loop, e.g. `character-4274-3s-1700000000.gif`.
    pub fn download_filename(self, unix_timestamp: u64) -> String {
        format!("character-{}-3s-{unix_timestamp}.gif", self.0)
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for CharacterId {
    type Error = PosecastError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CharacterId> for u32 {
    fn from(value: CharacterId) -> Self {
        value.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CharacterId {
    type Err = PosecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: f64 = s
            .trim()
            .parse()
            .map_err(|_| PosecastError::validation(format!("character id '{s}' is not a number")))?;
        Self::from_f64(raw)
    }
}

/// Coerce UI input into range: non-finite becomes the default, everything else is floored and
/// clamped.
pub fn clamp_character_id(raw: f64) -> CharacterId {
    if !raw.is_finite() {
        return CharacterId::DEFAULT;
    }
    let v = raw
        .floor()
        .clamp(f64::from(CharacterId::MIN), f64::from(CharacterId::MAX));
    CharacterId(v as u32)
}

/// Parse a lineup. Commas, whitespace and newlines all separate tokens; tokens that are not
/// numbers or fall outside the valid range are dropped.
pub fn parse_lineup(input: &str) -> Vec<CharacterId> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<CharacterId>().ok())
        .collect()
}

/// [`parse_lineup`], falling back to `[CharacterId::DEFAULT]` when nothing survives.
pub fn parse_lineup_or_default(input: &str) -> Vec<CharacterId> {
    let ids = parse_lineup(input);
    if ids.is_empty() {
        vec![CharacterId::DEFAULT]
    } else {
        ids
    }
}

pub fn serialize_lineup(ids: &[CharacterId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Source rectangle of one cell in a sprite sheet laid out as a fixed grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpriteSheetGrid {
    pub columns: u32,
    pub rows: u32,
}

impl Default for SpriteSheetGrid {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 8,
        }
    }
}

impl SpriteSheetGrid {
    /// Frame index wraps around the columns (negative indices included); row index clamps.
    pub fn source_rect(
        self,
        sheet_width: u32,
        sheet_height: u32,
        frame_index: i64,
        row_index: i64,
    ) -> PosecastResult<SpriteRect> {
        if self.columns == 0 || self.rows == 0 {
            return Err(PosecastError::validation(
                "sprite grid must have at least one column and row",
            ));
        }
        let width = sheet_width / self.columns;
        let height = sheet_height / self.rows;
        let col = frame_index.rem_euclid(i64::from(self.columns)) as u32;
        let row = row_index.clamp(0, i64::from(self.rows) - 1) as u32;
        Ok(SpriteRect {
            x: col * width,
            y: row * height,
            width,
            height,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/character/ids.rs"]
mod tests;
