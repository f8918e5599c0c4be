use crate::character::model::ExpressionManager;

/// Semantic facial expressions driven by the motion presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Blink,
    Smile,
}

impl Expression {
    pub const ALL: [Self; 2] = [Self::Blink, Self::Smile];

    /// Channel names an asset may use for this expression, across authoring conventions.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Blink => &["blink", "blinkLeft", "blinkRight", "Blink", "blink_l", "blink_r"],
            Self::Smile => &["happy", "joy", "smile", "Joy"],
        }
    }

    /// Writes `weight` (clamped to `[0, 1]`) to every alias the character supports and returns how
    /// many channels were touched.
    pub fn apply(self, manager: &mut ExpressionManager, weight: f32) -> usize {
        self.aliases()
            .iter()
            .filter(|name| manager.set_value(name, weight))
            .count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/expression.rs"]
mod tests;
