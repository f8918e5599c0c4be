/// Easing curves over `t` in `[0, 1]`; inputs outside are clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// Hermite `3t² - 2t³`.
    Smooth,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Smooth => t * t * (3.0 - 2.0 * t),
        }
    }

    /// Progress of `t` through the window `[start, end]`, eased.
    pub fn window(self, t: f32, start: f32, end: f32) -> f32 {
        let span = (end - start).max(1e-6);
        self.apply((t - start) / span)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
