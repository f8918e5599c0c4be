use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{PosecastError, PosecastResult};

/// Closed set of motion presets.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum MotionPresetId {
    #[default]
    Wave,
    HandDown,
    IdleBounce,
    IdleGroove,
    IdleLean,
    IdleTurn,
    IdleHandUp,
    IdleHandUpLeft,
    IdleHandUpBoth,
    Nod,
    Bow,
    Point,
    Shrug,
    SpinPose,
    Jump,
    IdleCool,
    GutsPose,
    GutsPoseDouble,
    Turntable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PresetFamily {
    Gesture,
    Idle,
    ExactPose,
}

/// Which arms a preset builds from the raw bone orientation instead of on top of the relaxed base
/// pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArmRebuild {
    pub left: bool,
    pub right: bool,
}

impl ArmRebuild {
    pub const NONE: Self = Self {
        left: false,
        right: false,
    };
    pub const RIGHT: Self = Self {
        left: false,
        right: true,
    };
    pub const LEFT: Self = Self {
        left: true,
        right: false,
    };
    pub const BOTH: Self = Self {
        left: true,
        right: true,
    };
}

/// Base-pose correction applied before a preset's own offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasePose {
    /// Arms lowered from the wide rest pose toward a natural hang, elbows slightly soft.
    Relaxed(ArmRebuild),
    /// Arms forced straight down with no bend.
    Strict,
}

impl MotionPresetId {
    pub const ALL: [Self; 19] = [
        Self::Wave,
        Self::HandDown,
        Self::IdleBounce,
        Self::IdleGroove,
        Self::IdleLean,
        Self::IdleTurn,
        Self::IdleHandUp,
        Self::IdleHandUpLeft,
        Self::IdleHandUpBoth,
        Self::Nod,
        Self::Bow,
        Self::Point,
        Self::Shrug,
        Self::SpinPose,
        Self::Jump,
        Self::IdleCool,
        Self::GutsPose,
        Self::GutsPoseDouble,
        Self::Turntable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::HandDown => "handDown",
            Self::IdleBounce => "idleBounce",
            Self::IdleGroove => "idleGroove",
            Self::IdleLean => "idleLean",
            Self::IdleTurn => "idleTurn",
            Self::IdleHandUp => "idleHandUp",
            Self::IdleHandUpLeft => "idleHandUpLeft",
            Self::IdleHandUpBoth => "idleHandUpBoth",
            Self::Nod => "nod",
            Self::Bow => "bow",
            Self::Point => "point",
            Self::Shrug => "shrug",
            Self::SpinPose => "spinPose",
            Self::Jump => "jump",
            Self::IdleCool => "idleCool",
            Self::GutsPose => "gutsPose",
            Self::GutsPoseDouble => "gutsPoseDouble",
            Self::Turntable => "turntable",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Wave => "Wave",
            Self::HandDown => "Hand Down",
            Self::IdleBounce => "Idle Bounce",
            Self::IdleGroove => "Idle Groove",
            Self::IdleLean => "Idle Lean",
            Self::IdleTurn => "Idle Turn",
            Self::IdleHandUp => "Idle Hand Up",
            Self::IdleHandUpLeft => "Idle Hand Up (Left)",
            Self::IdleHandUpBoth => "Idle Hands Up",
            Self::Nod => "Nod",
            Self::Bow => "Bow",
            Self::Point => "Point",
            Self::Shrug => "Shrug",
            Self::SpinPose => "Spin Pose",
            Self::Jump => "Jump",
            Self::IdleCool => "Idle Cool",
            Self::GutsPose => "Guts Pose",
            Self::GutsPoseDouble => "Guts Pose (Double)",
            Self::Turntable => "Turntable (I-Pose)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Wave => "Wave hello with the right hand",
            Self::HandDown => "Lower the right hand to the center",
            Self::IdleBounce => "Full-body bounce (loop)",
            Self::IdleGroove => "Full-body groove (loop)",
            Self::IdleLean => "Lean + sway (loop)",
            Self::IdleTurn => "Subtle turn in place (loop)",
            Self::IdleHandUp => "Right hand raised, relaxed sway (loop)",
            Self::IdleHandUpLeft => "Left hand raised, relaxed sway (loop)",
            Self::IdleHandUpBoth => "Both hands raised, relaxed sway (loop)",
            Self::Nod => "Nod with a blink",
            Self::Bow => "A light bow",
            Self::Point => "Pointing gesture",
            Self::Shrug => "Shrug with a head tilt",
            Self::SpinPose => "Quick spin, then a pose",
            Self::Jump => "Small jump",
            Self::IdleCool => "Breathing with a slow head sway",
            Self::GutsPose => "Right fist pump",
            Self::GutsPoseDouble => "Both fists pumped",
            Self::Turntable => "Arms down, full turn in place",
        }
    }

    pub fn family(self) -> PresetFamily {
        match self {
            Self::IdleBounce
            | Self::IdleGroove
            | Self::IdleLean
            | Self::IdleTurn
            | Self::IdleHandUp
            | Self::IdleHandUpLeft
            | Self::IdleHandUpBoth
            | Self::IdleCool => PresetFamily::Idle,
            Self::Turntable => PresetFamily::ExactPose,
            _ => PresetFamily::Gesture,
        }
    }

    /// Whether the rig state at the end of the loop equals the state at time zero.
    ///
    /// Most gestures either hold an end pose or run at a non-integer frequency, so they do not
    /// close.
    pub fn is_looping(self) -> bool {
        match self.family() {
            PresetFamily::Idle | PresetFamily::ExactPose => true,
            PresetFamily::Gesture => matches!(self, Self::Shrug | Self::Jump),
        }
    }

    pub fn base_pose(self) -> BasePose {
        match self {
            Self::Turntable => BasePose::Strict,
            Self::Wave | Self::Point | Self::HandDown | Self::IdleHandUp | Self::GutsPose => {
                BasePose::Relaxed(ArmRebuild::RIGHT)
            }
            Self::IdleHandUpLeft => BasePose::Relaxed(ArmRebuild::LEFT),
            Self::GutsPoseDouble | Self::IdleHandUpBoth => BasePose::Relaxed(ArmRebuild::BOTH),
            _ => BasePose::Relaxed(ArmRebuild::NONE),
        }
    }
}

impl fmt::Display for MotionPresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionPresetId {
    type Err = PosecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PosecastError::validation(format!("unknown motion preset '{s}'")))
    }
}

/// Discrete amplitude multiplier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionStrength {
    Subtle,
    #[default]
    Normal,
    Strong,
}

impl MotionStrength {
    pub fn factor(self) -> f32 {
        self.factor_f64() as f32
    }

    pub fn factor_f64(self) -> f64 {
        match self {
            Self::Subtle => 0.5,
            Self::Normal => 1.0,
            Self::Strong => 1.5,
        }
    }

    pub fn from_factor(v: f64) -> PosecastResult<Self> {
        match v {
            x if x == 0.5 => Ok(Self::Subtle),
            x if x == 1.0 => Ok(Self::Normal),
            x if x == 1.5 => Ok(Self::Strong),
            _ => Err(PosecastError::validation(format!(
                "motion strength must be 0.5, 1.0 or 1.5 (got {v})"
            ))),
        }
    }
}

/// Discrete tempo multiplier. Each step maps to a whole number of cycles per loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl MotionSpeed {
    pub fn factor(self) -> f32 {
        self.factor_f64() as f32
    }

    pub fn factor_f64(self) -> f64 {
        match self {
            Self::Slow => 0.8,
            Self::Normal => 1.0,
            Self::Fast => 1.2,
        }
    }

    pub fn from_factor(v: f64) -> PosecastResult<Self> {
        match v {
            x if x == 0.8 => Ok(Self::Slow),
            x if x == 1.0 => Ok(Self::Normal),
            x if x == 1.2 => Ok(Self::Fast),
            _ => Err(PosecastError::validation(format!(
                "motion speed must be 0.8, 1.0 or 1.2 (got {v})"
            ))),
        }
    }

    /// Whole phase cycles per loop.
    pub fn cycles(self) -> u32 {
        match self {
            Self::Slow => 2,
            Self::Normal => 3,
            Self::Fast => 4,
        }
    }

    /// Whole turns per loop for the turntable.
    pub fn turntable_turns(self) -> u32 {
        match self {
            Self::Slow | Self::Normal => 1,
            Self::Fast => 2,
        }
    }
}

macro_rules! factor_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_f64(self.factor_f64())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let v = f64::deserialize(d)?;
                Self::from_factor(v).map_err(serde::de::Error::custom)
            }
        }
    };
}

factor_serde!(MotionStrength);
factor_serde!(MotionSpeed);

#[cfg(test)]
#[path = "../../tests/unit/animation/presets.rs"]
mod tests;
