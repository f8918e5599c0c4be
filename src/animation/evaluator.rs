use std::f32::consts::{PI, TAU};

use crate::animation::ease::Ease;
use crate::animation::expression::Expression;
use crate::animation::presets::{ArmRebuild, BasePose, MotionPresetId, MotionSpeed, MotionStrength};
use crate::animation::rig::{EulerOffset, MotionRig, RootOffset};
use crate::character::model::{Character, ExpressionManager, HumanBone};
use crate::character::scene::SceneGraph;
use crate::foundation::core::LOOP_DURATION_SECS;
use crate::foundation::math::{clamp, pulse01, wrap};

/// Parameters selecting and shaping a motion preset.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct MotionParams {
    pub preset: MotionPresetId,
    pub strength: MotionStrength,
    pub speed: MotionSpeed,
}

/// Phase in radians at `t`: a whole number of cycles fits the loop, so `phase_at(LOOP, _)` is a
/// multiple of `2π`.
pub fn phase_at(t: f32, speed: MotionSpeed) -> f32 {
    (t / LOOP_DURATION_SECS) * TAU * speed.cycles() as f32
}

/// Per-frame inputs handed to a preset rule.
#[derive(Clone, Copy, Debug)]
pub struct MotionContext {
    pub t: f32,
    pub phase: f32,
    pub strength: f32,
    pub speed: MotionSpeed,
}

/// Write access to one character's rig and expressions for the duration of an evaluation.
pub struct PoseWriter<'a> {
    rig: &'a MotionRig,
    scene: &'a mut SceneGraph,
    expressions: Option<&'a mut ExpressionManager>,
}

impl PoseWriter<'_> {
    pub fn bone(&mut self, bone: HumanBone, offset: EulerOffset, strength: f32) {
        self.rig.apply_bone_offset(self.scene, bone, offset, strength);
    }

    pub fn root(&mut self, offset: RootOffset) {
        self.rig.apply_root_offset(self.scene, offset);
    }

    pub fn expression(&mut self, expression: Expression, weight: f32) {
        if let Some(em) = self.expressions.as_deref_mut() {
            expression.apply(em, weight);
        }
    }
}

/// A preset's evaluation rule: mutates the rig in place from the frame context.
pub type PresetRule = fn(&mut PoseWriter<'_>, &MotionContext);

/// Lookup table from preset to rule.
pub fn rule_for(preset: MotionPresetId) -> PresetRule {
    match preset {
        MotionPresetId::Wave => wave,
        MotionPresetId::HandDown => hand_down,
        MotionPresetId::IdleBounce => idle_bounce,
        MotionPresetId::IdleGroove => idle_groove,
        MotionPresetId::IdleLean => idle_lean,
        MotionPresetId::IdleTurn => idle_turn,
        MotionPresetId::IdleHandUp => idle_hand_up,
        MotionPresetId::IdleHandUpLeft => idle_hand_up_left,
        MotionPresetId::IdleHandUpBoth => idle_hand_up_both,
        MotionPresetId::Nod => nod,
        MotionPresetId::Bow => bow,
        MotionPresetId::Point => point,
        MotionPresetId::Shrug => shrug,
        MotionPresetId::SpinPose => spin_pose,
        MotionPresetId::Jump => jump,
        MotionPresetId::IdleCool => idle_cool,
        MotionPresetId::GutsPose => guts_pose,
        MotionPresetId::GutsPoseDouble => guts_pose_double,
        MotionPresetId::Turntable => turntable,
    }
}

/// Pose `character` at `t` seconds.
///
/// Offsets land on top of whatever the rig currently holds; call [`MotionRig::reset`] first.
/// Expression channels this module manages are zeroed before the rule runs, so a preset that does
/// not assert them leaves the face neutral.
#[tracing::instrument(level = "trace", skip(rig, character))]
pub fn evaluate(rig: &MotionRig, character: &mut Character, t: f32, params: MotionParams) {
    let Character {
        scene, expressions, ..
    } = character;
    let mut w = PoseWriter {
        rig,
        scene: &mut *scene,
        expressions: expressions.as_mut(),
    };
    let ctx = MotionContext {
        t,
        phase: phase_at(t, params.speed),
        strength: params.strength.factor(),
        speed: params.speed,
    };

    for e in Expression::ALL {
        w.expression(e, 0.0);
    }
    apply_base_pose(&mut w, params.preset.base_pose());
    rule_for(params.preset)(&mut w, &ctx);

    if let Some(em) = expressions.as_ref() {
        em.update(scene);
    }
}

const RELAXED_UPPER_ARM: EulerOffset = EulerOffset::new(0.08, 0.0, 1.22);
const RELAXED_LOWER_ARM: EulerOffset = EulerOffset::new(-0.06, 0.0, 0.02);
const RELAXED_HAND: EulerOffset = EulerOffset::new(0.0, 0.04, 0.04);
const STRICT_UPPER_ARM: EulerOffset = EulerOffset::new(0.0, 0.0, 1.30);

/// Left-arm offsets are authored; the right arm receives the mirror.
fn apply_base_pose(w: &mut PoseWriter<'_>, base: BasePose) {
    match base {
        BasePose::Strict => {
            w.bone(HumanBone::LeftUpperArm, STRICT_UPPER_ARM, 1.0);
            w.bone(HumanBone::RightUpperArm, STRICT_UPPER_ARM.mirrored(), 1.0);
        }
        BasePose::Relaxed(ArmRebuild { left, right }) => {
            for (rebuilt, bones, mirror) in [(left, LEFT_ARM, false), (right, RIGHT_ARM, true)] {
                if rebuilt {
                    continue;
                }
                for (bone, offset) in bones
                    .into_iter()
                    .zip([RELAXED_UPPER_ARM, RELAXED_LOWER_ARM, RELAXED_HAND])
                {
                    let offset = if mirror { offset.mirrored() } else { offset };
                    w.bone(bone, offset, 1.0);
                }
            }
        }
    }
}

fn blink_at(t: f32) -> f32 {
    pulse01(wrap(t, 1.5), 0.08, 0.06)
}

fn idle_face(w: &mut PoseWriter<'_>, ctx: &MotionContext, smile: f32) {
    w.expression(Expression::Blink, blink_at(ctx.t));
    w.expression(Expression::Smile, smile * ctx.strength);
}

const WAVE_UPPER_ARM: EulerOffset = EulerOffset::new(-0.85, -0.55, 0.25);
const WAVE_LOWER_ARM: EulerOffset = EulerOffset::new(0.50, 0.0, 0.1);
const WAVE_HAND: EulerOffset = EulerOffset::new(0.0, 0.55, 0.2);

/// Raised arm with the elbow bent beside the face. Authored for the right arm.
fn raised_arm(w: &mut PoseWriter<'_>, [upper, lower, hand]: [HumanBone; 3], mirror: bool) {
    let side = |o: EulerOffset| if mirror { o.mirrored() } else { o };
    w.bone(upper, side(WAVE_UPPER_ARM), 1.0);
    w.bone(lower, side(WAVE_LOWER_ARM), 1.0);
    w.bone(hand, side(WAVE_HAND), 1.0);
}

// Strength drives the swing amplitude only; the raised base pose is fixed. The root stays put.
fn wave(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let swing = (ctx.phase * 2.2).sin();
    let swing_fast = (ctx.phase * 4.4).sin();
    let s = ctx.strength;

    w.bone(HumanBone::RightUpperArm, WAVE_UPPER_ARM, 1.0);
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(0.0, 0.35 * swing, 0.0), s);
    w.bone(HumanBone::RightLowerArm, WAVE_LOWER_ARM, 1.0);
    w.bone(HumanBone::RightHand, WAVE_HAND, 1.0);
    w.bone(
        HumanBone::RightHand,
        EulerOffset::new(0.0, 0.08 * swing_fast, 0.05 * swing),
        s,
    );
    w.bone(HumanBone::Head, EulerOffset::new(0.05, 0.0, -0.18), s);
    w.expression(Expression::Smile, 0.35 * s);
}

fn hand_down(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let p = Ease::Smooth.window(ctx.t, 0.0, 0.6);
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(-0.20, 0.45, -1.30), p);
    w.bone(HumanBone::RightLowerArm, EulerOffset::new(-0.30, 0.25, 0.0), p);
    w.bone(HumanBone::RightHand, EulerOffset::new(0.0, 0.0, 0.08), p);
    w.bone(
        HumanBone::Head,
        EulerOffset::new(0.04, 0.0, 0.05 * ctx.phase.sin()),
        ctx.strength,
    );
}

fn idle_bounce(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let b = 0.5 - 0.5 * (2.0 * ctx.phase).cos();
    w.root(RootOffset {
        vertical: 0.025 * b,
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::Chest, EulerOffset::new(-0.04 * b, 0.0, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.05 * (2.0 * ctx.phase).sin(), 0.0, 0.0), s);
    w.bone(HumanBone::LeftUpperArm, EulerOffset::new(0.0, 0.0, 0.06 * b), s);
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(0.0, 0.0, -0.06 * b), s);
    idle_face(w, ctx, 0.15);
}

fn idle_groove(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let sway = ctx.phase.sin();
    w.root(RootOffset {
        yaw: 0.12 * sway,
        vertical: 0.012 * (0.5 - 0.5 * (2.0 * ctx.phase).cos()),
        strength: s,
    });
    w.bone(HumanBone::Spine, EulerOffset::new(0.0, 0.0, 0.06 * sway), s);
    w.bone(HumanBone::Chest, EulerOffset::new(0.0, 0.0, -0.04 * sway), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.0, 0.0, 0.08 * ctx.phase.cos()), s);
    w.bone(HumanBone::LeftUpperArm, EulerOffset::new(0.10 * sway, 0.0, 0.0), s);
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(-0.10 * sway, 0.0, 0.0), s);
    idle_face(w, ctx, 0.2);
}

fn idle_lean(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let lean = ctx.phase.sin();
    w.root(RootOffset {
        yaw: 0.05 * (2.0 * ctx.phase).sin(),
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::Spine, EulerOffset::new(0.0, 0.0, 0.10 * lean), s);
    w.bone(HumanBone::Chest, EulerOffset::new(0.0, 0.0, 0.05 * lean), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.0, 0.0, -0.08 * lean), s);
    idle_face(w, ctx, 0.1);
}

fn idle_turn(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let turn = ctx.phase.sin();
    w.root(RootOffset {
        yaw: 0.35 * turn,
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::Chest, EulerOffset::new(0.0, -0.05 * turn, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.0, 0.12 * turn, 0.0), s);
    idle_face(w, ctx, 0.12);
}

fn idle_hand_up(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let sway = ctx.phase.sin();
    raised_arm(w, RIGHT_ARM, false);
    w.bone(HumanBone::Chest, EulerOffset::new(0.03 * sway, 0.0, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.0, 0.10 * sway, -0.12), s);
    idle_face(w, ctx, 0.18);
}

fn idle_hand_up_left(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let sway = ctx.phase.sin();
    raised_arm(w, LEFT_ARM, true);
    w.bone(HumanBone::Chest, EulerOffset::new(0.03 * sway, 0.0, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.0, -0.10 * sway, 0.12), s);
    idle_face(w, ctx, 0.18);
}

fn idle_hand_up_both(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let sway = ctx.phase.sin();
    raised_arm(w, RIGHT_ARM, false);
    raised_arm(w, LEFT_ARM, true);
    w.root(RootOffset {
        vertical: 0.008 * (0.5 - 0.5 * (2.0 * ctx.phase).cos()),
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::Chest, EulerOffset::new(0.03 * sway, 0.0, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.04, 0.08 * sway, 0.0), s);
    idle_face(w, ctx, 0.25);
}

fn nod(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let n = (ctx.phase * 1.3).sin();
    w.bone(HumanBone::Head, EulerOffset::new(0.38 * n, 0.0, 0.0), ctx.strength);
    w.bone(HumanBone::Neck, EulerOffset::new(0.12 * n, 0.0, 0.0), ctx.strength);
}

// One bow over the first 1.2 s, then a small idle sway. Negative X bends forward.
fn bow(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let b = (clamp(ctx.t / 1.2, 0.0, 1.0) * PI).sin();
    let idle = 0.15 * (ctx.phase * 1.5).sin();
    w.bone(HumanBone::Chest, EulerOffset::new(-(0.55 * b + 0.05 * idle), 0.0, 0.0), s);
    w.bone(HumanBone::Spine, EulerOffset::new(-(0.35 * b + 0.03 * idle), 0.0, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.08 * b, 0.0, 0.0), s);
    w.expression(Expression::Smile, 0.22 * s);
}

fn point(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let sway = (ctx.phase * 0.8).sin();
    w.root(RootOffset {
        yaw: 0.10 * sway,
        vertical: 0.005 * (ctx.phase * 1.6).sin(),
        strength: s,
    });
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(-0.25, 1.25, 0.0), s);
    w.bone(HumanBone::RightLowerArm, EulerOffset::new(-0.02, 0.10, 0.0), s);
    w.bone(
        HumanBone::RightHand,
        EulerOffset::new(0.0, -(0.10 + 0.08 * sway), 0.08),
        s,
    );
    w.bone(HumanBone::Head, EulerOffset::new(0.0, 0.18, 0.0), s);
}

fn shrug(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    w.bone(HumanBone::Chest, EulerOffset::new(-0.05, 0.0, 0.0), s);
    w.root(RootOffset {
        vertical: 0.015,
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::LeftUpperArm, EulerOffset::new(0.10, 0.0, 0.35), s);
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(0.10, 0.0, -0.35), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.0, 0.0, 0.22 * ctx.phase.sin()), s);
}

// Spin through 160° over 2.5 s, then hold.
fn spin_pose(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let p = Ease::Smooth.window(ctx.t, 0.0, 2.5);
    w.root(RootOffset {
        yaw: 160f32.to_radians() * p,
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::Chest, EulerOffset::new(-0.05, 0.0, 0.0), s);
    w.expression(Expression::Smile, 0.18 * s);
}

fn jump(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let j = ctx.phase.sin();
    let up = j.max(0.0);
    let landing = (-j).max(0.0);
    w.root(RootOffset {
        vertical: 0.12 * up * up - 0.03 * landing * landing,
        strength: s,
        ..RootOffset::default()
    });
    w.bone(HumanBone::LeftUpperArm, EulerOffset::new(-0.25 * up, 0.0, 0.12), s);
    w.bone(HumanBone::RightUpperArm, EulerOffset::new(-0.25 * up, 0.0, -0.12), s);
    w.bone(HumanBone::Chest, EulerOffset::new(-0.12 * landing, 0.0, 0.0), s);
}

fn idle_cool(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let s = ctx.strength;
    let breathe = ctx.phase.sin();
    let head_yaw = (ctx.phase * 0.5).sin();
    w.bone(HumanBone::Chest, EulerOffset::new(0.04 * breathe, 0.0, 0.0), s);
    w.bone(HumanBone::Head, EulerOffset::new(0.02 * breathe, 0.18 * head_yaw, 0.0), s);
    idle_face(w, ctx, 0.12);
}

const GUTS_UPPER_ARM: EulerOffset = EulerOffset::new(-0.30, 0.60, -0.70);
const GUTS_LOWER_ARM: EulerOffset = EulerOffset::new(0.0, 0.0, 1.9);
const GUTS_HAND: EulerOffset = EulerOffset::new(0.0, 0.0, 0.2);

/// Fist raised in 0.5 s with a small strength-scaled pump on top. Authored for the right arm.
fn guts_arm(
    w: &mut PoseWriter<'_>,
    ctx: &MotionContext,
    [upper, lower, hand]: [HumanBone; 3],
    mirror: bool,
) {
    let p = Ease::Smooth.window(ctx.t, 0.0, 0.5);
    let side = |o: EulerOffset| if mirror { o.mirrored() } else { o };
    w.bone(upper, side(GUTS_UPPER_ARM), p);
    w.bone(lower, side(GUTS_LOWER_ARM), p);
    w.bone(hand, side(GUTS_HAND), p);
    w.bone(upper, side(EulerOffset::new(0.0, 0.0, 0.12 * ctx.phase.sin())), ctx.strength);
}

const RIGHT_ARM: [HumanBone; 3] = [
    HumanBone::RightUpperArm,
    HumanBone::RightLowerArm,
    HumanBone::RightHand,
];
const LEFT_ARM: [HumanBone; 3] = [
    HumanBone::LeftUpperArm,
    HumanBone::LeftLowerArm,
    HumanBone::LeftHand,
];

fn guts_torso(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let p = Ease::Smooth.window(ctx.t, 0.0, 0.5);
    w.bone(HumanBone::Chest, EulerOffset::new(-0.06 * p, 0.0, 0.0), 1.0);
    w.bone(HumanBone::Head, EulerOffset::new(0.06 * p, 0.0, 0.0), 1.0);
}

fn guts_pose(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    guts_arm(w, ctx, RIGHT_ARM, false);
    guts_torso(w, ctx);
    w.expression(Expression::Smile, 0.4 * ctx.strength);
}

fn guts_pose_double(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    guts_arm(w, ctx, RIGHT_ARM, false);
    guts_arm(w, ctx, LEFT_ARM, true);
    guts_torso(w, ctx);
    w.expression(Expression::Smile, 0.45 * ctx.strength);
}

// Root yaw only, proportional to time. Strength is ignored so the last frame meets the first.
fn turntable(w: &mut PoseWriter<'_>, ctx: &MotionContext) {
    let turns = ctx.speed.turntable_turns() as f32;
    w.root(RootOffset {
        yaw: TAU * turns * (ctx.t / LOOP_DURATION_SECS),
        ..RootOffset::default()
    });
}

#[cfg(test)]
#[path = "../../tests/unit/animation/evaluator.rs"]
mod tests;
