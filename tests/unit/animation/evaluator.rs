use super::*;
use crate::animation::rig::RigSnapshot;
use crate::character::ids::CharacterId;
use crate::character::loader::MannequinLoader;

fn mannequin() -> Character {
    MannequinLoader::new().build(CharacterId::DEFAULT).unwrap()
}

fn params(preset: MotionPresetId) -> MotionParams {
    MotionParams {
        preset,
        ..MotionParams::default()
    }
}

fn posed(rig: &MotionRig, c: &mut Character, t: f32, p: MotionParams) -> RigSnapshot {
    rig.reset(&mut c.scene);
    evaluate(rig, c, t, p);
    rig.snapshot(&c.scene)
}

fn bone_rotation(snap: &RigSnapshot, bone: HumanBone) -> glam::Quat {
    snap.bones
        .iter()
        .find(|(b, _)| *b == bone)
        .map(|(_, q)| *q)
        .unwrap()
}

fn same_rotation(a: glam::Quat, b: glam::Quat) -> bool {
    1.0 - a.dot(b).abs() < 1e-6
}

#[test]
fn looping_presets_close_the_loop() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    for preset in MotionPresetId::ALL.into_iter().filter(|p| p.is_looping()) {
        for speed in [MotionSpeed::Slow, MotionSpeed::Normal, MotionSpeed::Fast] {
            for strength in [
                MotionStrength::Subtle,
                MotionStrength::Normal,
                MotionStrength::Strong,
            ] {
                let p = MotionParams {
                    preset,
                    strength,
                    speed,
                };
                let start = posed(&rig, &mut c, 0.0, p);
                let end = posed(&rig, &mut c, LOOP_DURATION_SECS, p);
                assert!(start.approx_eq(&end, 1e-4), "{preset} {speed:?} {strength:?}");
            }
        }
    }
}

#[test]
fn evaluating_twice_without_reset_compounds() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    let p = params(MotionPresetId::Wave);

    let once = posed(&rig, &mut c, 1.0, p);
    evaluate(&rig, &mut c, 1.0, p);
    let twice = rig.snapshot(&c.scene);
    assert!(!once.approx_eq(&twice, 1e-4));

    // A reset restores determinism.
    assert!(posed(&rig, &mut c, 1.0, p).approx_eq(&once, 1e-6));
}

#[test]
fn wave_golden_pose_at_start() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    let snap = posed(&rig, &mut c, 0.0, params(MotionPresetId::Wave));

    let expected = EulerOffset::new(-0.85, -0.55, 0.25).to_quat(1.0);
    assert!(same_rotation(bone_rotation(&snap, HumanBone::RightUpperArm), expected));
    let expected_head = EulerOffset::new(0.05, 0.0, -0.18).to_quat(1.0);
    assert!(same_rotation(bone_rotation(&snap, HumanBone::Head), expected_head));
    // The left arm still gets the relaxed correction.
    let relaxed = EulerOffset::new(0.08, 0.0, 1.22).to_quat(1.0);
    assert!(same_rotation(bone_rotation(&snap, HumanBone::LeftUpperArm), relaxed));
    // No root motion for the wave.
    assert!(snap.root_translation.length() < 1e-6);

    let em = c.expressions.as_ref().unwrap();
    assert!((em.value("Joy").unwrap() - 0.35).abs() < 1e-6);
    assert_eq!(em.value("Blink"), Some(0.0));
}

#[test]
fn relaxed_base_pose_lowers_both_arms() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    let rest_y = c.bone_world_position(HumanBone::LeftHand).unwrap().y;
    posed(&rig, &mut c, 0.0, params(MotionPresetId::Nod));
    let left = c.bone_world_position(HumanBone::LeftHand).unwrap();
    let right = c.bone_world_position(HumanBone::RightHand).unwrap();
    assert!(rest_y > 1.3);
    assert!(left.y < 1.1 && right.y < 1.1, "{left:?} {right:?}");
}

#[test]
fn expressions_do_not_leak_between_presets() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    let eye = c.scene.find_by_name("eyeLeft").unwrap();

    posed(&rig, &mut c, 0.08, params(MotionPresetId::IdleCool));
    assert_eq!(c.expressions.as_ref().unwrap().value("Blink"), Some(1.0));
    assert!((c.scene.transform(eye).unwrap().scale.y - 0.1).abs() < 1e-6);

    posed(&rig, &mut c, 0.08, params(MotionPresetId::Nod));
    let em = c.expressions.as_ref().unwrap();
    assert_eq!(em.value("Blink"), Some(0.0));
    assert_eq!(em.value("Joy"), Some(0.0));
    assert!((c.scene.transform(eye).unwrap().scale.y - 1.0).abs() < 1e-6);
}

#[test]
fn turntable_ignores_strength() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    let mut p = params(MotionPresetId::Turntable);
    p.strength = MotionStrength::Subtle;
    let subtle = posed(&rig, &mut c, 1.3, p);
    p.strength = MotionStrength::Strong;
    let strong = posed(&rig, &mut c, 1.3, p);
    assert!(subtle.approx_eq(&strong, 1e-5));

    // Half a turn at mid-loop.
    let half = posed(&rig, &mut c, 1.5, params(MotionPresetId::Turntable));
    let rest_root = glam::Quat::from_rotation_y(PI);
    let turned = rest_root * glam::Quat::from_rotation_y(PI);
    assert!(same_rotation(half.root_rotation, turned));
    // Arms forced straight, no elbow bend.
    assert!(same_rotation(
        bone_rotation(&half, HumanBone::LeftLowerArm),
        glam::Quat::IDENTITY
    ));
}

#[test]
fn strength_scales_offsets() {
    let mut c = mannequin();
    let rig = MotionRig::capture(&c);
    let t = 0.4;
    let mut p = params(MotionPresetId::Nod);
    p.strength = MotionStrength::Strong;
    let strong = posed(&rig, &mut c, t, p);

    let n = (phase_at(t, MotionSpeed::Normal) * 1.3).sin();
    let expected = EulerOffset::new(0.38 * n, 0.0, 0.0).to_quat(1.5);
    assert!(same_rotation(bone_rotation(&strong, HumanBone::Head), expected));
}

#[test]
fn missing_capabilities_are_absorbed() {
    let mut c = MannequinLoader::new()
        .without_bones([HumanBone::RightUpperArm, HumanBone::Head, HumanBone::Chest])
        .without_expressions()
        .build(CharacterId::DEFAULT)
        .unwrap();
    let rig = MotionRig::capture(&c);
    for preset in MotionPresetId::ALL {
        for t in [0.0, 0.7, 2.9] {
            posed(&rig, &mut c, t, params(preset));
        }
    }
    assert_eq!(rig.bone_count(), 8);
}

#[test]
fn phase_covers_whole_cycles() {
    assert!((phase_at(LOOP_DURATION_SECS, MotionSpeed::Normal) - 3.0 * TAU).abs() < 1e-4);
    assert!((phase_at(LOOP_DURATION_SECS, MotionSpeed::Fast) - 4.0 * TAU).abs() < 1e-4);
    assert_eq!(phase_at(0.0, MotionSpeed::Slow), 0.0);
}

// Fixed-time poses at normal strength and speed, where the phase is `2πt`.

const RELAXED_LEFT: [(HumanBone, EulerOffset); 3] = [
    (HumanBone::LeftUpperArm, EulerOffset::new(0.08, 0.0, 1.22)),
    (HumanBone::LeftLowerArm, EulerOffset::new(-0.06, 0.0, 0.02)),
    (HumanBone::LeftHand, EulerOffset::new(0.0, 0.04, 0.04)),
];
const RELAXED_RIGHT: [(HumanBone, EulerOffset); 3] = [
    (HumanBone::RightUpperArm, EulerOffset::new(0.08, 0.0, -1.22)),
    (HumanBone::RightLowerArm, EulerOffset::new(-0.06, 0.0, -0.02)),
    (HumanBone::RightHand, EulerOffset::new(0.0, -0.04, -0.04)),
];

struct Golden {
    c: Character,
    rig: MotionRig,
    rest: RigSnapshot,
    snap: RigSnapshot,
}

impl Golden {
    fn new() -> Self {
        let c = mannequin();
        let rig = MotionRig::capture(&c);
        let rest = rig.snapshot(&c.scene);
        Self {
            snap: rest.clone(),
            c,
            rig,
            rest,
        }
    }

    fn pose(&mut self, preset: MotionPresetId, t: f32) -> &mut Self {
        self.snap = posed(&self.rig, &mut self.c, t, params(preset));
        self
    }

    /// `bone` holds its rest rotation followed by `offsets`, each at full strength.
    fn bone(&mut self, bone: HumanBone, offsets: &[EulerOffset]) -> &mut Self {
        let scaled: Vec<(EulerOffset, f32)> = offsets.iter().map(|o| (*o, 1.0)).collect();
        self.bone_scaled(bone, &scaled)
    }

    fn bone_scaled(&mut self, bone: HumanBone, offsets: &[(EulerOffset, f32)]) -> &mut Self {
        let expected = offsets
            .iter()
            .fold(bone_rotation(&self.rest, bone), |q, (o, s)| q * o.to_quat(*s));
        let actual = bone_rotation(&self.snap, bone);
        let expected = if actual.dot(expected) < 0.0 { -expected } else { expected };
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "{bone:?}: {actual:?} != {expected:?}"
        );
        self
    }

    fn at_rest(&mut self, bone: HumanBone) -> &mut Self {
        self.bone(bone, &[])
    }

    fn relaxed_left(&mut self) -> &mut Self {
        for (bone, o) in RELAXED_LEFT {
            self.bone(bone, &[o]);
        }
        self
    }

    fn relaxed_right(&mut self) -> &mut Self {
        for (bone, o) in RELAXED_RIGHT {
            self.bone(bone, &[o]);
        }
        self
    }

    fn root(&mut self, yaw: f32, lift: f32) -> &mut Self {
        let expected = self.rest.root_rotation * glam::Quat::from_rotation_y(yaw);
        let actual = self.snap.root_rotation;
        let expected = if actual.dot(expected) < 0.0 { -expected } else { expected };
        assert!(actual.abs_diff_eq(expected, 1e-5), "root {actual:?} != {expected:?}");
        let lifted = self.rest.root_translation + glam::Vec3::new(0.0, lift, 0.0);
        assert!(
            self.snap.root_translation.abs_diff_eq(lifted, 1e-6),
            "root {:?} != {lifted:?}",
            self.snap.root_translation
        );
        self
    }

    fn face(&mut self, blink: f32, smile: f32) -> &mut Self {
        let em = self.c.expressions.as_ref().unwrap();
        let blink_now = em.value("Blink").unwrap();
        let smile_now = em.value("Joy").unwrap();
        assert!((blink_now - blink).abs() < 1e-5, "blink {blink_now} != {blink}");
        assert!((smile_now - smile).abs() < 1e-5, "smile {smile_now} != {smile}");
        self
    }
}

fn e(x: f32, y: f32, z: f32) -> EulerOffset {
    EulerOffset::new(x, y, z)
}

#[test]
fn wave_golden_pose_mid_swing() {
    Golden::new()
        .pose(MotionPresetId::Wave, 0.25)
        .bone(
            HumanBone::RightUpperArm,
            &[e(-0.85, -0.55, 0.25), e(0.0, -0.108_155_95, 0.0)],
        )
        .bone(HumanBone::RightLowerArm, &[e(0.50, 0.0, 0.1)])
        .bone(
            HumanBone::RightHand,
            &[e(0.0, 0.55, 0.2), e(0.0, 0.047_022_82, -0.015_450_85)],
        )
        .bone(HumanBone::Head, &[e(0.05, 0.0, -0.18)])
        .relaxed_left()
        .root(0.0, 0.0)
        .face(0.0, 0.35);
}

#[test]
fn hand_down_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::HandDown, 0.3)
        .bone_scaled(HumanBone::RightUpperArm, &[(e(-0.20, 0.45, -1.30), 0.5)])
        .bone_scaled(HumanBone::RightLowerArm, &[(e(-0.30, 0.25, 0.0), 0.5)])
        .bone_scaled(HumanBone::RightHand, &[(e(0.0, 0.0, 0.08), 0.5)])
        .bone(HumanBone::Head, &[e(0.04, 0.0, 0.047_552_83)])
        .relaxed_left()
        .face(0.0, 0.0);
    g.pose(MotionPresetId::HandDown, 1.0)
        .bone(HumanBone::RightUpperArm, &[e(-0.20, 0.45, -1.30)])
        .bone(HumanBone::RightLowerArm, &[e(-0.30, 0.25, 0.0)])
        .bone(HumanBone::RightHand, &[e(0.0, 0.0, 0.08)])
        .bone(HumanBone::Head, &[e(0.04, 0.0, 0.0)])
        .root(0.0, 0.0);
}

#[test]
fn idle_loop_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::IdleBounce, 0.25)
        .root(0.0, 0.025)
        .bone(HumanBone::Chest, &[e(-0.04, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.0, 0.0, 0.0)])
        .bone(
            HumanBone::LeftUpperArm,
            &[RELAXED_LEFT[0].1, e(0.0, 0.0, 0.06)],
        )
        .bone(
            HumanBone::RightUpperArm,
            &[RELAXED_RIGHT[0].1, e(0.0, 0.0, -0.06)],
        )
        .face(0.0, 0.15);

    g.pose(MotionPresetId::IdleGroove, 0.25)
        .root(0.12, 0.012)
        .bone(HumanBone::Spine, &[e(0.0, 0.0, 0.06)])
        .bone(HumanBone::Chest, &[e(0.0, 0.0, -0.04)])
        .bone(HumanBone::Head, &[e(0.0, 0.0, 0.0)])
        .bone(
            HumanBone::LeftUpperArm,
            &[RELAXED_LEFT[0].1, e(0.10, 0.0, 0.0)],
        )
        .bone(
            HumanBone::RightUpperArm,
            &[RELAXED_RIGHT[0].1, e(-0.10, 0.0, 0.0)],
        )
        .face(0.0, 0.2);

    g.pose(MotionPresetId::IdleLean, 0.25)
        .root(0.0, 0.0)
        .bone(HumanBone::Spine, &[e(0.0, 0.0, 0.10)])
        .bone(HumanBone::Chest, &[e(0.0, 0.0, 0.05)])
        .bone(HumanBone::Head, &[e(0.0, 0.0, -0.08)])
        .relaxed_left()
        .relaxed_right()
        .face(0.0, 0.1);

    g.pose(MotionPresetId::IdleTurn, 0.25)
        .root(0.35, 0.0)
        .bone(HumanBone::Chest, &[e(0.0, -0.05, 0.0)])
        .bone(HumanBone::Head, &[e(0.0, 0.12, 0.0)])
        .relaxed_left()
        .relaxed_right()
        .face(0.0, 0.12);

    g.pose(MotionPresetId::IdleHandUp, 0.25)
        .bone(HumanBone::RightUpperArm, &[e(-0.85, -0.55, 0.25)])
        .bone(HumanBone::RightLowerArm, &[e(0.50, 0.0, 0.1)])
        .bone(HumanBone::RightHand, &[e(0.0, 0.55, 0.2)])
        .bone(HumanBone::Chest, &[e(0.03, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.0, 0.10, -0.12)])
        .relaxed_left()
        .root(0.0, 0.0)
        .face(0.0, 0.18);
}

#[test]
fn hand_up_variants_mirror_the_raised_arm() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::IdleHandUpLeft, 0.25)
        .bone(HumanBone::LeftUpperArm, &[e(-0.85, 0.55, -0.25)])
        .bone(HumanBone::LeftLowerArm, &[e(0.50, 0.0, -0.1)])
        .bone(HumanBone::LeftHand, &[e(0.0, -0.55, -0.2)])
        .bone(HumanBone::Chest, &[e(0.03, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.0, -0.10, 0.12)])
        .relaxed_right()
        .root(0.0, 0.0)
        .face(0.0, 0.18);

    g.pose(MotionPresetId::IdleHandUpBoth, 0.25)
        .bone(HumanBone::RightUpperArm, &[e(-0.85, -0.55, 0.25)])
        .bone(HumanBone::LeftUpperArm, &[e(-0.85, 0.55, -0.25)])
        .bone(HumanBone::RightHand, &[e(0.0, 0.55, 0.2)])
        .bone(HumanBone::LeftHand, &[e(0.0, -0.55, -0.2)])
        .bone(HumanBone::Chest, &[e(0.03, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.04, 0.08, 0.0)])
        .root(0.0, 0.008)
        .face(0.0, 0.25);
}

#[test]
fn idle_cool_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::IdleCool, 0.25)
        .bone(HumanBone::Chest, &[e(0.04, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.02, 0.127_279_22, 0.0)])
        .relaxed_left()
        .relaxed_right()
        .root(0.0, 0.0)
        .face(0.0, 0.12);
    // Mid blink.
    g.pose(MotionPresetId::IdleCool, 0.11)
        .bone(HumanBone::Chest, &[e(0.025_496_96, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.012_748_48, 0.060_972_83, 0.0)])
        .face(0.25, 0.12);
    // The blink recurs every 1.5 s.
    g.pose(MotionPresetId::IdleCool, 1.58).face(1.0, 0.12);
}

#[test]
fn nod_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::Nod, 0.0)
        .at_rest(HumanBone::Head)
        .at_rest(HumanBone::Neck)
        .relaxed_left()
        .relaxed_right();
    g.pose(MotionPresetId::Nod, 0.25)
        .bone(HumanBone::Head, &[e(0.338_582_48, 0.0, 0.0)])
        .bone(HumanBone::Neck, &[e(0.106_920_78, 0.0, 0.0)])
        .root(0.0, 0.0)
        .face(0.0, 0.0);
}

#[test]
fn bow_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::Bow, 0.6)
        .bone(HumanBone::Chest, &[e(-0.545_591_6, 0.0, 0.0)])
        .bone(HumanBone::Spine, &[e(-0.347_354_97, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.08, 0.0, 0.0)])
        .relaxed_left()
        .face(0.0, 0.22);
    // Back up; only the idle sway remains.
    g.pose(MotionPresetId::Bow, 1.2)
        .bone(HumanBone::Chest, &[e(0.007_132_92, 0.0, 0.0)])
        .bone(HumanBone::Spine, &[e(0.004_279_75, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.0, 0.0, 0.0)])
        .root(0.0, 0.0);
}

#[test]
fn point_golden_pose() {
    Golden::new()
        .pose(MotionPresetId::Point, 0.25)
        .root(0.095_105_65, 0.002_938_93)
        .bone(HumanBone::RightUpperArm, &[e(-0.25, 1.25, 0.0)])
        .bone(HumanBone::RightLowerArm, &[e(-0.02, 0.10, 0.0)])
        .bone(HumanBone::RightHand, &[e(0.0, -0.176_084_52, 0.08)])
        .bone(HumanBone::Head, &[e(0.0, 0.18, 0.0)])
        .relaxed_left()
        .face(0.0, 0.0);
}

#[test]
fn shrug_golden_pose() {
    Golden::new()
        .pose(MotionPresetId::Shrug, 0.25)
        .root(0.0, 0.015)
        .bone(HumanBone::Chest, &[e(-0.05, 0.0, 0.0)])
        .bone(
            HumanBone::LeftUpperArm,
            &[RELAXED_LEFT[0].1, e(0.10, 0.0, 0.35)],
        )
        .bone(
            HumanBone::RightUpperArm,
            &[RELAXED_RIGHT[0].1, e(0.10, 0.0, -0.35)],
        )
        .bone(HumanBone::Head, &[e(0.0, 0.0, 0.22)])
        .face(0.0, 0.0);
}

#[test]
fn spin_pose_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::SpinPose, 1.25)
        .root(1.396_263_4, 0.0)
        .bone(HumanBone::Chest, &[e(-0.05, 0.0, 0.0)])
        .relaxed_left()
        .relaxed_right()
        .face(0.0, 0.18);
    // Holds 160° after 2.5 s.
    g.pose(MotionPresetId::SpinPose, 2.9).root(2.792_526_8, 0.0);
}

#[test]
fn jump_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::Jump, 0.25)
        .root(0.0, 0.12)
        .bone(
            HumanBone::LeftUpperArm,
            &[RELAXED_LEFT[0].1, e(-0.25, 0.0, 0.12)],
        )
        .bone(
            HumanBone::RightUpperArm,
            &[RELAXED_RIGHT[0].1, e(-0.25, 0.0, -0.12)],
        )
        .bone(HumanBone::Chest, &[e(0.0, 0.0, 0.0)])
        .face(0.0, 0.0);
    // Landing crouch.
    g.pose(MotionPresetId::Jump, 0.75)
        .root(0.0, -0.03)
        .bone(
            HumanBone::LeftUpperArm,
            &[RELAXED_LEFT[0].1, e(0.0, 0.0, 0.12)],
        )
        .bone(
            HumanBone::RightUpperArm,
            &[RELAXED_RIGHT[0].1, e(0.0, 0.0, -0.12)],
        )
        .bone(HumanBone::Chest, &[e(-0.12, 0.0, 0.0)]);
}

#[test]
fn guts_pose_golden_poses() {
    let mut g = Golden::new();
    g.pose(MotionPresetId::GutsPose, 0.25)
        .bone_scaled(
            HumanBone::RightUpperArm,
            &[(e(-0.30, 0.60, -0.70), 0.5), (e(0.0, 0.0, 0.12), 1.0)],
        )
        .bone_scaled(HumanBone::RightLowerArm, &[(e(0.0, 0.0, 1.9), 0.5)])
        .bone_scaled(HumanBone::RightHand, &[(e(0.0, 0.0, 0.2), 0.5)])
        .bone(HumanBone::Chest, &[e(-0.03, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.03, 0.0, 0.0)])
        .relaxed_left()
        .root(0.0, 0.0)
        .face(0.0, 0.4);
    g.pose(MotionPresetId::GutsPose, 1.0)
        .bone(HumanBone::RightUpperArm, &[e(-0.30, 0.60, -0.70), e(0.0, 0.0, 0.0)])
        .bone(HumanBone::RightLowerArm, &[e(0.0, 0.0, 1.9)])
        .bone(HumanBone::Chest, &[e(-0.06, 0.0, 0.0)])
        .bone(HumanBone::Head, &[e(0.06, 0.0, 0.0)]);
}

#[test]
fn guts_pose_double_mirrors_the_left_arm() {
    Golden::new()
        .pose(MotionPresetId::GutsPoseDouble, 0.25)
        .bone_scaled(
            HumanBone::RightUpperArm,
            &[(e(-0.30, 0.60, -0.70), 0.5), (e(0.0, 0.0, 0.12), 1.0)],
        )
        .bone_scaled(
            HumanBone::LeftUpperArm,
            &[(e(-0.30, -0.60, 0.70), 0.5), (e(0.0, 0.0, -0.12), 1.0)],
        )
        .bone_scaled(HumanBone::LeftLowerArm, &[(e(0.0, 0.0, -1.9), 0.5)])
        .bone_scaled(HumanBone::LeftHand, &[(e(0.0, 0.0, -0.2), 0.5)])
        .bone(HumanBone::Chest, &[e(-0.03, 0.0, 0.0)])
        .face(0.0, 0.45);
}
