use super::*;
use crate::character::ids::CharacterId;
use crate::character::loader::MannequinLoader;

fn geometry() -> BodyGeometry {
    BodyGeometry {
        center: Vec3::new(0.0, 0.9, 0.0),
        size: Vec3::new(1.6, 1.8, 0.3),
        head: Some(Vec3::new(0.0, 1.55, 0.0)),
        hips: Some(Vec3::new(0.0, 0.95, 0.0)),
    }
}

fn request(framing: CameraFraming, pan: CameraPan) -> CameraRequest {
    CameraRequest {
        framing,
        pan,
        angle: CameraAngle::Front,
    }
}

fn solve(g: &BodyGeometry, framing: CameraFraming, pan: CameraPan) -> CameraPose {
    solve_camera_pose(g, 30.0, 1.0, request(framing, pan))
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn full_body_golden_values() {
    let g = geometry();
    let pose = solve(&g, CameraFraming::FullBody, CameraPan::Center);
    // target.y = 0.9 + 1.8 * 0.05; frame height = 1.8 * 1.18 wins over the width fit.
    assert!(approx(pose.target.y, 0.99));
    let tan = 15f32.to_radians().tan();
    let expected = (1.8 * 1.18 * 0.5) / tan * 1.12;
    assert!(approx(pose.position.z, expected), "{}", pose.position.z);
    assert_eq!(pose.position.x, 0.0);
    assert_eq!(pose.position.y, pose.target.y);
}

#[test]
fn face_and_waist_targets_follow_landmarks() {
    let g = geometry();
    let face = solve(&g, CameraFraming::Face, CameraPan::Center);
    // span = 0.6 → target 1.55 + 0.12
    assert!(approx(face.target.y, 1.67));
    let waist = solve(&g, CameraFraming::WaistToHead, CameraPan::Center);
    assert!(approx(waist.target.y, 1.55));
    let full = solve(&g, CameraFraming::FullBody, CameraPan::Center);
    assert!(face.position.z < full.position.z);
    assert!(waist.position.z < full.position.z);
}

#[test]
fn width_fit_dominates_for_wide_bounds() {
    let mut g = geometry();
    g.size.x = 6.0;
    let pose = solve(&g, CameraFraming::Face, CameraPan::Center);
    let tan = 15f32.to_radians().tan();
    assert!(approx(pose.position.z, 3.0 / tan * 0.78));
}

#[test]
fn pan_shifts_target_opposite_to_placement() {
    let g = geometry();
    let left = solve(&g, CameraFraming::FullBody, CameraPan::Left);
    let right = solve(&g, CameraFraming::FullBody, CameraPan::Right);
    assert!(approx(left.target.x, 1.6 * 0.22));
    assert!(approx(right.target.x, -1.6 * 0.22));
    let face = solve(&g, CameraFraming::Face, CameraPan::Left);
    assert!(approx(face.target.x, 1.6 * 0.12));
}

#[test]
fn missing_landmarks_are_estimated() {
    let mut g = geometry();
    g.head = None;
    g.hips = None;
    let pose = solve(&g, CameraFraming::WaistToHead, CameraPan::Center);
    // headY = 0.9 + 0.81, hipsY = 0.9 - 0.18, target = hipsY + span = headY
    assert!(approx(pose.target.y, 1.71));

    // Degenerate span is floored instead of dividing by zero.
    g.head = Some(Vec3::new(0.0, 0.5, 0.0));
    g.hips = Some(Vec3::new(0.0, 0.5, 0.0));
    let pose = solve(&g, CameraFraming::Face, CameraPan::Center);
    assert!(pose.position.z.is_finite());
    assert!(approx(pose.target.y, 0.5002));
}

#[test]
fn camera_pose_is_reproducible() {
    let c = MannequinLoader::new().build(CharacterId::DEFAULT).unwrap();
    let req = request(CameraFraming::WaistToHead, CameraPan::Right);
    let mut preview = PerspectiveCamera::new(30.0, 1.0, 0.1, 100.0).unwrap();
    let mut export = PerspectiveCamera::export_default();
    let a = apply_camera_pose(&c, &mut preview, req).unwrap();
    let b = apply_camera_pose(&c, &mut export, req).unwrap();
    assert_eq!(a, b);
    assert_eq!(preview.position, export.position);
    assert_eq!(preview.view(), export.view());
}

#[test]
fn lens_validation() {
    assert!(PerspectiveCamera::new(0.0, 1.0, 0.1, 100.0).is_err());
    assert!(PerspectiveCamera::new(30.0, 0.0, 0.1, 100.0).is_err());
    assert!(PerspectiveCamera::new(30.0, 1.0, 1.0, 0.5).is_err());
    let cam = PerspectiveCamera::export_default();
    let clip = cam.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
    // The origin is in front of a camera on +Z looking at it.
    assert!(clip.w > 0.0);
}

#[test]
fn every_angle_solves_to_the_front_view() {
    let g = geometry();
    let front = solve(&g, CameraFraming::WaistToHead, CameraPan::Left);
    for angle in [CameraAngle::FrontRight, CameraAngle::FrontLeft] {
        let req = CameraRequest {
            angle,
            ..request(CameraFraming::WaistToHead, CameraPan::Left)
        };
        assert_eq!(solve_camera_pose(&g, 30.0, 1.0, req), front, "{angle:?}");
    }
}
