use super::*;
use crate::camera::pose::{CameraRequest, apply_camera_pose};
use crate::character::loader::MannequinLoader;
use crate::render::backend::studio_lights;

fn setup(size: u32) -> (CpuRasterizer, Character, PerspectiveCamera) {
    let r = CpuRasterizer::new(Canvas::square(size)).unwrap();
    let c = MannequinLoader::new().build(CharacterId::DEFAULT).unwrap();
    let mut cam = PerspectiveCamera::export_default();
    apply_camera_pose(&c, &mut cam, CameraRequest::default()).unwrap();
    (r, c, cam)
}

#[test]
fn empty_stage_renders_clear_color() {
    let (mut r, _, cam) = setup(16);
    r.set_clear_color(Rgba8::rgb(10, 20, 30));
    let f = r.render(&cam, &[]).unwrap();
    assert_eq!(f.data.len(), 16 * 16 * 4);
    assert!(f.premultiplied);
    assert_eq!(f.pixel(0, 0), Some([10, 20, 30, 255]));
    assert_eq!(f.pixel(15, 15), Some([10, 20, 30, 255]));
}

#[test]
fn character_covers_center_not_corners() {
    let (mut r, c, cam) = setup(64);
    for light in studio_lights() {
        r.attach_light(light);
    }
    let m = r.attach_character(&c).unwrap();
    let f = r
        .render(
            &cam,
            &[StagePose {
                member: m,
                scene: &c.scene,
            }],
        )
        .unwrap();
    assert_eq!(f.pixel(0, 0), Some([255, 255, 255, 255]));
    let center = f.pixel(32, 32).unwrap();
    assert_ne!(center, [255, 255, 255, 255]);
    assert_eq!(center[3], 255);
}

#[test]
fn unposed_members_are_skipped() {
    let (mut r, c, cam) = setup(32);
    r.attach_character(&c).unwrap();
    let f = r.render(&cam, &[]).unwrap();
    assert!(f.data.chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
}

#[test]
fn attach_detach_restores_resource_baseline() {
    let (mut r, c, _) = setup(8);
    let baseline = r.resource_stats();
    assert_eq!(baseline.live_textures, 2);

    let m = r.attach_character(&c).unwrap();
    let l = r.attach_light(studio_lights()[0]);
    let st = r.resource_stats();
    assert_eq!(st.live_geometries, c.meshes.len());
    assert_eq!(st.live_materials, c.meshes.len());
    assert_eq!(r.member_count(), 2);

    assert!(r.detach(m));
    assert!(r.detach(l));
    assert!(!r.detach(m));
    let after = r.resource_stats();
    assert_eq!(after.live_total(), baseline.live_total());
    assert_eq!(after.live_bytes, baseline.live_bytes);
    assert_eq!(r.member_count(), 0);

    let disposed = r.dispose();
    assert_eq!(disposed.live_total(), 0);
    assert_eq!(disposed.live_bytes, 0);
}

#[test]
fn canvas_must_be_non_empty() {
    assert!(CpuRasterizer::new(Canvas::square(0)).is_err());
    assert!(CpuRasterizer::new(Canvas::square(70_000)).is_err());
}

#[test]
fn near_plane_clipping_keeps_visible_part() {
    let a = ClipVertex {
        clip: Vec4::new(0.0, 0.0, 0.5, 1.0),
    };
    let b = ClipVertex {
        clip: Vec4::new(1.0, 0.0, 0.5, 1.0),
    };
    let behind = ClipVertex {
        clip: Vec4::new(0.0, 1.0, -0.5, 0.2),
    };
    assert_eq!(clip_near([a, b, a]).len(), 3);
    let poly = clip_near([a, b, behind]);
    assert_eq!(poly.len(), 4);
    assert!(poly.iter().all(|v| v.clip.z >= -1e-6));
    let all_behind = clip_near([behind, behind, behind]);
    assert!(all_behind.is_empty());
}

#[test]
fn shading_is_two_sided() {
    let lights = studio_lights();
    let a = Vec3::new(0.0, 0.0, 0.0);
    let b = Vec3::new(1.0, 0.0, 0.0);
    let c = Vec3::new(0.0, 1.0, 0.0);
    let eye = Vec3::new(0.0, 0.0, 5.0);
    let front = shade_flat(a, b, c, eye, &lights);
    let back = shade_flat(a, c, b, eye, &lights);
    assert!((front - back).abs() < 1e-6);
    assert!(front > 0.25 * 1.35);
}
