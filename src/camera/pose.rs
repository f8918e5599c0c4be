use glam::{Mat4, Vec3};

use crate::character::model::{Character, HumanBone};
use crate::foundation::error::{PosecastError, PosecastResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraFraming {
    #[default]
    FullBody,
    WaistToHead,
    Face,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraPan {
    Left,
    #[default]
    Center,
    Right,
}

/// Requested viewing angle. Parsed and carried through requests, but [`solve_camera_pose`]
/// ignores it: every angle renders the front view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraAngle {
    #[default]
    Front,
    FrontRight,
    FrontLeft,
}

/// Framing request handed to the pose calculator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraRequest {
    pub framing: CameraFraming,
    pub pan: CameraPan,
    pub angle: CameraAngle,
}

pub const CAMERA_FOV_DEG: f32 = 30.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;

/// Right-handed perspective camera looking down -Z by default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> PosecastResult<Self> {
        if !(fov_deg > 0.0 && fov_deg < 180.0) {
            return Err(PosecastError::validation("camera fov must be in (0, 180) degrees"));
        }
        if !(aspect > 0.0) || !(near > 0.0) || !(far > near) {
            return Err(PosecastError::validation(
                "camera needs aspect > 0 and 0 < near < far",
            ));
        }
        Ok(Self {
            fov_deg,
            aspect,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        })
    }

    /// Square export camera with the fixed lens.
    pub fn export_default() -> Self {
        Self {
            fov_deg: CAMERA_FOV_DEG,
            aspect: 1.0,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Landmarks the pose calculator reads off a character.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyGeometry {
    pub center: Vec3,
    pub size: Vec3,
    pub head: Option<Vec3>,
    pub hips: Option<Vec3>,
}

impl BodyGeometry {
    /// World bounds plus head and hips positions under the character's current pose.
    pub fn measure(character: &Character) -> PosecastResult<Self> {
        let bounds = character
            .world_bounds()
            .ok_or_else(|| PosecastError::validation("character has no geometry to frame"))?;
        Ok(Self {
            center: bounds.center(),
            size: bounds.size(),
            head: character.bone_world_position(HumanBone::Head),
            hips: character.bone_world_position(HumanBone::Hips),
        })
    }
}

/// Camera placement produced by [`solve_camera_pose`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

/// Pure camera placement for a framing and pan request.
///
/// Missing landmarks are estimated from the bounds. The camera sits on +Z at the larger of the
/// height and width fits, scaled tighter for closer framings.
pub fn solve_camera_pose(
    geometry: &BodyGeometry,
    fov_deg: f32,
    aspect: f32,
    request: CameraRequest,
) -> CameraPose {
    let BodyGeometry { center, size, .. } = *geometry;
    let head_y = geometry.head.map_or(center.y + size.y * 0.45, |h| h.y);
    let hips_y = geometry.hips.map_or(center.y - size.y * 0.10, |h| h.y);
    let span = (head_y - hips_y).max(0.001);

    let mut target = center;
    let frame_height = match request.framing {
        CameraFraming::Face => {
            target.y = head_y + span * 0.2;
            (span * 0.14).clamp(size.y * 0.055, size.y * 0.12)
        }
        CameraFraming::WaistToHead => {
            target.y = hips_y + span;
            (span * 0.20).clamp(size.y * 0.07, size.y * 0.16)
        }
        CameraFraming::FullBody => {
            target.y = center.y + size.y * 0.05;
            (size.y * 1.18).clamp(size.y * 0.85, size.y * 1.35)
        }
    };

    // Panning left shifts the target right so the character lands on the left.
    let pan_sign = match request.pan {
        CameraPan::Left => 1.0,
        CameraPan::Center => 0.0,
        CameraPan::Right => -1.0,
    };
    let pan_amount = match request.framing {
        CameraFraming::Face => size.x * 0.12,
        _ => size.x * 0.22,
    };
    target.x += pan_amount * pan_sign;

    let half_fov_tan = (fov_deg.to_radians() / 2.0).tan();
    let fit_height = (frame_height * 0.5) / half_fov_tan;
    let fit_width = (size.x * 0.5) / (half_fov_tan * aspect.max(0.001));
    let scale = match request.framing {
        CameraFraming::Face => 0.78,
        CameraFraming::WaistToHead => 0.92,
        CameraFraming::FullBody => 1.12,
    };
    let distance = fit_height.max(fit_width) * scale;

    CameraPose {
        position: Vec3::new(0.0, target.y, distance),
        target,
    }
}

/// Measure `character`, place `camera` and return the look-at target so callers can re-assert
/// it every frame.
#[tracing::instrument(skip(character, camera))]
pub fn apply_camera_pose(
    character: &Character,
    camera: &mut PerspectiveCamera,
    request: CameraRequest,
) -> PosecastResult<Vec3> {
    let geometry = BodyGeometry::measure(character)?;
    let pose = solve_camera_pose(&geometry, camera.fov_deg, camera.aspect, request);
    camera.position = pose.position;
    camera.look_at(pose.target);
    tracing::debug!(?pose, "camera placed");
    Ok(pose.target)
}

#[cfg(test)]
#[path = "../../tests/unit/camera/pose.rs"]
mod tests;
