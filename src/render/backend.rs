use glam::Vec3;

use crate::camera::pose::PerspectiveCamera;
use crate::character::model::Character;
use crate::character::scene::SceneGraph;
use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::render::resources::ResourceStats;

/// A rendered frame as RGBA8 pixels.
///
/// Renderer output is **premultiplied alpha**. The `premultiplied` flag keeps that explicit at API
/// boundaries, since the encoder flattens straight and premultiplied input differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Frame filled with a single straight color, stored premultiplied.
    pub fn solid(canvas: Canvas, color: Rgba8) -> Self {
        let px = color.premultiplied();
        let mut data = Vec::with_capacity(canvas.pixel_count() * 4);
        for _ in 0..canvas.pixel_count() {
            data.extend_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub(crate) fn check_len(&self) -> PosecastResult<()> {
        let expected = (self.width as usize) * (self.height as usize) * 4;
        if self.data.len() != expected {
            return Err(PosecastError::render(format!(
                "frame buffer has {} bytes, expected {expected} for {}x{}",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// Scene light. Directional lights shine from `position` toward the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient { intensity: f32 },
    Directional { position: Vec3, intensity: f32 },
}

/// Studio rig shared by preview and export: ambient fill plus key, fill and rim lights.
pub fn studio_lights() -> [Light; 4] {
    [
        Light::Ambient { intensity: 1.35 },
        Light::Directional {
            position: Vec3::new(0.0, 1.2, 2.2),
            intensity: 2.2,
        },
        Light::Directional {
            position: Vec3::new(-2.2, 1.4, 1.0),
            intensity: 1.0,
        },
        Light::Directional {
            position: Vec3::new(2.2, 0.8, -1.8),
            intensity: 0.7,
        },
    ]
}

/// Stage membership handle returned by [`SceneRenderer`] attach calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

/// Current pose of one attached character for a render call.
#[derive(Clone, Copy, Debug)]
pub struct StagePose<'a> {
    pub member: MemberId,
    pub scene: &'a SceneGraph,
}

/// A renderer owning a stage of attached characters and lights.
///
/// Attaching uploads geometry and allocates graphics resources; detaching releases exactly what
/// the matching attach allocated.
pub trait SceneRenderer {
    fn canvas(&self) -> Canvas;

    /// Upload the character's meshes. The character's scene is only read at render time through
    /// [`StagePose`].
    fn attach_character(&mut self, character: &Character) -> PosecastResult<MemberId>;

    fn attach_light(&mut self, light: Light) -> MemberId;

    /// Remove a member and release its resources. Returns `false` for unknown members.
    fn detach(&mut self, member: MemberId) -> bool;

    fn set_clear_color(&mut self, color: Rgba8);

    /// Render the stage from `camera`. Characters without a matching pose are skipped.
    fn render(
        &mut self,
        camera: &PerspectiveCamera,
        poses: &[StagePose<'_>],
    ) -> PosecastResult<FrameRGBA>;

    fn resource_stats(&self) -> ResourceStats;

    fn member_count(&self) -> usize;
}
