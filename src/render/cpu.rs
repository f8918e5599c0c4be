use std::collections::BTreeMap;

use glam::{Mat4, Vec3, Vec4};

use crate::camera::pose::PerspectiveCamera;
use crate::character::ids::CharacterId;
use crate::character::model::Character;
use crate::character::scene::NodeId;
use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::render::backend::{FrameRGBA, Light, MemberId, SceneRenderer, StagePose};
use crate::render::resources::{GpuResources, ResourceHandle, ResourceKind, ResourceStats};

const MATERIAL_BYTES: usize = 64;

/// Z-buffered software rasterizer with flat, two-sided shading.
///
/// Color and depth targets are allocated once at construction and reused by every render call.
pub struct CpuRasterizer {
    canvas: Canvas,
    clear: Rgba8,
    color: Vec<u8>,
    depth: Vec<f32>,
    resources: GpuResources,
    targets: [ResourceHandle; 2],
    members: BTreeMap<MemberId, Member>,
    next_member: u64,
}

enum Member {
    Character(UploadedCharacter),
    Light(Light),
}

struct UploadedCharacter {
    id: CharacterId,
    meshes: Vec<UploadedMesh>,
    handles: Vec<ResourceHandle>,
}

struct UploadedMesh {
    node: NodeId,
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    color: Rgba8,
}

#[derive(Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
}

struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
}

impl CpuRasterizer {
    pub fn new(canvas: Canvas) -> PosecastResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(PosecastError::validation("render canvas must be non-empty"));
        }
        if canvas.width > u32::from(u16::MAX) || canvas.height > u32::from(u16::MAX) {
            return Err(PosecastError::validation(
                "render canvas width/height must fit in u16",
            ));
        }
        let px = canvas.pixel_count();
        let mut resources = GpuResources::new();
        let targets = [
            resources.allocate(ResourceKind::Texture, px * 4),
            resources.allocate(ResourceKind::Texture, px * std::mem::size_of::<f32>()),
        ];
        tracing::debug!(width = canvas.width, height = canvas.height, "render targets allocated");
        Ok(Self {
            canvas,
            clear: Rgba8::WHITE,
            color: vec![0; px * 4],
            depth: vec![f32::INFINITY; px],
            resources,
            targets,
            members: BTreeMap::new(),
            next_member: 0,
        })
    }

    /// Release everything, render targets included. The rasterizer is unusable afterwards.
    pub fn dispose(mut self) -> ResourceStats {
        let ids: Vec<MemberId> = self.members.keys().copied().collect();
        for id in ids {
            self.detach(id);
        }
        let targets = self.targets;
        self.resources.release_all(targets);
        self.resources.stats()
    }

    fn next_id(&mut self) -> MemberId {
        let id = MemberId(self.next_member);
        self.next_member = self.next_member.saturating_add(1);
        id
    }

    fn clear_targets(&mut self) {
        let px = self.clear.premultiplied();
        for dst in self.color.chunks_exact_mut(4) {
            dst.copy_from_slice(&px);
        }
        self.depth.fill(f32::INFINITY);
    }

    fn draw_character(
        &mut self,
        member: MemberId,
        view_proj: Mat4,
        eye: Vec3,
        lights: &[Light],
        pose: &StagePose<'_>,
    ) {
        let Some(Member::Character(uploaded)) = self.members.get(&member) else {
            return;
        };
        let world = pose.scene.world_matrices();
        let width = self.canvas.width;
        let height = self.canvas.height;
        let mut target = Target {
            width,
            height,
            color: &mut self.color,
            depth: &mut self.depth,
        };

        for mesh in &uploaded.meshes {
            let Some(model) = world.get(mesh.node.0) else {
                continue;
            };
            let world_pos: Vec<Vec3> = mesh
                .positions
                .iter()
                .map(|p| model.transform_point3(*p))
                .collect();
            let clip: Vec<Vec4> = world_pos
                .iter()
                .map(|p| view_proj * p.extend(1.0))
                .collect();

            for tri in &mesh.triangles {
                let [a, b, c] = tri.map(|i| i as usize);
                let (Some(wa), Some(wb), Some(wc)) =
                    (world_pos.get(a), world_pos.get(b), world_pos.get(c))
                else {
                    continue;
                };
                let shade = shade_flat(*wa, *wb, *wc, eye, lights);
                let rgb = [
                    scale_channel(mesh.color.r, shade),
                    scale_channel(mesh.color.g, shade),
                    scale_channel(mesh.color.b, shade),
                ];
                let poly = clip_near([
                    ClipVertex { clip: clip[a] },
                    ClipVertex { clip: clip[b] },
                    ClipVertex { clip: clip[c] },
                ]);
                if poly.len() < 3 {
                    continue;
                }
                let screen: Vec<ScreenVertex> =
                    poly.iter().map(|v| to_screen(v.clip, width, height)).collect();
                for i in 1..screen.len() - 1 {
                    target.fill_triangle(&screen[0], &screen[i], &screen[i + 1], rgb);
                }
            }
        }
    }
}

impl SceneRenderer for CpuRasterizer {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    #[tracing::instrument(skip(self, character), fields(id = %character.id))]
    fn attach_character(&mut self, character: &Character) -> PosecastResult<MemberId> {
        let mut meshes = Vec::with_capacity(character.meshes.len());
        let mut handles = Vec::with_capacity(character.meshes.len() * 2);
        for mesh in &character.meshes {
            if character.scene.node(mesh.node).is_none() {
                self.resources.release_all(handles);
                return Err(PosecastError::render(format!(
                    "mesh '{}' references unknown node {}",
                    mesh.name, mesh.node.0
                )));
            }
            handles.push(
                self.resources
                    .allocate(ResourceKind::Geometry, mesh.vertex_bytes()),
            );
            handles.push(self.resources.allocate(ResourceKind::Material, MATERIAL_BYTES));
            meshes.push(UploadedMesh {
                node: mesh.node,
                positions: mesh.positions.clone(),
                triangles: mesh.triangles.clone(),
                color: mesh.color,
            });
        }
        let id = self.next_id();
        tracing::debug!(member = id.0, meshes = meshes.len(), "character attached");
        self.members.insert(
            id,
            Member::Character(UploadedCharacter {
                id: character.id,
                meshes,
                handles,
            }),
        );
        Ok(id)
    }

    fn attach_light(&mut self, light: Light) -> MemberId {
        let id = self.next_id();
        self.members.insert(id, Member::Light(light));
        id
    }

    fn detach(&mut self, member: MemberId) -> bool {
        match self.members.remove(&member) {
            Some(Member::Character(uploaded)) => {
                let released = self.resources.release_all(uploaded.handles);
                tracing::debug!(
                    member = member.0,
                    character = %uploaded.id,
                    released,
                    "character detached"
                );
                true
            }
            Some(Member::Light(_)) => true,
            None => false,
        }
    }

    fn set_clear_color(&mut self, color: Rgba8) {
        self.clear = color;
    }

    #[tracing::instrument(level = "trace", skip(self, camera, poses))]
    fn render(
        &mut self,
        camera: &PerspectiveCamera,
        poses: &[StagePose<'_>],
    ) -> PosecastResult<FrameRGBA> {
        self.clear_targets();
        let lights: Vec<Light> = self
            .members
            .values()
            .filter_map(|m| match m {
                Member::Light(l) => Some(*l),
                Member::Character(_) => None,
            })
            .collect();
        let view_proj = camera.view_projection();
        if !view_proj.is_finite() {
            return Err(PosecastError::render("camera produced a non-finite projection"));
        }
        for pose in poses {
            self.draw_character(pose.member, view_proj, camera.position, &lights, pose);
        }
        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.color.clone(),
            premultiplied: true,
        })
    }

    fn resource_stats(&self) -> ResourceStats {
        self.resources.stats()
    }

    fn member_count(&self) -> usize {
        self.members.len()
    }
}

struct Target<'a> {
    width: u32,
    height: u32,
    color: &'a mut [u8],
    depth: &'a mut [f32],
}

impl Target<'_> {
    fn fill_triangle(
        &mut self,
        a: &ScreenVertex,
        b: &ScreenVertex,
        c: &ScreenVertex,
        rgb: [u8; 3],
    ) {
        let area = edge(a, b, c.x, c.y);
        if area.abs() < 1e-12 {
            return;
        }
        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as i64;
        let max_x = a.x.max(b.x).max(c.x).ceil().min(self.width as f32) as i64;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as i64;
        let max_y = a.y.max(b.y).max(c.y).ceil().min(self.height as f32) as i64;

        for y in min_y..max_y {
            let py = y as f32 + 0.5;
            for x in min_x..max_x {
                let px = x as f32 + 0.5;
                let w0 = edge(b, c, px, py) / area;
                let w1 = edge(c, a, px, py) / area;
                let w2 = edge(a, b, px, py) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * a.z + w1 * b.z + w2 * c.z;
                let i = (y as usize) * (self.width as usize) + (x as usize);
                if !(z < self.depth[i]) {
                    continue;
                }
                self.depth[i] = z;
                let o = i * 4;
                self.color[o..o + 3].copy_from_slice(&rgb);
                self.color[o + 3] = 255;
            }
        }
    }
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Clip a triangle against the near plane (`z >= 0` in clip space for a 0..1 depth range).
fn clip_near(tri: [ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let cur = tri[i];
        let next = tri[(i + 1) % 3];
        let cur_in = cur.clip.z >= 0.0;
        let next_in = next.clip.z >= 0.0;
        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in {
            let t = cur.clip.z / (cur.clip.z - next.clip.z);
            out.push(ClipVertex {
                clip: cur.clip.lerp(next.clip, t),
            });
        }
    }
    out
}

fn to_screen(clip: Vec4, width: u32, height: u32) -> ScreenVertex {
    let w = if clip.w.abs() < 1e-9 { 1e-9 } else { clip.w };
    let ndc = clip.truncate() / w;
    ScreenVertex {
        x: (ndc.x * 0.5 + 0.5) * width as f32,
        y: (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32,
        z: ndc.z,
    }
}

/// Lambert luminance for a face: a quarter of the ambient term plus a quarter of every
/// directional contribution. The normal is flipped toward the eye so both sides light.
fn shade_flat(a: Vec3, b: Vec3, c: Vec3, eye: Vec3, lights: &[Light]) -> f32 {
    let mut n = (b - a).cross(c - a).normalize_or_zero();
    let centroid = (a + b + c) / 3.0;
    if n.dot(eye - centroid) < 0.0 {
        n = -n;
    }
    lights
        .iter()
        .map(|light| match *light {
            Light::Ambient { intensity } => 0.25 * intensity,
            Light::Directional {
                position,
                intensity,
            } => 0.25 * intensity * n.dot(position.normalize_or_zero()).max(0.0),
        })
        .sum()
}

fn scale_channel(c: u8, shade: f32) -> u8 {
    (f32::from(c) * shade).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
