use std::collections::BTreeMap;

use glam::Vec3;

use crate::character::ids::CharacterId;
use crate::character::scene::{Aabb, NodeId, SceneGraph};
use crate::foundation::core::Rgba8;
use crate::foundation::error::{PosecastError, PosecastResult};

/// The fixed humanoid bone set the rig and the camera care about.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum HumanBone {
    Hips,
    Spine,
    Chest,
    Neck,
    Head,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightUpperArm,
    RightLowerArm,
    RightHand,
}

impl HumanBone {
    pub const ALL: [Self; 11] = [
        Self::Hips,
        Self::Spine,
        Self::Chest,
        Self::Neck,
        Self::Head,
        Self::LeftUpperArm,
        Self::LeftLowerArm,
        Self::LeftHand,
        Self::RightUpperArm,
        Self::RightLowerArm,
        Self::RightHand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Hips => "hips",
            Self::Spine => "spine",
            Self::Chest => "chest",
            Self::Neck => "neck",
            Self::Head => "head",
            Self::LeftUpperArm => "leftUpperArm",
            Self::LeftLowerArm => "leftLowerArm",
            Self::LeftHand => "leftHand",
            Self::RightUpperArm => "rightUpperArm",
            Self::RightLowerArm => "rightLowerArm",
            Self::RightHand => "rightHand",
        }
    }
}

/// Triangle mesh attached to a scene node. Positions are in the node's local space.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub node: NodeId,
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub color: Rgba8,
}

impl Mesh {
    /// Axis-aligned box centered at `center` (node-local) with the given half extents.
    pub fn cuboid(
        name: impl Into<String>,
        node: NodeId,
        center: Vec3,
        half: Vec3,
        color: Rgba8,
    ) -> Self {
        let c = center;
        let positions = vec![
            c + Vec3::new(-half.x, -half.y, -half.z),
            c + Vec3::new(half.x, -half.y, -half.z),
            c + Vec3::new(half.x, half.y, -half.z),
            c + Vec3::new(-half.x, half.y, -half.z),
            c + Vec3::new(-half.x, -half.y, half.z),
            c + Vec3::new(half.x, -half.y, half.z),
            c + Vec3::new(half.x, half.y, half.z),
            c + Vec3::new(-half.x, half.y, half.z),
        ];
        // Counter-clockwise when seen from outside.
        let triangles = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 6, 2],
            [3, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self {
            name: name.into(),
            node,
            positions,
            triangles,
            color,
        }
    }

    pub fn vertex_bytes(&self) -> usize {
        self.positions.len() * std::mem::size_of::<Vec3>()
            + self.triangles.len() * std::mem::size_of::<[u32; 3]>()
    }
}

/// Scale-driven expression target: as the summed weight of `channels` goes 0 → 1 the node's scale
/// moves from `rest_scale` to `target_scale`.
#[derive(Clone, Debug)]
pub struct ExpressionBinding {
    pub channels: Vec<String>,
    pub node: NodeId,
    pub rest_scale: Vec3,
    pub target_scale: Vec3,
}

/// Named facial-expression channels of a character.
///
/// Channel names follow whatever convention the asset was authored with, so callers look up by
/// name and unknown names are ignored rather than reported.
#[derive(Clone, Debug, Default)]
pub struct ExpressionManager {
    weights: BTreeMap<String, f32>,
    bindings: Vec<ExpressionBinding>,
}

impl ExpressionManager {
    pub fn new(channels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            weights: channels.into_iter().map(|c| (c.into(), 0.0)).collect(),
            bindings: Vec::new(),
        }
    }

    pub fn bind(&mut self, binding: ExpressionBinding) {
        self.bindings.push(binding);
    }

    pub fn supports(&self, channel: &str) -> bool {
        self.weights.contains_key(channel)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Sets a channel weight clamped to `[0, 1]`. Returns `false` (and does nothing) when the
    /// channel is not present.
    pub fn set_value(&mut self, channel: &str, weight: f32) -> bool {
        match self.weights.get_mut(channel) {
            Some(w) => {
                *w = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn value(&self, channel: &str) -> Option<f32> {
        self.weights.get(channel).copied()
    }

    /// Push current weights into the bound scene nodes.
    pub fn update(&self, scene: &mut SceneGraph) {
        for b in &self.bindings {
            let w: f32 = b
                .channels
                .iter()
                .filter_map(|c| self.weights.get(c))
                .sum::<f32>()
                .clamp(0.0, 1.0);
            if let Some(t) = scene.transform_mut(b.node) {
                t.scale = b.rest_scale.lerp(b.target_scale, w);
            }
        }
    }
}

/// A loaded humanoid: scene graph, bone lookup, meshes and optional expressions.
#[derive(Clone, Debug)]
pub struct Character {
    pub id: CharacterId,
    pub scene: SceneGraph,
    pub root: NodeId,
    pub humanoid: BTreeMap<HumanBone, NodeId>,
    pub meshes: Vec<Mesh>,
    pub expressions: Option<ExpressionManager>,
}

impl Character {
    pub fn bone_node(&self, bone: HumanBone) -> Option<NodeId> {
        self.humanoid.get(&bone).copied()
    }

    /// Check that the root, every humanoid bone and every mesh refer to nodes of `scene`, and
    /// that triangle indices stay inside their mesh.
    pub fn validate(&self) -> PosecastResult<()> {
        if self.scene.node(self.root).is_none() {
            return Err(PosecastError::validation(format!(
                "character {}: root references unknown node {}",
                self.id, self.root.0
            )));
        }
        for (bone, node) in &self.humanoid {
            if self.scene.node(*node).is_none() {
                return Err(PosecastError::validation(format!(
                    "character {}: bone '{}' references unknown node {}",
                    self.id,
                    bone.name(),
                    node.0
                )));
            }
        }
        for mesh in &self.meshes {
            if self.scene.node(mesh.node).is_none() {
                return Err(PosecastError::validation(format!(
                    "character {}: mesh '{}' references unknown node {}",
                    self.id, mesh.name, mesh.node.0
                )));
            }
            let n = mesh.positions.len();
            let out_of_range = mesh.triangles.iter().find(|t| t.iter().any(|&i| i as usize >= n));
            if let Some(tri) = out_of_range {
                return Err(PosecastError::validation(format!(
                    "character {}: mesh '{}' triangle {tri:?} indexes past {n} vertices",
                    self.id, mesh.name
                )));
            }
        }
        Ok(())
    }

    /// World-space bounds of every mesh vertex under the current pose. Meshes on unknown nodes
    /// are skipped.
    pub fn world_bounds(&self) -> Option<Aabb> {
        let world = self.scene.world_matrices();
        Aabb::from_points(self.meshes.iter().flat_map(|m| {
            let mat = world.get(m.node.0).copied();
            m.positions
                .iter()
                .filter_map(move |&p| mat.map(|mat| mat.transform_point3(p)))
        }))
    }

    pub fn bone_world_position(&self, bone: HumanBone) -> Option<glam::Vec3> {
        self.bone_node(bone)
            .and_then(|n| self.scene.world_position(n))
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/character/model.rs"]
mod tests;
