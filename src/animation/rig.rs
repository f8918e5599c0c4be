use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::character::ids::CharacterId;
use crate::character::model::{Character, HumanBone};
use crate::character::scene::{NodeId, SceneGraph};

/// Rotation delta as Euler angles in radians, composed in X then Y then Z order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EulerOffset {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EulerOffset {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Each axis angle is scaled by `strength` before the quaternion is built.
    pub fn to_quat(self, strength: f32) -> Quat {
        Quat::from_rotation_x(self.x * strength)
            * Quat::from_rotation_y(self.y * strength)
            * Quat::from_rotation_z(self.z * strength)
    }

    pub fn mirrored(self) -> Self {
        Self::new(self.x, -self.y, -self.z)
    }
}

/// Yaw and vertical bob applied to the character root, both scaled by `strength`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootOffset {
    pub yaw: f32,
    pub vertical: f32,
    pub strength: f32,
}

impl Default for RootOffset {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            vertical: 0.0,
            strength: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BoneRest {
    node: NodeId,
    rotation: Quat,
}

#[derive(Clone, Copy, Debug)]
struct RootRest {
    node: NodeId,
    rotation: Quat,
    translation: Vec3,
}

/// Rest-pose snapshot of one character's bones and root.
///
/// Captured once per load and never updated afterwards. Offsets are deltas from rest; callers
/// [`reset`](Self::reset) before every frame so they do not compound.
#[derive(Clone, Debug)]
pub struct MotionRig {
    character: CharacterId,
    bones: BTreeMap<HumanBone, BoneRest>,
    root: RootRest,
}

impl MotionRig {
    /// Bones missing from the humanoid mapping are left out; offsets on them become no-ops.
    pub fn capture(character: &Character) -> Self {
        let bones = HumanBone::ALL
            .iter()
            .filter_map(|&bone| {
                let node = character.bone_node(bone)?;
                let t = character.scene.transform(node)?;
                Some((
                    bone,
                    BoneRest {
                        node,
                        rotation: t.rotation,
                    },
                ))
            })
            .collect();
        let root_t = character
            .scene
            .transform(character.root)
            .copied()
            .unwrap_or_default();
        Self {
            character: character.id,
            bones,
            root: RootRest {
                node: character.root,
                rotation: root_t.rotation,
                translation: root_t.translation,
            },
        }
    }

    pub fn character(&self) -> CharacterId {
        self.character
    }

    pub fn has_bone(&self, bone: HumanBone) -> bool {
        self.bones.contains_key(&bone)
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn reset(&self, scene: &mut SceneGraph) {
        if let Some(t) = scene.transform_mut(self.root.node) {
            t.rotation = self.root.rotation;
            t.translation = self.root.translation;
        }
        for rest in self.bones.values() {
            if let Some(t) = scene.transform_mut(rest.node) {
                t.rotation = rest.rotation;
            }
        }
    }

    /// Post-multiplies the scaled offset onto the bone's current rotation.
    pub fn apply_bone_offset(
        &self,
        scene: &mut SceneGraph,
        bone: HumanBone,
        offset: EulerOffset,
        strength: f32,
    ) {
        let Some(rest) = self.bones.get(&bone) else {
            return;
        };
        if let Some(t) = scene.transform_mut(rest.node) {
            t.rotation *= offset.to_quat(strength);
        }
    }

    /// Sets the root from rest: rotation is rest composed with yaw, position is rest plus the bob.
    pub fn apply_root_offset(&self, scene: &mut SceneGraph, offset: RootOffset) {
        if let Some(t) = scene.transform_mut(self.root.node) {
            t.rotation = self.root.rotation * Quat::from_rotation_y(offset.yaw * offset.strength);
            t.translation = self.root.translation
                + Vec3::new(0.0, offset.vertical * offset.strength, 0.0);
        }
    }

    /// Current live rotations of every captured bone plus the root transform.
    pub fn snapshot(&self, scene: &SceneGraph) -> RigSnapshot {
        let bones = self
            .bones
            .iter()
            .map(|(&bone, rest)| {
                let rotation = scene
                    .transform(rest.node)
                    .map_or(rest.rotation, |t| t.rotation);
                (bone, rotation)
            })
            .collect();
        let root = scene.transform(self.root.node).copied().unwrap_or_default();
        RigSnapshot {
            bones,
            root_rotation: root.rotation,
            root_translation: root.translation,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RigSnapshot {
    pub bones: Vec<(HumanBone, Quat)>,
    pub root_rotation: Quat,
    pub root_translation: Vec3,
}

impl RigSnapshot {
    /// Compares orientations up to quaternion sign.
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        let same_rotation = |a: Quat, b: Quat| 1.0 - a.dot(b).abs() <= tolerance;
        self.bones.len() == other.bones.len()
            && self
                .bones
                .iter()
                .zip(&other.bones)
                .all(|((ba, qa), (bb, qb))| ba == bb && same_rotation(*qa, *qb))
            && same_rotation(self.root_rotation, other.root_rotation)
            && (self.root_translation - other.root_translation).length() <= tolerance
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/rig.rs"]
mod tests;
