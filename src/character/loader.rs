use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use glam::{Quat, Vec3};

use crate::character::ids::CharacterId;
use crate::character::model::{Character, ExpressionBinding, ExpressionManager, HumanBone, Mesh};
use crate::character::scene::{NodeId, SceneGraph, Transform};
use crate::foundation::core::Rgba8;
use crate::foundation::error::{PosecastError, PosecastResult};

/// Capability: turn a validated character ID into a loaded humanoid.
pub trait CharacterLoader {
    fn load(&self, id: CharacterId) -> impl Future<Output = PosecastResult<Character>> + Send;
}

/// Validate `raw` and load it. Out-of-range IDs never reach the loader; loader failures surface
/// as [`PosecastError::AssetLoad`].
#[tracing::instrument(skip(loader))]
pub async fn load_character<L: CharacterLoader + Sync>(
    loader: &L,
    raw: f64,
) -> PosecastResult<Character> {
    let id = CharacterId::from_f64(raw)?;
    match loader.load(id).await {
        Ok(c) => {
            c.validate().map_err(|e| {
                PosecastError::asset_load(format!("character {id} is malformed: {e}"))
            })?;
            tracing::debug!(id = id.get(), triangles = c.triangle_count(), "character loaded");
            Ok(c)
        }
        Err(err @ PosecastError::AssetLoad(_)) => Err(err),
        Err(err) => Err(PosecastError::asset_load(format!(
            "failed to load character {id}: {err}"
        ))),
    }
}

/// Ticket handed out per load request; only the newest ticket may apply its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    pub id: CharacterId,
}

/// Generation counter used to discard results of superseded load requests.
#[derive(Debug, Default)]
pub struct LoadTracker {
    generation: u64,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: CharacterId) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
            id,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Invalidate every outstanding ticket.
    pub fn cancel(&mut self) {
        self.generation += 1;
    }
}

/// Eye and mouth channels of the two expression naming conventions the mannequin alternates
/// between.
const CURRENT_BLINK: [&str; 3] = ["blink", "blinkLeft", "blinkRight"];
const CURRENT_EXTRA: [&str; 2] = ["happy", "relaxed"];
const LEGACY_BLINK: [&str; 3] = ["Blink", "blink_l", "blink_r"];
const LEGACY_EXTRA: [&str; 2] = ["Joy", "Sorrow"];

/// Procedural block humanoid.
///
/// Authored facing -Z (the legacy rig convention: left arm along -X); the root carries a half
/// turn about Y so the loaded character faces a camera on +Z.
#[derive(Clone, Debug, Default)]
pub struct MannequinLoader {
    omit_bones: BTreeSet<HumanBone>,
    without_expressions: bool,
}

impl MannequinLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `bones` out of the humanoid mapping; the geometry is still built.
    pub fn without_bones(mut self, bones: impl IntoIterator<Item = HumanBone>) -> Self {
        self.omit_bones.extend(bones);
        self
    }

    pub fn without_expressions(mut self) -> Self {
        self.without_expressions = true;
        self
    }

    pub fn build(&self, id: CharacterId) -> PosecastResult<Character> {
        let palette = Palette::for_id(id);
        let mut b = Builder::default();

        let root = b.node(
            "scene",
            None,
            Transform {
                rotation: Quat::from_rotation_y(std::f32::consts::PI),
                ..Transform::IDENTITY
            },
        )?;
        let hips = b.bone(HumanBone::Hips, root, Vec3::new(0.0, 0.95, 0.0))?;
        let spine = b.bone(HumanBone::Spine, hips, Vec3::new(0.0, 0.12, 0.0))?;
        let chest = b.bone(HumanBone::Chest, spine, Vec3::new(0.0, 0.16, 0.0))?;
        let neck = b.bone(HumanBone::Neck, chest, Vec3::new(0.0, 0.22, 0.0))?;
        let head = b.bone(HumanBone::Head, neck, Vec3::new(0.0, 0.08, 0.0))?;

        let trunk = [
            ("hips", hips, 0.02, Vec3::new(0.15, 0.08, 0.09), palette.pants),
            ("torso", spine, 0.1, Vec3::new(0.14, 0.1, 0.085), palette.shirt),
            ("chest", chest, 0.1, Vec3::new(0.17, 0.12, 0.1), palette.shirt),
            ("neck", neck, 0.04, Vec3::splat(0.045), palette.skin),
            ("head", head, 0.12, Vec3::new(0.11, 0.12, 0.11), palette.skin),
        ];
        for (name, node, lift, half, color) in trunk {
            b.cuboid(name, node, Vec3::new(0.0, lift, 0.0), half, color);
        }

        for (side, sign) in [(Side::Left, -1.0f32), (Side::Right, 1.0)] {
            let (upper, lower, hand) = side.arm_bones();
            let shoulder = b.bone(upper, chest, Vec3::new(0.18 * sign, 0.17, 0.0))?;
            let elbow = b.bone(lower, shoulder, Vec3::new(0.26 * sign, 0.0, 0.0))?;
            let wrist = b.bone(hand, elbow, Vec3::new(0.24 * sign, 0.0, 0.0))?;
            let segments = [
                (upper, shoulder, 0.13, Vec3::new(0.13, 0.045, 0.045), palette.shirt),
                (lower, elbow, 0.12, Vec3::new(0.12, 0.04, 0.04), palette.skin),
                (hand, wrist, 0.05, Vec3::new(0.05, 0.04, 0.03), palette.skin),
            ];
            for (bone, node, reach, half, color) in segments {
                b.cuboid(bone.name(), node, Vec3::new(reach * sign, 0.0, 0.0), half, color);
            }

            let leg = b.node(
                side.leg_name(),
                Some(hips),
                Transform::from_translation(Vec3::new(0.085 * sign, -0.04, 0.0)),
            )?;
            b.cuboid(
                side.leg_name(),
                leg,
                Vec3::new(0.0, -0.44, 0.0),
                Vec3::new(0.065, 0.44, 0.07),
                palette.pants,
            );
            b.cuboid(
                "shoe",
                leg,
                Vec3::new(0.0, -0.89, -0.03),
                Vec3::new(0.07, 0.03, 0.1),
                palette.shoes,
            );
        }

        // The face sits on -Z, the front of the unrotated rig.
        let face = |x: f32, y: f32| Transform::from_translation(Vec3::new(x, y, -0.111));
        let eye_left = b.node("eyeLeft", Some(head), face(-0.045, 0.14))?;
        let eye_right = b.node("eyeRight", Some(head), face(0.045, 0.14))?;
        let mouth = b.node("mouth", Some(head), face(0.0, 0.07))?;
        for (name, node) in [("eyeLeft", eye_left), ("eyeRight", eye_right)] {
            b.cuboid(name, node, Vec3::ZERO, Vec3::new(0.02, 0.022, 0.004), palette.eyes);
        }
        b.cuboid("mouth", mouth, Vec3::ZERO, Vec3::new(0.035, 0.008, 0.004), palette.eyes);

        let expressions = if self.without_expressions {
            None
        } else {
            let legacy = id.get() % 2 == 0;
            let (blink, extra) = if legacy {
                (LEGACY_BLINK, LEGACY_EXTRA)
            } else {
                (CURRENT_BLINK, CURRENT_EXTRA)
            };
            let mut em = ExpressionManager::new(blink.iter().chain(extra.iter()).copied());
            // Channels 1 and 2 close one eye each; channel 0 closes both.
            for (node, own) in [(eye_left, blink[1]), (eye_right, blink[2])] {
                em.bind(ExpressionBinding {
                    channels: vec![blink[0].to_owned(), own.to_owned()],
                    node,
                    rest_scale: Vec3::ONE,
                    target_scale: Vec3::new(1.0, 0.1, 1.0),
                });
            }
            em.bind(ExpressionBinding {
                channels: vec![extra[0].to_owned()],
                node: mouth,
                rest_scale: Vec3::ONE,
                target_scale: Vec3::new(1.35, 2.5, 1.0),
            });
            Some(em)
        };

        let humanoid = b
            .humanoid
            .into_iter()
            .filter(|(bone, _)| !self.omit_bones.contains(bone))
            .collect();

        Ok(Character {
            id,
            scene: b.scene,
            root,
            humanoid,
            meshes: b.meshes,
            expressions,
        })
    }
}

impl CharacterLoader for MannequinLoader {
    async fn load(&self, id: CharacterId) -> PosecastResult<Character> {
        self.build(id)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn arm_bones(self) -> (HumanBone, HumanBone, HumanBone) {
        match self {
            Self::Left => (
                HumanBone::LeftUpperArm,
                HumanBone::LeftLowerArm,
                HumanBone::LeftHand,
            ),
            Self::Right => (
                HumanBone::RightUpperArm,
                HumanBone::RightLowerArm,
                HumanBone::RightHand,
            ),
        }
    }

    fn leg_name(self) -> &'static str {
        match self {
            Self::Left => "leftLeg",
            Self::Right => "rightLeg",
        }
    }
}

#[derive(Default)]
struct Builder {
    scene: SceneGraph,
    humanoid: BTreeMap<HumanBone, NodeId>,
    meshes: Vec<Mesh>,
}

impl Builder {
    fn node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        transform: Transform,
    ) -> PosecastResult<NodeId> {
        self.scene.add_node(name, parent, transform)
    }

    fn bone(&mut self, bone: HumanBone, parent: NodeId, offset: Vec3) -> PosecastResult<NodeId> {
        let id = self
            .scene
            .add_node(bone.name(), Some(parent), Transform::from_translation(offset))?;
        self.humanoid.insert(bone, id);
        Ok(id)
    }

    fn cuboid(&mut self, name: &str, node: NodeId, center: Vec3, half: Vec3, color: Rgba8) {
        self.meshes.push(Mesh::cuboid(name, node, center, half, color));
    }
}

struct Palette {
    skin: Rgba8,
    shirt: Rgba8,
    pants: Rgba8,
    shoes: Rgba8,
    eyes: Rgba8,
}

impl Palette {
    fn for_id(id: CharacterId) -> Self {
        let n = id.get();
        let channel = |mul: u32, base: u32| (base + (n.wrapping_mul(mul) % 96)) as u8;
        Self {
            skin: Rgba8::rgb(channel(7, 150), channel(11, 120), channel(13, 100)),
            shirt: Rgba8::rgb(channel(37, 40), channel(53, 60), channel(71, 110)),
            pants: Rgba8::rgb(channel(17, 30), channel(19, 30), channel(23, 50)),
            shoes: Rgba8::rgb(30, 30, 34),
            eyes: Rgba8::rgb(20, 20, 24),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/character/loader.rs"]
mod tests;
