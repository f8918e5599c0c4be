use super::*;

struct FailingLoader;

impl CharacterLoader for FailingLoader {
    async fn load(&self, id: CharacterId) -> PosecastResult<Character> {
        Err(PosecastError::render(format!("no asset for {id}")))
    }
}

/// Returns a mannequin whose first mesh hangs off a node that does not exist.
struct DanglingMeshLoader;

impl CharacterLoader for DanglingMeshLoader {
    async fn load(&self, id: CharacterId) -> PosecastResult<Character> {
        let mut c = MannequinLoader::new().build(id)?;
        c.meshes[0].node = NodeId(9999);
        Ok(c)
    }
}

#[tokio::test]
async fn malformed_characters_are_rejected_on_load() {
    let err = load_character(&DanglingMeshLoader, 4274.0).await.unwrap_err();
    assert!(matches!(err, PosecastError::AssetLoad(_)));
    assert!(err.to_string().contains("malformed"));
}

#[test]
fn mannequin_maps_every_bone() {
    let c = MannequinLoader::new().build(CharacterId::DEFAULT).unwrap();
    for bone in HumanBone::ALL {
        assert!(c.bone_node(bone).is_some(), "missing {bone:?}");
    }
    let bb = c.world_bounds().unwrap();
    assert!(bb.size().y > 1.6 && bb.size().y < 1.9);
    assert!(bb.min.y < 0.05);
}

#[test]
fn mannequin_faces_positive_z_after_root_turn() {
    let c = MannequinLoader::new().build(CharacterId::new(1).unwrap()).unwrap();
    let left = c.bone_world_position(HumanBone::LeftHand).unwrap();
    let right = c.bone_world_position(HumanBone::RightHand).unwrap();
    // Facing +Z, the character's left side is on world +X.
    assert!(left.x > 0.5 && right.x < -0.5);
    let eye = c.scene.find_by_name("eyeLeft").unwrap();
    assert!(c.scene.world_position(eye).unwrap().z > 0.1);
}

#[test]
fn expression_naming_alternates_by_id() {
    let odd = MannequinLoader::new().build(CharacterId::new(4273).unwrap()).unwrap();
    let even = MannequinLoader::new().build(CharacterId::DEFAULT).unwrap();
    let odd_em = odd.expressions.unwrap();
    let even_em = even.expressions.unwrap();
    assert!(odd_em.supports("blink") && odd_em.supports("happy"));
    assert!(even_em.supports("Blink") && even_em.supports("Joy"));
    assert!(!even_em.supports("blink"));
}

#[test]
fn omitted_bones_and_expressions() {
    let c = MannequinLoader::new()
        .without_bones([HumanBone::Chest, HumanBone::LeftHand])
        .without_expressions()
        .build(CharacterId::DEFAULT)
        .unwrap();
    assert!(c.bone_node(HumanBone::Chest).is_none());
    assert!(c.bone_node(HumanBone::LeftHand).is_none());
    assert!(c.bone_node(HumanBone::Head).is_some());
    assert!(c.expressions.is_none());
}

#[test]
fn tinting_is_deterministic_per_id() {
    let a = MannequinLoader::new().build(CharacterId::new(10).unwrap()).unwrap();
    let b = MannequinLoader::new().build(CharacterId::new(10).unwrap()).unwrap();
    let c = MannequinLoader::new().build(CharacterId::new(11).unwrap()).unwrap();
    assert_eq!(a.meshes[0].color, b.meshes[0].color);
    assert_ne!(a.meshes[1].color, c.meshes[1].color);
}

#[tokio::test]
async fn load_character_validates_before_loading() {
    let err = load_character(&FailingLoader, 0.0).await.unwrap_err();
    assert!(matches!(err, PosecastError::Validation(_)));
    let err = load_character(&FailingLoader, f64::NAN).await.unwrap_err();
    assert!(matches!(err, PosecastError::Validation(_)));
}

#[tokio::test]
async fn loader_failures_become_asset_load_errors() {
    let err = load_character(&FailingLoader, 12.0).await.unwrap_err();
    assert!(matches!(err, PosecastError::AssetLoad(_)));
    assert!(err.to_string().contains("12"));

    let ok = load_character(&MannequinLoader::new(), 4274.0).await.unwrap();
    assert_eq!(ok.id, CharacterId::DEFAULT);
}

#[test]
fn stale_tickets_are_rejected() {
    let mut tracker = LoadTracker::new();
    let first = tracker.begin(CharacterId::new(1).unwrap());
    let second = tracker.begin(CharacterId::new(2).unwrap());
    assert!(!tracker.is_current(&first));
    assert!(tracker.is_current(&second));
    tracker.cancel();
    assert!(!tracker.is_current(&second));
}
