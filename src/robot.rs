// Room and robot rig: scene construction and per-frame posing

use glam::{Mat4, Vec3};

use crate::error::AssetError;
use crate::math::{hinge_matrix, yaw_matrix, Transform};
use crate::model::{ModelId, ModelRegistry};
use crate::pose::Orientations;
use crate::scene::{ModelInstance, Scene, SceneNode};

/// Room parts, each a root of the scene. Node and model names match.
pub const ROOM_PARTS: [&str; 6] = [
    "Ceiling",
    "Floor",
    "Left_Wall",
    "Right_Wall",
    "Front_Wall",
    "Back_Wall",
];

pub const TORSO: &str = "Torso";
pub const HEAD: &str = "Head";
pub const LEFT_ARM: &str = "Left_Arm";
pub const LEFT_WRIST: &str = "Left_Wrist";
pub const RIGHT_ARM: &str = "Right_Arm";
pub const RIGHT_WRIST: &str = "Right_Wrist";
pub const LEFT_LEG: &str = "Left_Leg";
pub const RIGHT_LEG: &str = "Right_Leg";

/// Object names of the robot parts inside the robot geometry file.
pub const ROBOT_MODELS: [&str; 8] = [
    "Torso", "Head", "L_Arm", "L_Wrist", "R_Arm", "R_Wrist", "L_Leg", "R_Leg",
];

/// Where the torso stands when the scene is built.
pub const TORSO_START: Vec3 = Vec3::new(0.0, 2.0, 0.0);

// Joint offsets relative to the parent part, as authored in the modelling tool.
const HEAD_OFFSET: Vec3 = Vec3::new(-0.0050, 1.6611, -0.0563);
const LEFT_ARM_OFFSET: Vec3 = Vec3::new(-0.0672, 0.2466, -1.4236);
const RIGHT_ARM_OFFSET: Vec3 = Vec3::new(-0.0580, 0.2572, 1.4286);
const WRIST_OFFSET: Vec3 = Vec3::new(-0.0092, -1.2856, -0.0097);
const LEFT_LEG_OFFSET: Vec3 = Vec3::new(0.0881, -1.8541, -0.5452);
const RIGHT_LEG_OFFSET: Vec3 = Vec3::new(0.0881, -1.8537, 0.5387);

fn model(registry: &ModelRegistry, name: &str) -> Result<ModelId, AssetError> {
    registry
        .find(name)
        .ok_or_else(|| AssetError::MissingModel(name.to_string()))
}

fn part(registry: &ModelRegistry, name: &str, offset: Vec3) -> Result<SceneNode, AssetError> {
    Ok(SceneNode::new(ModelInstance::with_transform(
        model(registry, name)?,
        Transform::from_translation(offset),
    )))
}

/// Builds the torso subtree with every limb at its rest pose.
pub fn build_robot(registry: &ModelRegistry) -> Result<SceneNode, AssetError> {
    let left_arm = part(registry, "L_Arm", LEFT_ARM_OFFSET)?
        .with_child(LEFT_WRIST, part(registry, "L_Wrist", WRIST_OFFSET)?);
    let right_arm = part(registry, "R_Arm", RIGHT_ARM_OFFSET)?
        .with_child(RIGHT_WRIST, part(registry, "R_Wrist", WRIST_OFFSET)?);

    Ok(part(registry, "Torso", TORSO_START)?
        .with_child(HEAD, part(registry, "Head", HEAD_OFFSET)?)
        .with_child(LEFT_ARM, left_arm)
        .with_child(RIGHT_ARM, right_arm)
        .with_child(LEFT_LEG, part(registry, "L_Leg", LEFT_LEG_OFFSET)?)
        .with_child(RIGHT_LEG, part(registry, "R_Leg", RIGHT_LEG_OFFSET)?))
}

/// Builds the full scene: the room parts followed by the robot.
pub fn build_scene(registry: &ModelRegistry) -> Result<Scene, AssetError> {
    let mut scene = Scene::new();
    for name in ROOM_PARTS {
        scene.add_root(name, part(registry, name, Vec3::ZERO)?);
    }
    scene.add_root(TORSO, build_robot(registry)?);
    log::debug!("scene built with {} roots", scene.roots().count());
    Ok(scene)
}

fn node<'a>(scene: &'a mut Scene, path: &[&str]) -> &'a mut SceneNode {
    scene
        .node_mut(path)
        .unwrap_or_else(|| panic!("robot node {path:?} missing from scene"))
}

/// Writes the joint angles into the rig and moves the torso by `torso_step`.
///
/// Rotations are rebuilt from the absolute angles. The torso translation is
/// path-integrated: the step is applied on top of the previous translation.
///
/// # Panics
/// Panics if the scene was not built by [`build_scene`].
pub fn apply_pose(scene: &mut Scene, orientations: &Orientations, torso_step: Vec3) {
    let torso = node(scene, &[TORSO]).transform_mut();
    torso.offset_translation(torso_step);
    torso.rotate = yaw_matrix(orientations.torso_horizontal);

    node(scene, &[TORSO, HEAD]).transform_mut().rotate =
        yaw_matrix(orientations.head_horizontal) * hinge_matrix(orientations.head_vertical);

    node(scene, &[TORSO, LEFT_ARM]).transform_mut().rotate =
        hinge_matrix(orientations.left_arm_vertical);
    node(scene, &[TORSO, LEFT_ARM, LEFT_WRIST]).transform_mut().rotate =
        hinge_matrix(orientations.left_wrist_vertical);
    node(scene, &[TORSO, RIGHT_ARM]).transform_mut().rotate =
        hinge_matrix(orientations.right_arm_vertical);
    node(scene, &[TORSO, RIGHT_ARM, RIGHT_WRIST]).transform_mut().rotate =
        hinge_matrix(orientations.right_wrist_vertical);
}

/// World matrix of the head: torso local times head local.
///
/// # Panics
/// Panics if the scene has no torso with a head.
pub fn head_world_transform(scene: &Scene) -> Mat4 {
    let torso = scene
        .root(TORSO)
        .unwrap_or_else(|| panic!("scene has no '{TORSO}' root"));
    let head = torso
        .child(HEAD)
        .unwrap_or_else(|| panic!("torso has no '{HEAD}' child"));
    torso.transform().matrix() * head.transform().matrix()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::light::Light;
    use crate::model::Model;
    use crate::obj::MeshData;
    use crate::scene::tests::RecordingBackend;

    pub(crate) fn test_registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        for name in ROOM_PARTS.iter().chain(ROBOT_MODELS.iter()) {
            registry.insert(Model {
                name: name.to_string(),
                mesh: MeshData::default(),
                material: Default::default(),
                texture: None,
            });
        }
        registry
    }

    #[test]
    fn scene_has_room_and_robot_roots() {
        let scene = build_scene(&test_registry()).unwrap();
        let roots: Vec<&str> = scene.roots().map(|(name, _)| name).collect();
        assert_eq!(
            roots,
            vec!["Ceiling", "Floor", "Left_Wall", "Right_Wall", "Front_Wall", "Back_Wall", "Torso"]
        );
        let torso = scene.root(TORSO).unwrap();
        assert_eq!(torso.children().count(), 5);
        assert!(torso.child(LEFT_ARM).unwrap().child(LEFT_WRIST).is_some());
    }

    #[test]
    fn missing_model_is_reported() {
        let mut registry = ModelRegistry::new();
        registry.insert(Model {
            name: "Ceiling".to_string(),
            mesh: MeshData::default(),
            material: Default::default(),
            texture: None,
        });
        let err = build_scene(&registry).unwrap_err();
        assert!(matches!(err, AssetError::MissingModel(name) if name == "Floor"));
    }

    #[test]
    fn every_node_is_drawn_once() {
        let registry = test_registry();
        let scene = build_scene(&registry).unwrap();
        let mut backend = RecordingBackend::default();
        scene.render(&Camera::new(), &Light::default(), &mut backend);
        assert_eq!(backend.draws.len(), ROOM_PARTS.len() + ROBOT_MODELS.len());
    }

    #[test]
    fn wrist_world_position_includes_arm_and_torso() {
        let registry = test_registry();
        let scene = build_scene(&registry).unwrap();
        let mut backend = RecordingBackend::default();
        scene.render(&Camera::new(), &Light::default(), &mut backend);

        let wrist = backend
            .world_of(registry.find("L_Wrist").unwrap())
            .transform_point3(Vec3::ZERO);
        assert!(wrist.abs_diff_eq(TORSO_START + LEFT_ARM_OFFSET + WRIST_OFFSET, 1e-5));
    }

    #[test]
    fn torso_moves_along_path_and_rotation_is_absolute() {
        let mut scene = build_scene(&test_registry()).unwrap();
        let o = Orientations {
            torso_horizontal: 90.0,
            ..Default::default()
        };
        apply_pose(&mut scene, &o, Vec3::new(1.0, 0.0, 0.0));
        apply_pose(&mut scene, &o, Vec3::new(0.0, 0.0, -1.0));

        let torso = scene.root(TORSO).unwrap().transform();
        let position = torso.translate.transform_point3(Vec3::ZERO);
        assert!(position.abs_diff_eq(TORSO_START + Vec3::new(1.0, 0.0, -1.0), 1e-6));
        assert!(torso.rotate.abs_diff_eq(yaw_matrix(90.0), 1e-6));
    }

    #[test]
    fn hinge_rotation_swings_wrist() {
        let registry = test_registry();
        let mut scene = build_scene(&registry).unwrap();
        let o = Orientations {
            left_arm_vertical: 90.0,
            ..Default::default()
        };
        apply_pose(&mut scene, &o, Vec3::ZERO);

        let mut backend = RecordingBackend::default();
        scene.render(&Camera::new(), &Light::default(), &mut backend);
        let wrist = backend
            .world_of(registry.find("L_Wrist").unwrap())
            .transform_point3(Vec3::ZERO);
        // Rotating the arm by 90 degrees about Z maps the wrist offset (x, y, z) to (-y, x, z).
        let swung = Vec3::new(-WRIST_OFFSET.y, WRIST_OFFSET.x, WRIST_OFFSET.z);
        assert!(wrist.abs_diff_eq(TORSO_START + LEFT_ARM_OFFSET + swung, 1e-5));
    }

    #[test]
    fn head_transform_composes_torso_and_head() {
        let mut scene = build_scene(&test_registry()).unwrap();
        let o = Orientations {
            torso_horizontal: 180.0,
            ..Default::default()
        };
        apply_pose(&mut scene, &o, Vec3::ZERO);
        let head = head_world_transform(&scene).transform_point3(Vec3::ZERO);
        let expected = TORSO_START + Vec3::new(-HEAD_OFFSET.x, HEAD_OFFSET.y, -HEAD_OFFSET.z);
        assert!(head.abs_diff_eq(expected, 1e-5));
    }
}
