// Application context: everything one frame reads and updates

use glam::Vec3;

use crate::camera::Camera;
use crate::config::{CameraConfig, Config};
use crate::error::AssetError;
use crate::input::Action;
use crate::light::Light;
use crate::model::ModelRegistry;
use crate::pose::{compute_deltas, heading_translation, InputSnapshot, Orientations};
use crate::robot;
use crate::scene::{RenderBackend, Scene};

/// Owns the scene, camera, light and robot pose.
///
/// Created once by `main` and handed to the renderer; there is no global state.
pub struct Application {
    config: Config,
    models: ModelRegistry,
    scene: Scene,
    camera: Camera,
    light: Light,
    orientations: Orientations,
    camera_in_head: bool,
}

impl Application {
    /// Builds the scene from loaded models and places the camera at its default pose.
    pub fn new(config: Config, models: ModelRegistry) -> Result<Self, AssetError> {
        let scene = robot::build_scene(&models)?;

        let mut camera = Camera::new();
        camera.set_near_and_far_planes(config.camera.near_plane, config.camera.far_plane);
        camera.set_field_of_view(config.camera.field_of_view);
        camera.set_aspect_ratio(config.window_width as f32 / config.window_height as f32);
        reset_camera(&mut camera, &config.camera);

        let light = config.light.to_light();

        Ok(Self {
            config,
            models,
            scene,
            camera,
            light,
            orientations: Orientations::default(),
            camera_in_head: false,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn light(&self) -> &Light {
        &self.light
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn orientations(&self) -> &Orientations {
        &self.orientations
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_first_person(&self) -> bool {
        self.camera_in_head
    }

    /// Called when the framebuffer changes size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.camera.set_aspect_ratio(width as f32 / height as f32);
        }
    }

    /// Runs a one-shot action. Returns `false` when the application should exit.
    pub fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::ToggleFirstPerson => self.toggle_first_person(),
            Action::AmbientUp => self.light.adjust_ambient(self.config.motion.ambient_step),
            Action::AmbientDown => self.light.adjust_ambient(-self.config.motion.ambient_step),
            Action::Exit => return false,
        }
        true
    }

    /// Advances the robot and camera by one frame.
    ///
    /// All joint and camera state is settled here, before the frame is drawn.
    pub fn update(&mut self, elapsed: f32, input: &InputSnapshot) {
        let motion = self.config.motion;
        let deltas = compute_deltas(elapsed, input, &motion, !self.camera_in_head);

        if !self.camera_in_head {
            let movement = self.camera.forward() * deltas.camera_move.x
                + self.camera.right() * deltas.camera_move.y;
            self.camera.offset_position(movement);
            self.camera
                .offset_orientation(deltas.camera_look.x, deltas.camera_look.y);
        }

        let applied = self
            .orientations
            .apply(&deltas.joints, motion.max_vertical_angle);
        let torso_step = heading_translation(deltas.torso_advance, self.orientations.torso_horizontal);
        robot::apply_pose(&mut self.scene, &self.orientations, torso_step);

        if self.camera_in_head {
            self.camera.offset_position(torso_step);
            self.camera.offset_orientation(
                -applied.head_vertical,
                -(applied.torso_horizontal + applied.head_horizontal),
            );
        }
    }

    /// Switches between the free camera and the robot's point of view.
    pub fn toggle_first_person(&mut self) {
        self.camera_in_head = !self.camera_in_head;

        if self.camera_in_head {
            let head_position = robot::head_world_transform(&self.scene).transform_point3(Vec3::ZERO);
            self.camera.set_position(head_position);
            self.camera.look_at(head_position + Vec3::NEG_Z);

            // Heading 0 faces +X, which is a quarter turn right of the camera's -Z.
            let heading = self.orientations.torso_horizontal + self.orientations.head_horizontal;
            self.camera
                .offset_orientation(-self.orientations.head_vertical, 90.0 - heading);
            log::info!("camera attached to robot head");
        } else {
            reset_camera(&mut self.camera, &self.config.camera);
            log::info!("camera detached from robot head");
        }
    }

    /// Draws the whole scene through `backend`.
    pub fn render(&self, backend: &mut dyn RenderBackend) {
        self.scene.render(&self.camera, &self.light, backend);
    }
}

fn reset_camera(camera: &mut Camera, defaults: &CameraConfig) {
    camera.set_position(defaults.position());
    camera.look_at(defaults.look_at());
}
