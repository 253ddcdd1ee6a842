// Maps held controls to per-frame joint and camera deltas

use std::collections::HashSet;

use glam::{Vec2, Vec3};

use crate::config::MotionConfig;
use crate::math::{clamp_to_max_vertical, wrap_degrees};

/// Held controls that drive continuous motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    CameraForward,
    CameraBackward,
    CameraLeft,
    CameraRight,
    HeadTurnLeft,
    HeadTurnRight,
    HeadRaise,
    HeadLower,
    TorsoForward,
    TorsoBackward,
    TorsoTurnLeft,
    TorsoTurnRight,
    LeftArmRaise,
    LeftArmLower,
    RightArmRaise,
    RightArmLower,
    LeftWristRaise,
    LeftWristLower,
    RightWristRaise,
    RightWristLower,
}

/// Input state sampled once per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub pressed: HashSet<Control>,
    /// Pointer motion since the previous frame, in pixels
    pub pointer_delta: Vec2,
}

impl InputSnapshot {
    pub fn is_pressed(&self, control: Control) -> bool {
        self.pressed.contains(&control)
    }

    /// +1, -1 or 0 depending on which of the two controls is held.
    fn axis(&self, positive: Control, negative: Control) -> f32 {
        let mut value = 0.0;
        if self.is_pressed(positive) {
            value += 1.0;
        }
        if self.is_pressed(negative) {
            value -= 1.0;
        }
        value
    }
}

/// Requested change of every controllable joint, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointDeltas {
    pub torso_horizontal: f32,
    pub head_horizontal: f32,
    pub head_vertical: f32,
    pub left_arm_vertical: f32,
    pub right_arm_vertical: f32,
    pub left_wrist_vertical: f32,
    pub right_wrist_vertical: f32,
}

/// Everything the input asked for in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameDeltas {
    pub joints: JointDeltas,
    /// Signed distance the torso moves along its heading
    pub torso_advance: f32,
    /// Free-camera movement along (forward, right), in world units
    pub camera_move: Vec2,
    /// Free-camera (pitch, yaw) change in degrees
    pub camera_look: Vec2,
}

/// Current joint angles of the robot, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientations {
    pub torso_horizontal: f32,
    pub head_horizontal: f32,
    pub head_vertical: f32,
    pub left_arm_vertical: f32,
    pub right_arm_vertical: f32,
    pub left_wrist_vertical: f32,
    pub right_wrist_vertical: f32,
}

impl Orientations {
    /// Applies requested deltas: horizontal joints wrap into `[0, 360)` and
    /// hinge joints clamp into `[-max_vertical, max_vertical]`.
    ///
    /// Returns the deltas that actually took effect. For hinges this is the
    /// truncated amount; horizontal joints report the requested delta.
    pub fn apply(&mut self, deltas: &JointDeltas, max_vertical: f32) -> JointDeltas {
        let before = *self;

        self.torso_horizontal = wrap_degrees(self.torso_horizontal + deltas.torso_horizontal);
        self.head_horizontal = wrap_degrees(self.head_horizontal + deltas.head_horizontal);

        let hinge = |angle: f32, delta: f32| clamp_to_max_vertical(angle, delta, max_vertical);
        self.head_vertical = hinge(self.head_vertical, deltas.head_vertical);
        self.left_arm_vertical = hinge(self.left_arm_vertical, deltas.left_arm_vertical);
        self.right_arm_vertical = hinge(self.right_arm_vertical, deltas.right_arm_vertical);
        self.left_wrist_vertical = hinge(self.left_wrist_vertical, deltas.left_wrist_vertical);
        self.right_wrist_vertical = hinge(self.right_wrist_vertical, deltas.right_wrist_vertical);

        JointDeltas {
            torso_horizontal: deltas.torso_horizontal,
            head_horizontal: deltas.head_horizontal,
            head_vertical: self.head_vertical - before.head_vertical,
            left_arm_vertical: self.left_arm_vertical - before.left_arm_vertical,
            right_arm_vertical: self.right_arm_vertical - before.right_arm_vertical,
            left_wrist_vertical: self.left_wrist_vertical - before.left_wrist_vertical,
            right_wrist_vertical: self.right_wrist_vertical - before.right_wrist_vertical,
        }
    }
}

/// Turns one frame of input into deltas. Pure: only the elapsed time, the
/// input snapshot and the configured rates are read.
///
/// Camera motion is only produced when `free_camera` is set; in first person
/// the camera follows the robot's head instead.
pub fn compute_deltas(
    elapsed: f32,
    input: &InputSnapshot,
    motion: &MotionConfig,
    free_camera: bool,
) -> FrameDeltas {
    use Control::*;

    let step = motion.angular_speed * elapsed;
    let joints = JointDeltas {
        torso_horizontal: step * input.axis(TorsoTurnLeft, TorsoTurnRight),
        head_horizontal: step * input.axis(HeadTurnLeft, HeadTurnRight),
        head_vertical: step * input.axis(HeadRaise, HeadLower),
        left_arm_vertical: step * input.axis(LeftArmRaise, LeftArmLower),
        right_arm_vertical: step * input.axis(RightArmRaise, RightArmLower),
        left_wrist_vertical: step * input.axis(LeftWristRaise, LeftWristLower),
        right_wrist_vertical: step * input.axis(RightWristRaise, RightWristLower),
    };

    let distance = motion.movement_speed * elapsed;
    let (camera_move, camera_look) = if free_camera {
        (
            Vec2::new(
                distance * input.axis(CameraForward, CameraBackward),
                distance * input.axis(CameraRight, CameraLeft),
            ),
            // Pointer y drives pitch, pointer x drives yaw.
            Vec2::new(input.pointer_delta.y, input.pointer_delta.x) * motion.mouse_sensitivity,
        )
    } else {
        (Vec2::ZERO, Vec2::ZERO)
    };

    FrameDeltas {
        joints,
        torso_advance: distance * input.axis(TorsoForward, TorsoBackward),
        camera_move,
        camera_look,
    }
}

/// World-space displacement for moving `distance` along a heading given in degrees.
///
/// Heading 0 faces +X and positive headings turn towards -Z.
pub fn heading_translation(distance: f32, heading_degrees: f32) -> Vec3 {
    let heading = heading_degrees.to_radians();
    Vec3::new(distance * heading.cos(), 0.0, -distance * heading.sin())
}
