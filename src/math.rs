// Math utilities for the robot scene

use glam::{Mat4, Vec3};

/// Local transform of a posable instance, kept as three separate matrices.
///
/// The composed matrix is always rebuilt from the parts, so a caller can
/// replace `rotate` every frame without touching `translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: Mat4,
    pub rotate: Mat4,
    pub translate: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Create a new transform
    pub fn new(scale: Mat4, rotate: Mat4, translate: Mat4) -> Self {
        Self {
            scale,
            rotate,
            translate,
        }
    }

    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            scale: Mat4::IDENTITY,
            rotate: Mat4::IDENTITY,
            translate: Mat4::IDENTITY,
        }
    }

    /// Identity transform translated by `offset`.
    pub fn from_translation(offset: Vec3) -> Self {
        Self {
            translate: Mat4::from_translation(offset),
            ..Self::identity()
        }
    }

    /// Generate transformation matrix: scale first, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        self.translate * self.rotate * self.scale
    }

    /// Moves the transform by a world-space delta, applied after the current translation.
    pub fn offset_translation(&mut self, delta: Vec3) {
        self.translate = Mat4::from_translation(delta) * self.translate;
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Adds `addition` to `angle` and clamps the result into `[-max, max]`.
///
/// An overshooting delta is truncated at the bound rather than dropped.
pub fn clamp_to_max_vertical(angle: f32, addition: f32, max: f32) -> f32 {
    (angle + addition).clamp(-max, max)
}

/// Rotation about the Y axis by an angle in degrees.
pub fn yaw_matrix(degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

/// Rotation about the Z axis by an angle in degrees.
pub fn hinge_matrix(degrees: f32) -> Mat4 {
    Mat4::from_rotation_z(degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_transform_yields_identity_matrix() {
        assert_eq!(Transform::identity().matrix(), Mat4::IDENTITY);
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn composed_matrix_is_translate_rotate_scale() {
        let scale = Mat4::from_scale(Vec3::new(2.0, 3.0, 0.5));
        let rotate = Mat4::from_rotation_y(0.7) * Mat4::from_rotation_z(-0.3);
        let translate = Mat4::from_translation(Vec3::new(4.0, -1.0, 2.5));
        let t = Transform::new(scale, rotate, translate);

        let expected = translate * rotate * scale;
        assert!(t.matrix().abs_diff_eq(expected, 1e-6));

        let reversed = scale * rotate * translate;
        assert!(!t.matrix().abs_diff_eq(reversed, 1e-3));
    }

    #[test]
    fn scale_applies_before_translation() {
        let t = Transform::new(
            Mat4::from_scale(Vec3::splat(2.0)),
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
        );
        let p = t.matrix().transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!(p.abs_diff_eq(Vec3::new(3.0, 2.0, 2.0), 1e-6));
    }

    #[test]
    fn offset_translation_accumulates() {
        let mut t = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        t.offset_translation(Vec3::new(1.0, 0.0, 0.0));
        t.offset_translation(Vec3::new(0.5, 0.0, -1.0));
        let p = t.matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.5, 2.0, -1.0), 1e-6));
    }

    #[test]
    fn wrap_keeps_angles_non_negative() {
        let a = wrap_degrees(0.0 + 370.0);
        assert_abs_diff_eq!(a, 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_degrees(a - 10.0), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_degrees(-30.0), 330.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_degrees(720.0), 0.0, epsilon = 1e-4);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn vertical_clamp_truncates_overshoot() {
        assert_eq!(clamp_to_max_vertical(55.0, 20.0, 60.0), 60.0);
        assert_eq!(clamp_to_max_vertical(-55.0, -20.0, 60.0), -60.0);
        assert_eq!(clamp_to_max_vertical(10.0, 5.0, 60.0), 15.0);
    }

    #[test]
    fn hinge_rotates_about_z() {
        let p = hinge_matrix(90.0).transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, 1e-6));
        let q = yaw_matrix(90.0).transform_point3(Vec3::X);
        assert!(q.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }
}
