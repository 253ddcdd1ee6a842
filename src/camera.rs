// First-person style camera driven by two Euler angles

use glam::{Mat4, Vec3, Vec4};

/// Vertical angle limit in degrees; keeps the camera away from the poles.
pub const MAX_VERTICAL_ANGLE: f32 = 85.0;

/// A perspective camera positioned in world space.
///
/// Angles are stored in degrees. A positive vertical angle looks down and a
/// positive horizontal angle turns towards +X, starting from a camera that
/// looks down -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    horizontal_angle: f32,
    vertical_angle: f32,
    field_of_view: f32,
    near_plane: f32,
    far_plane: f32,
    aspect_ratio: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            horizontal_angle: 0.0,
            vertical_angle: 0.0,
            field_of_view: 50.0,
            near_plane: 0.01,
            far_plane: 100.0,
            aspect_ratio: 4.0 / 3.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Moves the camera by a world-space delta.
    pub fn offset_position(&mut self, delta: Vec3) {
        self.position += delta;
    }

    pub fn horizontal_angle(&self) -> f32 {
        self.horizontal_angle
    }

    pub fn vertical_angle(&self) -> f32 {
        self.vertical_angle
    }

    /// Vertical field of view in degrees.
    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// # Panics
    /// Panics unless `0 < field_of_view < 180`.
    pub fn set_field_of_view(&mut self, field_of_view: f32) {
        assert!(
            field_of_view > 0.0 && field_of_view < 180.0,
            "field of view must be in (0, 180), got {field_of_view}"
        );
        self.field_of_view = field_of_view;
    }

    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    /// # Panics
    /// Panics unless `0 < near < far`.
    pub fn set_near_and_far_planes(&mut self, near_plane: f32, far_plane: f32) {
        assert!(near_plane > 0.0, "near plane must be positive, got {near_plane}");
        assert!(
            far_plane > near_plane,
            "far plane ({far_plane}) must be beyond the near plane ({near_plane})"
        );
        self.near_plane = near_plane;
        self.far_plane = far_plane;
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// # Panics
    /// Panics on a non-positive ratio.
    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        assert!(ratio > 0.0, "aspect ratio must be positive, got {ratio}");
        self.aspect_ratio = ratio;
    }

    /// Rotation-only matrix for the current angles (no translation).
    pub fn orientation(&self) -> Mat4 {
        Mat4::from_rotation_x(self.vertical_angle.to_radians())
            * Mat4::from_rotation_y(self.horizontal_angle.to_radians())
    }

    /// Adds to both angles. The vertical angle is clamped to
    /// `[-85, 85]` and the horizontal angle wrapped to `[0, 360)`.
    pub fn offset_orientation(&mut self, up_angle: f32, right_angle: f32) {
        self.vertical_angle += up_angle;
        self.horizontal_angle += right_angle;
        self.normalize_angles();
    }

    /// Points the camera at `target`, replacing the previous orientation.
    ///
    /// Looking at the camera's own position leaves the orientation unchanged.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(direction) = (target - self.position).try_normalize() else {
            return;
        };
        self.vertical_angle = (-direction.y).asin().to_degrees();
        self.horizontal_angle = -(-direction.x).atan2(-direction.z).to_degrees();
        self.normalize_angles();
    }

    /// Unit vector the camera is facing.
    pub fn forward(&self) -> Vec3 {
        self.camera_to_world(Vec3::NEG_Z)
    }

    pub fn right(&self) -> Vec3 {
        self.camera_to_world(Vec3::X)
    }

    pub fn up(&self) -> Vec3 {
        self.camera_to_world(Vec3::Y)
    }

    /// Perspective projection with a `[0, 1]` depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.field_of_view.to_radians(),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        )
    }

    /// World-to-camera matrix: `orientation * translation(-position)`.
    pub fn view(&self) -> Mat4 {
        self.orientation() * Mat4::from_translation(-self.position)
    }

    /// Combined `projection * view`.
    pub fn matrix(&self) -> Mat4 {
        self.projection() * self.view()
    }

    fn camera_to_world(&self, direction: Vec3) -> Vec3 {
        let rotated = self.orientation().inverse() * Vec4::from((direction, 0.0));
        rotated.truncate().normalize()
    }

    fn normalize_angles(&mut self) {
        self.horizontal_angle = crate::math::wrap_degrees(self.horizontal_angle);
        self.vertical_angle = self
            .vertical_angle
            .clamp(-MAX_VERTICAL_ANGLE, MAX_VERTICAL_ANGLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn pitch_clamps_at_limits() {
        let mut camera = Camera::new();
        camera.offset_orientation(80.0, 0.0);
        camera.offset_orientation(10.0, 0.0);
        assert_eq!(camera.vertical_angle(), 85.0);

        let mut camera = Camera::new();
        camera.offset_orientation(80.0, 0.0);
        camera.offset_orientation(-200.0, 0.0);
        assert_eq!(camera.vertical_angle(), -85.0);
    }

    #[test]
    fn yaw_wraps_independently_of_pitch() {
        let mut camera = Camera::new();
        camera.offset_orientation(200.0, 370.0);
        assert_eq!(camera.vertical_angle(), 85.0);
        assert_abs_diff_eq!(camera.horizontal_angle(), 10.0, epsilon = 1e-4);

        camera.offset_orientation(0.0, -20.0);
        assert_abs_diff_eq!(camera.horizontal_angle(), 350.0, epsilon = 1e-4);
    }

    #[test]
    fn look_at_negative_z_faces_forward() {
        let mut camera = Camera::new();
        camera.set_position(Vec3::ZERO);
        camera.look_at(Vec3::new(0.0, 0.0, -1.0));
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-5));
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn look_at_overwrites_previous_orientation() {
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(0.0, 2.0, 0.0));
        camera.offset_orientation(30.0, 100.0);
        camera.look_at(Vec3::new(3.0, 2.0, 0.0));
        assert_abs_diff_eq!(camera.vertical_angle(), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(camera.horizontal_angle(), 90.0, epsilon = 1e-4);
        assert!(camera.forward().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn positive_pitch_looks_down() {
        let mut camera = Camera::new();
        camera.offset_orientation(45.0, 0.0);
        let forward = camera.forward();
        assert!(forward.y < 0.0);
        assert_relative_eq!(forward.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn basis_vectors_stay_orthonormal() {
        let mut camera = Camera::new();
        camera.offset_orientation(-30.0, 215.0);
        let (f, r, u) = (camera.forward(), camera.right(), camera.up());
        assert_abs_diff_eq!(f.dot(r), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(f.dot(u), 0.0, epsilon = 1e-5);
        assert!(r.abs_diff_eq(f.cross(Vec3::Y).normalize(), 1e-5));
        assert!(u.abs_diff_eq(r.cross(f), 1e-5));
    }

    #[test]
    fn view_is_inverse_of_camera_placement() {
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(1.0, 2.0, 3.0));
        camera.offset_orientation(20.0, 40.0);
        let placement = Mat4::from_translation(camera.position()) * camera.orientation().inverse();
        assert!((camera.view() * placement).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        // The camera's own position maps to the view-space origin.
        let origin = camera.view().transform_point3(camera.position());
        assert!(origin.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn matrix_is_projection_times_view() {
        let mut camera = Camera::new();
        camera.set_near_and_far_planes(0.2, 100.0);
        camera.set_field_of_view(45.0);
        camera.set_aspect_ratio(1024.0 / 768.0);
        assert!(camera
            .matrix()
            .abs_diff_eq(camera.projection() * camera.view(), 1e-6));
    }

    #[test]
    #[should_panic]
    fn rejects_inverted_planes() {
        Camera::new().set_near_and_far_planes(10.0, 1.0);
    }

    #[test]
    #[should_panic]
    fn rejects_out_of_range_fov() {
        Camera::new().set_field_of_view(180.0);
    }
}
