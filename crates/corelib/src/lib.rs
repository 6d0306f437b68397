//! Core types: math re-exports, placement Transform, fly Camera.

pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, vec3};

pub mod camera;
pub mod transform;

pub use camera::{Camera, MoveDirection};
pub use transform::Transform;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_camera_places_model_at_origin() {
        let cam = Camera::default();
        assert_eq!(cam.model_matrix(), Transform::identity().matrix());
        assert_eq!(cam.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn origin_lands_in_front_of_default_camera() {
        let cam = Camera::default();
        let clip = cam.projection_matrix(1600, 1024) * cam.view_matrix() * Vec3::ZERO.extend(1.0);
        assert!(clip.to_array().iter().all(|f| f.is_finite()));
        // Three units ahead, inside the [0, 1] depth range.
        let ndc = clip.truncate() / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn placement_translation_lives_in_last_column() {
        let t = Transform::from_trs(vec3(1.0, 2.0, 3.0), Vec3::ZERO, vec3(2.0, 2.0, 2.0));
        let m = t.matrix();
        assert_eq!(m.w_axis, vec3(1.0, 2.0, 3.0).extend(1.0));
        assert_relative_eq!(m.x_axis.x, 2.0);
    }
}
