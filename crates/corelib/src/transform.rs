use crate::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Placement transform with non-uniform scale (Euler XYZ, radians).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        let q = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, q, self.translation)
    }

    /// Matrix that carries normals through [`Transform::matrix`]
    /// (inverse transpose of the upper 3x3).
    pub fn normal_matrix(&self) -> Mat3 {
        normal_matrix(&self.matrix())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Inverse transpose of the linear part of `m`. Singular matrices
/// (zero scale on some axis) fall back to the plain linear part.
pub fn normal_matrix(m: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*m);
    if linear.determinant().abs() <= f32::EPSILON {
        return linear;
    }
    linear.inverse().transpose()
}
