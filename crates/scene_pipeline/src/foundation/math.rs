//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph and renderers.
//! All matrices follow the OpenGL convention: right-handed, column vectors,
//! cameras look down -Z and clip-space depth spans [-1, 1].

pub use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection matrix (`fov_y` in radians)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an orthographic projection matrix
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Translation column of an affine matrix
    fn translation_part(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self.m14, self.m24, self.m34)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_translation_part() {
        let m = Mat4::new_translation(&Vec3::new(1.0, -2.0, 3.0));
        assert_relative_eq!(m.translation_part(), Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_look_at_maps_target_onto_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let p = view.transform_point(&Point3::origin());
        assert_relative_eq!(p.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_degree_conversion() {
        assert_relative_eq!(utils::deg_to_rad(180.0), constants::PI);
        assert_relative_eq!(utils::rad_to_deg(constants::HALF_PI), 90.0);
    }
}
