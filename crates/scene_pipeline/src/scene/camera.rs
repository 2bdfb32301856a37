//! Cameras and per-pass camera views

use nalgebra::Isometry3;

use crate::foundation::math::{utils::deg_to_rad, Mat4, Mat4Ext, Point3, Vec3};
use crate::scene::bounds::Frustum;
use crate::scene::SceneError;

/// Projection parameters of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection (`fov_y` in degrees)
    Perspective {
        /// Vertical field of view in degrees
        fov_y: f32,
        /// Width / height
        aspect: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
    /// Orthographic projection
    Orthographic {
        /// Left clip plane
        left: f32,
        /// Right clip plane
        right: f32,
        /// Bottom clip plane
        bottom: f32,
        /// Top clip plane
        top: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
    /// Six 90° faces around the camera position
    Cube {
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
}

impl Projection {
    /// Projection matrix (for `Cube`, the matrix shared by all six faces)
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective { fov_y, aspect, near, far } => {
                Mat4::perspective(deg_to_rad(fov_y), aspect, near, far)
            }
            Self::Orthographic { left, right, bottom, top, near, far } => {
                Mat4::orthographic(left, right, bottom, top, near, far)
            }
            Self::Cube { near, far } => Mat4::perspective(deg_to_rad(90.0), 1.0, near, far),
        }
    }

    /// Near clip distance
    pub fn near(&self) -> f32 {
        match *self {
            Self::Perspective { near, .. } | Self::Orthographic { near, .. } | Self::Cube { near, .. } => near,
        }
    }

    /// Far clip distance
    pub fn far(&self) -> f32 {
        match *self {
            Self::Perspective { far, .. } | Self::Orthographic { far, .. } | Self::Cube { far, .. } => far,
        }
    }
}

/// Camera payload of a scene node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Projection parameters
    pub projection: Projection,
}

impl Camera {
    /// Perspective camera (`fov_y` in degrees)
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective { fov_y, aspect, near, far },
        }
    }

    /// Orthographic camera
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic { left, right, bottom, top, near, far },
        }
    }

    /// Cube camera
    pub fn cube(near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Cube { near, far },
        }
    }

    /// View of this camera placed by `world_transform`
    pub fn view(&self, world_transform: &Mat4) -> Result<CameraView, SceneError> {
        let view = world_transform.try_inverse().ok_or(SceneError::NotInvertible)?;
        Ok(CameraView {
            projection: self.projection.matrix(),
            view,
            inverse_view: *world_transform,
            near: self.projection.near(),
            far: self.projection.far(),
        })
    }
}

/// Face orientations (direction, up) of a cube camera: +X, -X, +Y, -Y, +Z, -Z
fn cube_face_axes() -> [(Vec3, Vec3); 6] {
    [
        (Vec3::x(), -Vec3::y()),
        (-Vec3::x(), -Vec3::y()),
        (Vec3::y(), Vec3::z()),
        (-Vec3::y(), -Vec3::z()),
        (Vec3::z(), -Vec3::y()),
        (-Vec3::z(), -Vec3::y()),
    ]
}

/// Everything a render pass needs to know about its camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
    near: f32,
    far: f32,
}

impl CameraView {
    /// Build from explicit matrices; `view` must be invertible
    pub fn new(projection: Mat4, view: Mat4, near: f32, far: f32) -> Result<Self, SceneError> {
        let inverse_view = view.try_inverse().ok_or(SceneError::NotInvertible)?;
        Ok(Self {
            projection,
            view,
            inverse_view,
            near,
            far,
        })
    }

    /// Camera at `eye` looking at `target`
    pub fn look_at(projection: &Projection, eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let isometry = Isometry3::look_at_rh(&Point3::from(eye), &Point3::from(target), &up);
        Self {
            projection: projection.matrix(),
            view: isometry.to_homogeneous(),
            inverse_view: isometry.inverse().to_homogeneous(),
            near: projection.near(),
            far: projection.far(),
        }
    }

    /// The six 90° views of a cube camera at `position`
    pub fn cube_faces(position: Vec3, near: f32, far: f32) -> [CameraView; 6] {
        let projection = Projection::Cube { near, far };
        cube_face_axes().map(|(direction, up)| Self::look_at(&projection, position, position + direction, up))
    }

    /// Projection matrix
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// View matrix (world to eye)
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Combined projection × view
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Near clip distance
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Eye to world transform
    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// World-space eye position
    pub fn eye_position(&self) -> Vec3 {
        self.inverse_view().translation_part()
    }

    /// World-space frustum
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_is_inverse_of_world() {
        let camera = Camera::perspective(90.0, 1.0, 0.1, 100.0);
        let world = Mat4::new_translation(&Vec3::new(0.0, 2.0, 5.0));
        let view = camera.view(&world).unwrap();

        assert_relative_eq!(view.eye_position(), Vec3::new(0.0, 2.0, 5.0), epsilon = 1e-5);
        assert_relative_eq!(view.near(), 0.1);
        assert_relative_eq!(view.far(), 100.0);
    }

    #[test]
    fn test_singular_world_transform() {
        let camera = Camera::perspective(60.0, 1.0, 0.1, 10.0);
        assert!(matches!(
            camera.view(&Mat4::zeros()),
            Err(SceneError::NotInvertible)
        ));
    }

    #[test]
    fn test_frustum_follows_camera() {
        let camera = Camera::perspective(90.0, 1.0, 0.1, 100.0);
        let world = Mat4::new_translation(&Vec3::new(0.0, 0.0, 50.0));
        let frustum = camera.view(&world).unwrap().frustum();

        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, 40.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 60.0)));
    }

    #[test]
    fn test_cube_faces_look_along_axes() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let faces = CameraView::cube_faces(position, 0.1, 50.0);

        for (face, (direction, _)) in faces.iter().zip(cube_face_axes().iter()) {
            let ahead = face.view().transform_point(&Point3::from(position + direction * 5.0));
            assert_relative_eq!(ahead.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-4);
            assert!(face.frustum().contains_point(position + direction * 5.0));
        }
    }

    #[test]
    fn test_orthographic_frustum() {
        let camera = Camera::orthographic(-10.0, 10.0, -10.0, 10.0, 0.1, 20.0);
        let frustum = camera.view(&Mat4::identity()).unwrap().frustum();
        assert!(frustum.contains_point(Vec3::new(9.0, -9.0, -19.0)));
        assert!(!frustum.contains_point(Vec3::new(11.0, 0.0, -5.0)));
    }

    #[test]
    fn test_explicit_view_must_be_invertible() {
        let projection = Mat4::perspective(deg_to_rad(60.0), 1.0, 0.1, 10.0);
        assert!(matches!(
            CameraView::new(projection, Mat4::zeros(), 0.1, 10.0),
            Err(SceneError::NotInvertible)
        ));

        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -4.0));
        let camera = CameraView::new(projection, view, 0.1, 10.0).unwrap();
        assert_relative_eq!(camera.eye_position(), Vec3::new(0.0, 0.0, 4.0), epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_inverse_matches_matrix_inverse() {
        let projection = Projection::Perspective {
            fov_y: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 10.0,
        };
        let eye = Vec3::new(3.0, 4.0, 5.0);
        let view = CameraView::look_at(&projection, eye, Vec3::zeros(), Vec3::y());

        assert_relative_eq!(view.inverse_view(), view.view().try_inverse().unwrap(), epsilon = 1e-5);
        assert_relative_eq!(view.eye_position(), eye, epsilon = 1e-5);
    }
}
