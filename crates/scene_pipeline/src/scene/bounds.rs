//! Bounding volumes and the view frustum
//!
//! Volumes used by the cull visitor: axis-aligned and oriented boxes for
//! meshes, spheres for lights, and the six-plane frustum they are tested
//! against.

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box enclosing all points, `None` for an empty slice
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::new(*first, *first), |acc, p| acc.include(*p)))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// Grow the box to include a point
    #[must_use]
    pub fn include(self, point: Vec3) -> Self {
        Self {
            min: self.min.inf(&point),
            max: self.max.sup(&point),
        }
    }

    /// Union of two boxes
    #[must_use]
    pub fn merge(&self, other: &AABB) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Axis-aligned box enclosing this box after an affine transform
    ///
    /// Arvo's method: per output axis, accumulate the min/max contribution of
    /// each matrix entry instead of transforming all eight corners.
    #[must_use]
    pub fn transform(&self, m: &Mat4) -> Self {
        let translation = Vec3::new(m.m14, m.m24, m.m34);
        let mut min = translation;
        let mut max = translation;

        for row in 0..3 {
            for col in 0..3 {
                let a = m[(row, col)] * self.min[col];
                let b = m[(row, col)] * self.max[col];
                min[row] += a.min(b);
                max[row] += a.max(b);
            }
        }

        Self { min, max }
    }
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OBB {
    /// Box center
    pub center: Vec3,
    /// Unit axes of the box
    pub axes: [Vec3; 3],
    /// Half-size along each axis
    pub half_extents: Vec3,
}

impl OBB {
    /// Oriented box of an object-space AABB placed by `transform`
    pub fn from_aabb(aabb: &AABB, transform: &Mat4) -> Self {
        let center = transform.transform_point(&Point3::from(aabb.center())).coords;
        let extents = aabb.extents();
        let mut axes = [Vec3::x(), Vec3::y(), Vec3::z()];
        let mut half_extents = Vec3::zeros();

        for (i, axis) in axes.iter_mut().enumerate() {
            let column = transform.fixed_view::<3, 1>(0, i).into_owned();
            let scale = column.norm();
            if scale > f32::EPSILON {
                *axis = column / scale;
            }
            half_extents[i] = extents[i] * scale;
        }

        Self { center, axes, half_extents }
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let [u, v, w] = self.axes;
        let e = self.half_extents;
        let mut corners = [Vec3::zeros(); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner = self.center + u * (sx * e.x) + v * (sy * e.y) + w * (sz * e.z);
        }
        corners
    }

    /// Projected radius of the box onto a direction
    fn projected_radius(&self, direction: &Vec3) -> f32 {
        self.axes
            .iter()
            .zip(self.half_extents.iter())
            .map(|(axis, extent)| extent * axis.dot(direction).abs())
            .sum()
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    ///
    /// A zero-length normal yields the degenerate plane that every point
    /// lies on.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        normal.try_normalize(f32::EPSILON).map_or_else(Self::degenerate, |normal| Self { normal, distance })
    }

    fn degenerate() -> Self {
        Self {
            normal: Vec3::zeros(),
            distance: 0.0,
        }
    }

    /// Plane from raw coefficients `ax + by + cz + d`, normalized
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.norm();
        if length <= f32::EPSILON {
            return Self::degenerate();
        }
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Index of each frustum plane in [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    /// x >= -w
    Left = 0,
    /// x <= w
    Right = 1,
    /// y >= -w
    Bottom = 2,
    /// y <= w
    Top = 3,
    /// z >= -w
    Near = 4,
    /// z <= w
    Far = 5,
}

/// Frustum for visibility culling
///
/// Six inward-facing half-spaces; a point is inside when its signed distance
/// to every plane is non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a projection-view matrix
    ///
    /// Gribb-Hartmann extraction. Planes live in the space the matrix maps
    /// from: pass `projection * view` for world-space planes, `projection`
    /// alone for eye-space planes.
    pub fn from_matrix(m: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { m.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Access a single plane
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// Check if a point lies inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        // outside as soon as the corner furthest along a plane normal is behind it
        self.planes.iter().all(|plane| {
            let corner = aabb
                .min
                .zip_zip_map(&aabb.max, &plane.normal, |min, max, n| if n >= 0.0 { max } else { min });
            plane.distance_to_point(corner) >= 0.0
        })
    }

    /// Check if an oriented box is inside or intersects the frustum
    pub fn intersects_obb(&self, obb: &OBB) -> bool {
        self.planes.iter().all(|plane| {
            plane.distance_to_point(obb.center) >= -obb.projected_radius(&plane.normal)
        })
    }

    /// Check if a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }
}
