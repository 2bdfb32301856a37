//! Meshes, geometry and materials
//!
//! A [`Mesh`] pairs a shared [`Geometry`] with an ordered list of shared
//! [`Material`]s. Materials carry a process-unique [`MaterialId`] that the
//! render-bin sort uses to keep same-material draws adjacent.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::TextureHandle;
use crate::render::shader_cache::ShaderFeatures;
use crate::scene::bounds::{AABB, OBB};

/// Unique material identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    fn next() -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Texture slots of a material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    /// Base color map
    pub albedo: Option<TextureHandle>,
    /// Tangent-space normal map
    pub normal: Option<TextureHandle>,
    /// Specular map
    pub specular: Option<TextureHandle>,
    /// Roughness/metalness map
    pub roughness: Option<TextureHandle>,
    /// Ambient occlusion map
    pub ao: Option<TextureHandle>,
    /// Emission map
    pub emission: Option<TextureHandle>,
    /// Environment cubemap (skybox materials)
    pub environment: Option<TextureHandle>,
}

/// Surface description used for sorting and shader selection
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    id: MaterialId,
    name: String,
    blending: bool,
    opacity: f32,
    diffuse: [f32; 4],
    textures: MaterialTextures,
}

impl Material {
    /// Create an opaque white material with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: MaterialId::next(),
            name: name.into(),
            blending: false,
            opacity: 1.0,
            diffuse: [1.0, 1.0, 1.0, 1.0],
            textures: MaterialTextures::default(),
        }
    }

    /// Enable/disable alpha blending
    #[must_use]
    pub fn with_blending(mut self, blending: bool) -> Self {
        self.blending = blending;
        self
    }

    /// Set opacity; values below 1 also enable blending
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        if self.opacity < 1.0 {
            self.blending = true;
        }
        self
    }

    /// Set the diffuse color
    #[must_use]
    pub fn with_diffuse(mut self, color: [f32; 4]) -> Self {
        self.diffuse = color.map(|c| c.clamp(0.0, 1.0));
        self
    }

    /// Set texture slots
    #[must_use]
    pub fn with_textures(mut self, textures: MaterialTextures) -> Self {
        self.textures = textures;
        self
    }

    /// Material id
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the material blends with what is behind it
    pub fn blending(&self) -> bool {
        self.blending
    }

    /// Opaque materials do not blend
    pub fn is_opaque(&self) -> bool {
        !self.blending
    }

    /// Opacity in [0, 1]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Diffuse color
    pub fn diffuse(&self) -> [f32; 4] {
        self.diffuse
    }

    /// Texture slots
    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    /// Shader features implied by the bound textures
    pub fn features(&self) -> ShaderFeatures {
        let t = &self.textures;
        let mut features = ShaderFeatures::empty();
        features.set(ShaderFeatures::ALBEDO_MAP, t.albedo.is_some());
        features.set(ShaderFeatures::NORMAL_MAP, t.normal.is_some());
        features.set(ShaderFeatures::SPECULAR_MAP, t.specular.is_some());
        features.set(ShaderFeatures::ROUGHNESS_MAP, t.roughness.is_some());
        features.set(ShaderFeatures::AO_MAP, t.ao.is_some());
        features.set(ShaderFeatures::EMISSION_MAP, t.emission.is_some());
        features
    }
}

/// Vertex data with a precomputed object-space bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounding_box: AABB,
    has_bones: bool,
}

impl Geometry {
    /// Build from vertex positions and triangle indices
    pub fn from_positions(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounding_box = AABB::from_points(&positions)
            .unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros()));
        Self {
            positions,
            indices,
            bounding_box,
            has_bones: false,
        }
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent;
        let positions = AABB::new(Vec3::new(-h, -h, -h), Vec3::new(h, h, h)).corners().to_vec();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ];
        Self::from_positions(positions, indices)
    }

    /// Mark the geometry as skinned
    #[must_use]
    pub fn with_bones(mut self, has_bones: bool) -> Self {
        self.has_bones = has_bones;
        self
    }

    /// Vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Object-space bounding box
    pub fn bounding_box(&self) -> &AABB {
        &self.bounding_box
    }

    /// Whether the geometry is skinned
    pub fn has_bones(&self) -> bool {
        self.has_bones
    }
}

/// Renderable geometry with its materials
#[derive(Debug, Clone)]
pub struct Mesh {
    geometry: Arc<Geometry>,
    materials: Vec<Arc<Material>>,
}

impl Mesh {
    /// Create a mesh
    pub fn new(geometry: Arc<Geometry>, materials: Vec<Arc<Material>>) -> Self {
        Self { geometry, materials }
    }

    /// Shared geometry
    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    /// Materials in sub-mesh order
    pub fn materials(&self) -> &[Arc<Material>] {
        &self.materials
    }

    /// Primary material (the first one)
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.materials.first()
    }

    /// Id of the primary material, used as the sort key
    pub fn material_id(&self) -> Option<MaterialId> {
        self.material().map(|m| m.id())
    }

    /// Opaque iff every material is opaque (vacuously true without materials)
    pub fn is_opaque(&self) -> bool {
        self.materials.iter().all(|m| m.is_opaque())
    }

    /// Union of material features plus geometry-driven features
    pub fn features(&self) -> ShaderFeatures {
        let mut features = self
            .materials
            .iter()
            .fold(ShaderFeatures::empty(), |acc, m| acc | m.features());
        features.set(ShaderFeatures::SKINNED, self.geometry.has_bones());
        features
    }

    /// Object-space bounding box
    pub fn object_bounding_box(&self) -> AABB {
        *self.geometry.bounding_box()
    }

    /// Axis-aligned bounding box under `transform`
    pub fn bounding_box(&self, transform: &Mat4) -> AABB {
        self.geometry.bounding_box().transform(transform)
    }

    /// Oriented bounding box under `transform`
    pub fn oriented_bounding_box(&self, transform: &Mat4) -> OBB {
        OBB::from_aabb(self.geometry.bounding_box(), transform)
    }
}
