//! Backend abstraction traits for the rendering system
//!
//! This module defines the trait that rendering backends must implement to
//! serve the pipeline. The pipeline decides *what* to draw and in which
//! order; a backend owns GPU resources and turns the requests into API
//! calls. Handles are opaque ids minted by the backend.

use crate::foundation::math::Mat4;
use crate::render::shader_cache::ShaderFeatures;
use crate::render::RenderError;
use crate::scene::object::NodeId;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Opaque texture handle minted by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Opaque compiled-shader handle minted by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

/// Shape of a texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Single-layer depth target (spot and directional shadows)
    Depth2D,
    /// Six-layer depth cube target (point-light shadows)
    DepthCube,
    /// Color cubemap with a mip chain
    Cubemap,
    /// Color 2D texture
    Texture2D,
}

/// Render pass a shader variant is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Deferred G-buffer fill
    Geometry,
    /// Forward shading (forward renderer and deferred transparent pass)
    Forward,
    /// Depth-only shadow pass
    Depth,
    /// Deferred full-screen lighting pass
    Lighting,
}

/// Environment convolution kernels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convolution {
    /// Diffuse irradiance of a cubemap
    Irradiance,
    /// GGX prefiltered specular at a roughness in [0, 1]
    Prefilter {
        /// Roughness of the rendered mip level
        roughness: f32,
    },
    /// Split-sum BRDF integration lookup
    BrdfLut,
}

/// One mesh draw request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    /// Mesh node being drawn
    pub node: NodeId,
    /// Shader variant to bind
    pub shader: ShaderHandle,
    /// Object to eye transform
    pub model_view: Mat4,
    /// Eye to clip transform
    pub projection: Mat4,
    /// Whether alpha blending is enabled
    pub blend: bool,
}

/// One caster in a depth-only pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthDraw {
    /// Mesh node being drawn
    pub node: NodeId,
    /// Depth-pass shader variant to bind
    pub shader: ShaderHandle,
    /// Object to world transform
    pub model: Mat4,
}

/// One light contribution in a lighting pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDraw {
    /// Light node
    pub light: NodeId,
    /// Light to eye transform
    pub transform: Mat4,
    /// Shadow map bound for this light, if any
    pub shadow_map: Option<TextureHandle>,
    /// Receiver eye space to shadow space
    pub shadow_matrix: Option<Mat4>,
}

/// Image-based lighting inputs bound for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentMaps {
    /// Diffuse irradiance cubemap
    pub irradiance: TextureHandle,
    /// Prefiltered specular cubemap
    pub specular: TextureHandle,
    /// Number of mips in `specular`
    pub specular_mips: u32,
    /// BRDF integration lookup texture
    pub brdf_lut: TextureHandle,
}

/// Main rendering backend trait
///
/// This trait abstracts over concrete graphics APIs and provides the
/// consistent interface the renderers record against.
pub trait RenderBackend {
    /// Allocate a depth render target of `size`² texels (per face for cubes)
    fn create_depth_target(&mut self, kind: TextureKind, size: u32) -> BackendResult<TextureHandle>;

    /// Allocate a color cubemap with `mip_levels` mips
    fn create_cubemap(&mut self, size: u32, mip_levels: u32) -> BackendResult<TextureHandle>;

    /// Allocate a color 2D texture
    fn create_texture_2d(&mut self, size: u32) -> BackendResult<TextureHandle>;

    /// Compile the shader variant for `features` in `pass`
    fn compile_shader(&mut self, features: ShaderFeatures, pass: PassKind) -> BackendResult<ShaderHandle>;

    /// Depth-only render of `items` into `target`
    ///
    /// One view-projection renders a 2D map; six render the layers of a cube
    /// target in +X, -X, +Y, -Y, +Z, -Z order in a single layered pass.
    fn render_depth(
        &mut self,
        target: TextureHandle,
        view_projections: &[Mat4],
        items: &[DepthDraw],
    ) -> BackendResult<()>;

    /// Run a convolution kernel over `source` into mip 0 of `target`
    fn render_convolution(
        &mut self,
        kernel: Convolution,
        source: Option<TextureHandle>,
        target: TextureHandle,
        size: u32,
    ) -> BackendResult<()>;

    /// Read back mip 0 of a cubemap as RGBA32F texels, faces in order
    fn read_cubemap(&mut self, texture: TextureHandle, size: u32) -> BackendResult<Vec<f32>>;

    /// Upload RGBA32F texels into one mip level of a cubemap
    fn upload_cubemap_level(
        &mut self,
        texture: TextureHandle,
        level: u32,
        size: u32,
        data: &[f32],
    ) -> BackendResult<()>;

    /// Bind the image-based lighting maps for subsequent passes
    fn set_environment(&mut self, maps: Option<EnvironmentMaps>) -> BackendResult<()>;

    /// Record one mesh draw with the given lights bound
    fn draw(&mut self, call: &DrawCall, lights: &[LightDraw]) -> BackendResult<()>;

    /// Record one deferred lighting pass
    fn draw_light(&mut self, shader: ShaderHandle, light: &LightDraw) -> BackendResult<()>;

    /// Release a texture
    fn destroy_texture(&mut self, texture: TextureHandle);
}
