//! Headless backend
//!
//! A [`RenderBackend`] that touches no GPU. Every request is appended to a
//! command log and every resource is a fresh integer handle, which makes it
//! the backend of choice for tests and for offline runs of the pipeline.

use std::collections::HashMap;

use log::trace;

use crate::foundation::math::Mat4;
use crate::render::backend::{
    BackendResult, Convolution, DepthDraw, DrawCall, EnvironmentMaps, LightDraw, PassKind, RenderBackend, ShaderHandle,
    TextureHandle, TextureKind,
};
use crate::render::shader_cache::ShaderFeatures;
use crate::render::RenderError;
use crate::scene::object::NodeId;

/// One recorded backend request
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Texture allocation
    CreateTexture {
        /// New handle
        texture: TextureHandle,
        /// Texture shape
        kind: TextureKind,
        /// Size in texels (per face)
        size: u32,
        /// Mip levels
        mip_levels: u32,
    },
    /// Shader compilation
    CompileShader {
        /// New handle
        shader: ShaderHandle,
        /// Feature mask
        features: ShaderFeatures,
        /// Target pass
        pass: PassKind,
    },
    /// Depth-only pass
    RenderDepth {
        /// Depth target
        target: TextureHandle,
        /// Number of layers rendered (1 or 6)
        layers: usize,
        /// Drawn mesh nodes
        nodes: Vec<NodeId>,
    },
    /// Convolution pass
    Convolve {
        /// Kernel
        kernel: Convolution,
        /// Source texture
        source: Option<TextureHandle>,
        /// Target texture
        target: TextureHandle,
        /// Rendered size
        size: u32,
    },
    /// Cubemap readback
    ReadCubemap {
        /// Texture read
        texture: TextureHandle,
        /// Face size
        size: u32,
    },
    /// Cubemap mip upload
    UploadCubemapLevel {
        /// Texture written
        texture: TextureHandle,
        /// Mip level
        level: u32,
        /// Face size of the level
        size: u32,
    },
    /// Environment binding
    SetEnvironment(Option<EnvironmentMaps>),
    /// Mesh draw
    Draw {
        /// Draw request
        call: DrawCall,
        /// Lights bound for the draw
        lights: Vec<NodeId>,
    },
    /// Deferred lighting pass
    DrawLight {
        /// Lighting shader
        shader: ShaderHandle,
        /// Light request
        light: LightDraw,
    },
    /// Texture release
    DestroyTexture(TextureHandle),
}

#[derive(Debug, Clone, Copy)]
struct TextureInfo {
    kind: TextureKind,
    mip_levels: u32,
}

/// In-memory backend recording a command log
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<Command>,
    textures: HashMap<TextureHandle, TextureInfo>,
    next_texture: u32,
    next_shader: u32,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request recorded so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drop the command log, keeping live resources
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Shape of a live texture
    pub fn texture_kind(&self, texture: TextureHandle) -> Option<TextureKind> {
        self.textures.get(&texture).map(|info| info.kind)
    }

    /// Number of shaders compiled
    pub fn shader_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::CompileShader { .. }))
            .count()
    }

    /// Number of recorded mesh draws
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, Command::Draw { .. })).count()
    }

    fn record(&mut self, command: Command) {
        trace!("Headless: {:?}", command);
        self.commands.push(command);
    }

    fn allocate(&mut self, kind: TextureKind, size: u32, mip_levels: u32) -> BackendResult<TextureHandle> {
        if size == 0 {
            return Err(RenderError::Backend(format!("cannot allocate a zero-sized {kind:?} texture")));
        }
        let texture = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(texture, TextureInfo { kind, mip_levels });
        self.record(Command::CreateTexture {
            texture,
            kind,
            size,
            mip_levels,
        });
        Ok(texture)
    }

    fn require(&self, texture: TextureHandle) -> BackendResult<TextureInfo> {
        self.textures
            .get(&texture)
            .copied()
            .ok_or_else(|| RenderError::Backend(format!("unknown texture {texture:?}")))
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_depth_target(&mut self, kind: TextureKind, size: u32) -> BackendResult<TextureHandle> {
        match kind {
            TextureKind::Depth2D | TextureKind::DepthCube => self.allocate(kind, size, 1),
            other => Err(RenderError::Backend(format!("{other:?} is not a depth format"))),
        }
    }

    fn create_cubemap(&mut self, size: u32, mip_levels: u32) -> BackendResult<TextureHandle> {
        self.allocate(TextureKind::Cubemap, size, mip_levels.max(1))
    }

    fn create_texture_2d(&mut self, size: u32) -> BackendResult<TextureHandle> {
        self.allocate(TextureKind::Texture2D, size, 1)
    }

    fn compile_shader(&mut self, features: ShaderFeatures, pass: PassKind) -> BackendResult<ShaderHandle> {
        let shader = ShaderHandle(self.next_shader);
        self.next_shader += 1;
        self.record(Command::CompileShader { shader, features, pass });
        Ok(shader)
    }

    fn render_depth(
        &mut self,
        target: TextureHandle,
        view_projections: &[Mat4],
        items: &[DepthDraw],
    ) -> BackendResult<()> {
        let info = self.require(target)?;
        let expected = match info.kind {
            TextureKind::DepthCube => 6,
            TextureKind::Depth2D => 1,
            other => return Err(RenderError::Backend(format!("{other:?} is not a depth target"))),
        };
        if view_projections.len() != expected {
            return Err(RenderError::Backend(format!(
                "{:?} target needs {} view-projection(s), got {}",
                info.kind,
                expected,
                view_projections.len()
            )));
        }

        self.record(Command::RenderDepth {
            target,
            layers: view_projections.len(),
            nodes: items.iter().map(|item| item.node).collect(),
        });
        Ok(())
    }

    fn render_convolution(
        &mut self,
        kernel: Convolution,
        source: Option<TextureHandle>,
        target: TextureHandle,
        size: u32,
    ) -> BackendResult<()> {
        if let Some(source) = source {
            self.require(source)?;
        }
        self.require(target)?;
        self.record(Command::Convolve {
            kernel,
            source,
            target,
            size,
        });
        Ok(())
    }

    fn read_cubemap(&mut self, texture: TextureHandle, size: u32) -> BackendResult<Vec<f32>> {
        self.require(texture)?;
        self.record(Command::ReadCubemap { texture, size });
        Ok(vec![0.0; (size as usize).pow(2) * 6 * 4])
    }

    fn upload_cubemap_level(
        &mut self,
        texture: TextureHandle,
        level: u32,
        size: u32,
        data: &[f32],
    ) -> BackendResult<()> {
        let info = self.require(texture)?;
        if level >= info.mip_levels {
            return Err(RenderError::Backend(format!(
                "mip {level} out of range for {texture:?} ({} level(s))",
                info.mip_levels
            )));
        }
        if data.len() != (size as usize).pow(2) * 6 * 4 {
            return Err(RenderError::Backend(format!(
                "mip {level} upload of {} floats does not match size {size}",
                data.len()
            )));
        }
        self.record(Command::UploadCubemapLevel { texture, level, size });
        Ok(())
    }

    fn set_environment(&mut self, maps: Option<EnvironmentMaps>) -> BackendResult<()> {
        self.record(Command::SetEnvironment(maps));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall, lights: &[LightDraw]) -> BackendResult<()> {
        self.record(Command::Draw {
            call: *call,
            lights: lights.iter().map(|l| l.light).collect(),
        });
        Ok(())
    }

    fn draw_light(&mut self, shader: ShaderHandle, light: &LightDraw) -> BackendResult<()> {
        self.record(Command::DrawLight { shader, light: *light });
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.record(Command::DestroyTexture(texture));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mut backend = HeadlessBackend::new();
        let a = backend.create_depth_target(TextureKind::Depth2D, 256).unwrap();
        let b = backend.create_cubemap(64, 3).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.texture_count(), 2);
        assert_eq!(backend.texture_kind(b), Some(TextureKind::Cubemap));
    }

    #[test]
    fn test_depth_layers_must_match_target() {
        let mut backend = HeadlessBackend::new();
        let cube = backend.create_depth_target(TextureKind::DepthCube, 128).unwrap();
        assert!(backend.render_depth(cube, &[Mat4::identity()], &[]).is_err());
        assert!(backend.render_depth(cube, &[Mat4::identity(); 6], &[]).is_ok());
        assert!(backend.create_depth_target(TextureKind::Cubemap, 128).is_err());
    }

    #[test]
    fn test_readback_and_upload_sizes() {
        let mut backend = HeadlessBackend::new();
        let cube = backend.create_cubemap(8, 2).unwrap();
        let texels = backend.read_cubemap(cube, 4).unwrap();
        assert_eq!(texels.len(), 4 * 4 * 6 * 4);

        assert!(backend.upload_cubemap_level(cube, 1, 4, &texels).is_ok());
        assert!(backend.upload_cubemap_level(cube, 2, 4, &texels).is_err());
        assert!(backend.upload_cubemap_level(cube, 0, 8, &texels).is_err());
    }

    #[test]
    fn test_destroyed_textures_are_rejected() {
        let mut backend = HeadlessBackend::new();
        let cube = backend.create_cubemap(8, 1).unwrap();
        backend.destroy_texture(cube);
        assert!(backend.read_cubemap(cube, 8).is_err());
        assert_eq!(backend.texture_count(), 0);
    }
}
