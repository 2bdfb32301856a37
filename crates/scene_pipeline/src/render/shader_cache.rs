//! Shader variant cache
//!
//! Maps a material feature mask and a pass to a compiled shader. The cache
//! is built once when a renderer is created, from an explicit variant list,
//! and owned by that renderer. A lookup for a combination that was never
//! compiled is an error rather than a fallback to some default shader.

use std::collections::HashMap;

use bitflags::bitflags;
use log::debug;

use crate::render::backend::{BackendResult, PassKind, RenderBackend, ShaderHandle};
use crate::render::RenderError;

bitflags! {
    /// Shader features selected by material textures and geometry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFeatures: u32 {
        /// Albedo (diffuse color) map
        const ALBEDO_MAP = 1 << 0;
        /// Tangent-space normal map
        const NORMAL_MAP = 1 << 1;
        /// Specular map
        const SPECULAR_MAP = 1 << 2;
        /// Roughness map
        const ROUGHNESS_MAP = 1 << 3;
        /// Ambient-occlusion map
        const AO_MAP = 1 << 4;
        /// Emission map
        const EMISSION_MAP = 1 << 5;
        /// Bone-skinned geometry
        const SKINNED = 1 << 6;
    }
}

/// Renderer-owned `features × pass → shader` table
#[derive(Debug, Clone, Default)]
pub struct ShaderCache {
    shaders: HashMap<(ShaderFeatures, PassKind), ShaderHandle>,
}

impl ShaderCache {
    /// Compile every `(features, pass)` pair in `variants`
    pub fn build<B, I>(backend: &mut B, variants: I) -> BackendResult<Self>
    where
        B: RenderBackend + ?Sized,
        I: IntoIterator<Item = (ShaderFeatures, PassKind)>,
    {
        let mut cache = Self::default();
        for (features, pass) in variants {
            cache.compile(backend, features, pass)?;
        }
        debug!("Built shader cache with {} variant(s)", cache.len());
        Ok(cache)
    }

    /// Compile a variant unless it is already present
    pub fn compile<B>(&mut self, backend: &mut B, features: ShaderFeatures, pass: PassKind) -> BackendResult<ShaderHandle>
    where
        B: RenderBackend + ?Sized,
    {
        if let Some(shader) = self.shaders.get(&(features, pass)) {
            return Ok(*shader);
        }
        let shader = backend.compile_shader(features, pass)?;
        self.shaders.insert((features, pass), shader);
        Ok(shader)
    }

    /// Look up a compiled variant
    pub fn get(&self, features: ShaderFeatures, pass: PassKind) -> Result<ShaderHandle, RenderError> {
        self.shaders
            .get(&(features, pass))
            .copied()
            .ok_or(RenderError::MissingShaderVariant { features, pass })
    }

    /// Whether a variant is present
    pub fn contains(&self, features: ShaderFeatures, pass: PassKind) -> bool {
        self.shaders.contains_key(&(features, pass))
    }

    /// Number of compiled variants
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// Whether no variant is compiled
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

/// Every combination of `features` for each pass in `passes`
///
/// Used to precompile the full variant space of a small feature set.
pub fn all_variants(features: ShaderFeatures, passes: &[PassKind]) -> Vec<(ShaderFeatures, PassKind)> {
    let bits: Vec<ShaderFeatures> = features.iter().collect();
    let mut variants = Vec::with_capacity(passes.len() << bits.len());
    for mask in 0..(1u32 << bits.len()) {
        let combination = bits
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .fold(ShaderFeatures::empty(), |acc, (_, bit)| acc | *bit);
        variants.extend(passes.iter().map(|pass| (combination, *pass)));
    }
    variants
}
