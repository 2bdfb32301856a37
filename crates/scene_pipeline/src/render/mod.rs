//! # Rendering System
//!
//! Renderer-side half of the pipeline: the backend seam, shader variant
//! lookup, shadow bookkeeping, environment convolution caching, and the
//! forward and deferred renderers that drive them.
//!
//! ## Architecture
//!
//! - **Backend**: [`RenderBackend`] trait; resources are opaque handles
//! - **Shader Cache**: renderer-owned `features × pass → shader` table
//! - **Shadow Pass**: capped per-light depth rendering
//! - **Environment Cache**: skybox convolution baked once per skybox
//! - **Renderers**: [`SceneRenderer`] (forward) and [`DeferredRenderer`]

use thiserror::Error;

pub mod backend;
pub mod deferred;
pub mod environment;
pub mod headless;
pub mod scene_renderer;
pub mod shader_cache;
pub mod shadow;

pub use backend::{
    BackendResult, Convolution, DepthDraw, DrawCall, EnvironmentMaps, LightDraw, PassKind, RenderBackend, ShaderHandle,
    TextureHandle, TextureKind,
};
pub use deferred::DeferredRenderer;
pub use environment::EnvironmentCache;
pub use headless::{Command, HeadlessBackend};
pub use scene_renderer::{FrameStats, SceneRenderer};
pub use shader_cache::{all_variants, ShaderCache, ShaderFeatures};
pub use shadow::{shadow_map_for, ShadowCamera, ShadowMap, ShadowPass};

use crate::scene::{NodeId, SceneError};

/// Rendering errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No shader was compiled for a feature combination
    #[error("No shader variant for features {features:?} in {pass:?} pass")]
    MissingShaderVariant {
        /// Requested feature mask
        features: ShaderFeatures,
        /// Requested pass
        pass: PassKind,
    },

    /// The skybox node has no environment texture to convolve
    #[error("Skybox {0:?} has no environment texture")]
    MissingEnvironmentTexture(NodeId),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Scene lookup failure
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}
