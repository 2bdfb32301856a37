//! # Scene Pipeline
//!
//! The per-frame core of a scene-graph renderer: frustum culling of a node
//! tree into a render bin, opaque/transparent sorting, and the light and
//! shadow bookkeeping the forward and deferred renderers need.
//!
//! ## Features
//!
//! - **Arena Scene Graph**: slot-map nodes with stable ids, tags and an enable flag
//! - **Visitors**: depth-first traversal with per-type hooks and tag filtering
//! - **Culling**: frustum tests of mesh bounds and light spheres into a [`RenderBin`](scene::RenderBin)
//! - **Sorting**: front-to-back opaque, configurable transparent ordering
//! - **Shadows**: capped 2D and cube shadow maps fitted per light type
//! - **Environment**: skybox convolution baked once per skybox
//! - **Backend Seam**: renderers record against a [`RenderBackend`](render::RenderBackend) trait
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut scene = SceneGraph::new();
//!     let material = Arc::new(Material::new("grey"));
//!     let mesh = Mesh::new(Arc::new(Geometry::cube(1.0)), vec![material]);
//!     scene.add(scene.root(), Object3D::mesh("box", mesh).with_position(Vec3::new(0.0, 0.0, -10.0)))?;
//!
//!     let camera = Camera::perspective(90.0, 1.0, 0.1, 100.0).view(&Mat4::identity())?;
//!     let mut backend = HeadlessBackend::new();
//!     let mut renderer = SceneRenderer::new(&mut backend, PipelineConfig::default(), [ShaderFeatures::empty()])?;
//!
//!     let stats = renderer.render(&mut backend, &scene, &camera, &TagFilter::all())?;
//!     assert_eq!(stats.visible_items(), 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for pipeline users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{
            CullConfig, EnvironmentConfig, ForwardConfig, PipelineConfig, ShadowConfig, SortConfig, TransparentOrder,
        },
        foundation::math::{Mat4, Mat4Ext, Vec3},
        render::{
            BackendResult, DeferredRenderer, FrameStats, HeadlessBackend, RenderBackend, RenderError, SceneRenderer,
            ShaderCache, ShaderFeatures, ShadowMap, ShadowPass,
        },
        scene::{
            cull, sort_render_bin, Camera, CameraView, Geometry, Light, LightType, Material, Mesh, NodeId, Object3D,
            RenderBin, SceneError, SceneGraph, SortedRenderBin, TagFilter, Visitor,
        },
    };
}
