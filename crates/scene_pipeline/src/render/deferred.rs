//! Deferred renderer
//!
//! Opaque items are written to the G-buffer with the geometry-pass variant
//! of their shader, then every light is applied in its own full-screen
//! lighting pass with its shadow map bound. Transparent items cannot live in
//! a G-buffer and are drawn afterwards with the forward variants.

use log::debug;

use crate::core::config::PipelineConfig;
use crate::render::backend::{BackendResult, PassKind, RenderBackend, ShaderHandle};
use crate::render::environment::EnvironmentCache;
use crate::render::scene_renderer::{draw_items, light_draws, limit_lights, FrameStats};
use crate::render::shader_cache::{ShaderCache, ShaderFeatures};
use crate::render::shadow::ShadowPass;
use crate::scene::camera::CameraView;
use crate::scene::cull_visitor::cull;
use crate::scene::render_bin::sort_render_bin;
use crate::scene::scene_graph::SceneGraph;
use crate::scene::visitor::TagFilter;

/// Deferred renderer
#[derive(Debug)]
pub struct DeferredRenderer {
    config: PipelineConfig,
    shaders: ShaderCache,
    lighting_shader: ShaderHandle,
    shadows: ShadowPass,
    environment: EnvironmentCache,
}

impl DeferredRenderer {
    /// Create a renderer
    ///
    /// Compiles the geometry, forward and shadow depth variants of every
    /// feature mask in `variants`, plus the lighting-pass shader.
    pub fn new<B, I>(backend: &mut B, config: PipelineConfig, variants: I) -> BackendResult<Self>
    where
        B: RenderBackend + ?Sized,
        I: IntoIterator<Item = ShaderFeatures>,
    {
        let mut shaders = ShaderCache::build(
            backend,
            variants
                .into_iter()
                .flat_map(|features| {
                    [
                        (features, PassKind::Geometry),
                        (features, PassKind::Forward),
                        (features, PassKind::Depth),
                    ]
                }),
        )?;
        let lighting_shader = shaders.compile(backend, ShaderFeatures::empty(), PassKind::Lighting)?;

        Ok(Self {
            shadows: ShadowPass::new(config.shadows.clone(), config.culling.clone()),
            environment: EnvironmentCache::new(config.environment.clone()),
            shaders,
            lighting_shader,
            config,
        })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Environment cache
    pub fn environment(&self) -> &EnvironmentCache {
        &self.environment
    }

    /// Render one frame of `scene` seen from `camera`
    pub fn render<B>(
        &mut self,
        backend: &mut B,
        scene: &SceneGraph,
        camera: &CameraView,
        filter: &TagFilter,
    ) -> BackendResult<FrameStats>
    where
        B: RenderBackend + ?Sized,
    {
        let bin = cull(scene, camera, filter.clone(), &self.config.culling);
        let shadow_maps = self.shadows.render(backend, &self.shaders, &bin)?;
        let sorted = sort_render_bin(bin, &self.config.sorting);

        let environment = self.environment.update(backend, scene)?;
        backend.set_environment(environment)?;

        // geometry pass
        let mut draw_calls = draw_items(
            backend,
            &self.shaders,
            &sorted.opaque,
            &sorted.camera,
            PassKind::Geometry,
            false,
            &[],
        )?;

        // lighting pass, one per light, no budget
        let lights = light_draws(&sorted.lights, &shadow_maps);
        for light in &lights {
            backend.draw_light(self.lighting_shader, light)?;
        }

        // forward pass for what the G-buffer cannot hold
        let forward_lights = limit_lights(lights.clone(), self.config.forward.max_lights);
        draw_calls += draw_items(
            backend,
            &self.shaders,
            &sorted.transparent,
            &sorted.camera,
            PassKind::Forward,
            true,
            &forward_lights,
        )?;

        let stats = FrameStats {
            opaque_items: sorted.opaque.len(),
            transparent_items: sorted.transparent.len(),
            lights: sorted.lights.len(),
            forward_lights: forward_lights.len(),
            shadow_maps: shadow_maps.len(),
            draw_calls,
            light_passes: lights.len(),
            environment: environment.is_some(),
        };
        debug!("Deferred frame: {:?}", stats);
        Ok(stats)
    }

    /// Release every backend resource owned by the renderer
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        self.shadows.release(backend);
        self.environment.release(backend);
    }
}
