//! Scene Renderer - forward rendering of a scene graph
//!
//! Each frame runs the whole pipeline against a [`RenderBackend`]:
//! 1. Cull the scene for the camera into a render bin
//! 2. Apply the light budget, then render shadow maps for the remaining
//!    shadow-casting lights
//! 3. Sort the bin into opaque and transparent lists
//! 4. Bind the (cached) environment maps
//! 5. Draw opaque items, then transparent items, each with the light list

use log::debug;

use crate::core::config::PipelineConfig;
use crate::render::backend::{BackendResult, DrawCall, LightDraw, PassKind, RenderBackend};
use crate::render::environment::EnvironmentCache;
use crate::render::shader_cache::{ShaderCache, ShaderFeatures};
use crate::render::shadow::{shadow_map_for, ShadowMap, ShadowPass};
use crate::scene::camera::CameraView;
use crate::scene::cull_visitor::cull;
use crate::scene::render_bin::{sort_render_bin, LightItem, RenderItem};
use crate::scene::scene_graph::SceneGraph;
use crate::scene::visitor::TagFilter;

/// Per-frame renderer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Opaque items drawn
    pub opaque_items: usize,
    /// Transparent items drawn
    pub transparent_items: usize,
    /// Lights that survived culling
    pub lights: usize,
    /// Lights bound per forward draw after the light budget
    pub forward_lights: usize,
    /// Shadow maps rendered
    pub shadow_maps: usize,
    /// Mesh draw calls issued
    pub draw_calls: usize,
    /// Deferred lighting passes issued
    pub light_passes: usize,
    /// Whether environment maps were bound
    pub environment: bool,
}

impl FrameStats {
    /// Items drawn in total
    pub fn visible_items(&self) -> usize {
        self.opaque_items + self.transparent_items
    }
}

/// Light list of a frame with each light's shadow map attached
pub(crate) fn light_draws(lights: &[LightItem<'_>], shadow_maps: &[ShadowMap]) -> Vec<LightDraw> {
    lights
        .iter()
        .map(|item| {
            let map = shadow_map_for(shadow_maps, item.node);
            LightDraw {
                light: item.node,
                transform: item.transform,
                shadow_map: map.map(|m| m.texture),
                shadow_matrix: map.map(|m| m.shadow_matrix),
            }
        })
        .collect()
}

/// Keep at most `max_lights` lights, in traversal order
pub(crate) fn limit_lights<T>(mut lights: Vec<T>, max_lights: usize) -> Vec<T> {
    if lights.len() > max_lights {
        debug!(
            "Forward pass light budget is {}; dropping {} light(s)",
            max_lights,
            lights.len() - max_lights
        );
        lights.truncate(max_lights);
    }
    lights
}

/// Draw `items` with the shader variant of each mesh for `pass`
pub(crate) fn draw_items<B>(
    backend: &mut B,
    shaders: &ShaderCache,
    items: &[RenderItem<'_>],
    camera: &CameraView,
    pass: PassKind,
    blend: bool,
    lights: &[LightDraw],
) -> BackendResult<usize>
where
    B: RenderBackend + ?Sized,
{
    for item in items {
        let shader = shaders.get(item.mesh.features(), pass)?;
        let call = DrawCall {
            node: item.node,
            shader,
            model_view: item.transform,
            projection: *camera.projection(),
            blend,
        };
        backend.draw(&call, lights)?;
    }
    Ok(items.len())
}

/// Forward renderer
///
/// Owns the per-renderer state that lives across frames: compiled shader
/// variants, shadow slots and the environment cache.
#[derive(Debug)]
pub struct SceneRenderer {
    config: PipelineConfig,
    shaders: ShaderCache,
    shadows: ShadowPass,
    environment: EnvironmentCache,
}

impl SceneRenderer {
    /// Create a renderer
    ///
    /// Compiles the forward and shadow depth variants of every feature mask
    /// in `variants`.
    pub fn new<B, I>(backend: &mut B, config: PipelineConfig, variants: I) -> BackendResult<Self>
    where
        B: RenderBackend + ?Sized,
        I: IntoIterator<Item = ShaderFeatures>,
    {
        let shaders = ShaderCache::build(
            backend,
            variants
                .into_iter()
                .flat_map(|features| [(features, PassKind::Forward), (features, PassKind::Depth)]),
        )?;
        Ok(Self {
            shadows: ShadowPass::new(config.shadows.clone(), config.culling.clone()),
            environment: EnvironmentCache::new(config.environment.clone()),
            shaders,
            config,
        })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compiled shader variants
    pub fn shaders(&self) -> &ShaderCache {
        &self.shaders
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
        let mut bin = cull(scene, camera, filter.clone(), &self.config.culling);
        let relevant_lights = bin.lights.len();
        bin.lights = limit_lights(std::mem::take(&mut bin.lights), self.config.forward.max_lights);

        let shadow_maps = self.shadows.render(backend, &self.shaders, &bin)?;
        let sorted = sort_render_bin(bin, &self.config.sorting);

        let environment = self.environment.update(backend, scene)?;
        backend.set_environment(environment)?;

        let lights = light_draws(&sorted.lights, &shadow_maps);

        let mut draw_calls = draw_items(
            backend,
            &self.shaders,
            &sorted.opaque,
            &sorted.camera,
            PassKind::Forward,
            false,
            &lights,
        )?;
        draw_calls += draw_items(
            backend,
            &self.shaders,
            &sorted.transparent,
            &sorted.camera,
            PassKind::Forward,
            true,
            &lights,
        )?;

        let stats = FrameStats {
            opaque_items: sorted.opaque.len(),
            transparent_items: sorted.transparent.len(),
            lights: relevant_lights,
            forward_lights: lights.len(),
            shadow_maps: shadow_maps.len(),
            draw_calls,
            light_passes: 0,
            environment: environment.is_some(),
        };
        debug!("Forward frame: {:?}", stats);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Vec3};
    use crate::render::headless::{Command, HeadlessBackend};
    use crate::render::RenderError;
    use crate::scene::camera::Camera;
    use crate::scene::light::Light;
    use crate::scene::mesh::{Geometry, Material, MaterialTextures, Mesh};
    use crate::scene::object::Object3D;
    use crate::render::backend::TextureHandle;
    use std::sync::Arc;

    fn camera() -> CameraView {
        Camera::perspective(90.0, 1.0, 0.1, 100.0).view(&Mat4::identity()).unwrap()
    }

    fn mesh(material: Material) -> Mesh {
        Mesh::new(Arc::new(Geometry::cube(1.0)), vec![Arc::new(material)])
    }

    fn scene() -> SceneGraph {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        scene
            .add(root, Object3D::mesh("near", mesh(Material::new("a"))).with_position(Vec3::new(0.0, 0.0, -5.0)))
            .unwrap();
        scene
            .add(root, Object3D::mesh("far", mesh(Material::new("b"))).with_position(Vec3::new(0.0, 0.0, -20.0)))
            .unwrap();
        scene
            .add(
                root,
                Object3D::mesh("glass", mesh(Material::new("glass").with_opacity(0.5)))
                    .with_position(Vec3::new(1.0, 0.0, -8.0)),
            )
            .unwrap();
        for i in 0..3 {
            scene
                .add(
                    root,
                    Object3D::light(format!("lamp {i}"), Light::point(1.0, 10.0))
                        .with_position(Vec3::new(0.0, 2.0, -6.0)),
                )
                .unwrap();
        }
        scene
    }

    #[test]
    fn test_forward_frame_draws_opaque_then_transparent() {
        let mut backend = HeadlessBackend::new();
        let mut renderer =
            SceneRenderer::new(&mut backend, PipelineConfig::default(), [ShaderFeatures::empty()]).unwrap();

        let stats = renderer.render(&mut backend, &scene(), &camera(), &TagFilter::all()).unwrap();
        assert_eq!(stats.opaque_items, 2);
        assert_eq!(stats.transparent_items, 1);
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.lights, 3);
        assert!(!stats.environment);

        let blends: Vec<_> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Draw { call, .. } => Some(call.blend),
                _ => None,
            })
            .collect();
        assert_eq!(blends, [false, false, true]);
    }

    #[test]
    fn test_light_budget_truncates() {
        let mut backend = HeadlessBackend::new();
        let mut config = PipelineConfig::default();
        config.forward.max_lights = 2;
        let mut renderer = SceneRenderer::new(&mut backend, config, [ShaderFeatures::empty()]).unwrap();

        let stats = renderer.render(&mut backend, &scene(), &camera(), &TagFilter::all()).unwrap();
        assert_eq!(stats.lights, 3);
        assert_eq!(stats.forward_lights, 2);
        assert!(backend.commands().iter().all(|c| match c {
            Command::Draw { lights, .. } => lights.len() == 2,
            _ => true,
        }));
    }

    #[test]
    fn test_unknown_feature_combination_fails_loudly() {
        let mut backend = HeadlessBackend::new();
        let mut renderer =
            SceneRenderer::new(&mut backend, PipelineConfig::default(), [ShaderFeatures::empty()]).unwrap();

        let mut scene = scene();
        let textured = Material::new("textured").with_textures(MaterialTextures {
            albedo: Some(TextureHandle(99)),
            ..MaterialTextures::default()
        });
        scene
            .add(scene.root(), Object3D::mesh("textured", mesh(textured)).with_position(Vec3::new(0.0, 0.0, -3.0)))
            .unwrap();

        let err = renderer.render(&mut backend, &scene, &camera(), &TagFilter::all()).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingShaderVariant {
                features: ShaderFeatures::ALBEDO_MAP,
                pass: PassKind::Forward,
            }
        );
    }

    #[test]
    fn test_empty_scene_issues_no_draws() {
        let mut backend = HeadlessBackend::new();
        let mut renderer = SceneRenderer::new(&mut backend, PipelineConfig::default(), Vec::<ShaderFeatures>::new()).unwrap();

        let stats = renderer
            .render(&mut backend, &SceneGraph::new(), &camera(), &TagFilter::all())
            .unwrap();
        assert_eq!(stats, FrameStats::default());
        assert_eq!(backend.draw_count(), 0);
    }

    #[test]
    fn test_lights_over_budget_get_no_shadow_maps() {
        let mut backend = HeadlessBackend::new();
        let mut config = PipelineConfig::default();
        config.forward.max_lights = 1;
        let mut renderer = SceneRenderer::new(&mut backend, config, [ShaderFeatures::empty()]).unwrap();

        let mut scene = scene();
        for i in 0..2 {
            scene
                .add(
                    scene.root(),
                    Object3D::light(format!("spot {i}"), Light::spot(1.0, 20.0, 30.0).with_cast_shadow(true))
                        .with_position(Vec3::new(0.0, 0.0, -2.0)),
                )
                .unwrap();
        }
        // the three unshadowed lamps come first in traversal order
        let stats = renderer.render(&mut backend, &scene, &camera(), &TagFilter::all()).unwrap();
        assert_eq!(stats.lights, 5);
        assert_eq!(stats.forward_lights, 1);
        assert_eq!(stats.shadow_maps, 0);
        assert!(!backend
            .commands()
            .iter()
            .any(|c| matches!(c, Command::RenderDepth { .. })));
    }
}
