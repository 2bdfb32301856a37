//! Shadow mapping
//!
//! Every frame each light in the render bin is re-evaluated. A light that
//! casts shadows gets a shadow camera fitted to its type, the scene is
//! culled again from that camera and the casters are rendered depth-only,
//! each with the depth variant of its shader, into one of a fixed number of
//! pre-allocated slots:
//!
//! - directional: orthographic box of ±radius, single 2D map
//! - spot: perspective cone of `2 × cutoff`, single 2D map
//! - point: six 90° faces rendered as one layered pass into a cube map
//! - area: never shadowed
//!
//! Slots are handed out in traversal order. Lights past the last slot are
//! rendered unshadowed and a warning names each of them.
//!
//! Caster culling ignores the `no_cull` exemption and never includes the
//! scene's skybox.

use std::collections::HashSet;

use log::{debug, warn};

use crate::core::config::{CullConfig, ShadowConfig};
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::render::backend::{BackendResult, DepthDraw, PassKind, RenderBackend, TextureHandle, TextureKind};
use crate::render::shader_cache::{ShaderCache, ShaderFeatures};
use crate::scene::camera::{Camera, CameraView};
use crate::scene::cull_visitor::CullVisitor;
use crate::scene::light::{Light, LightType};
use crate::scene::object::NodeId;
use crate::scene::render_bin::{LightItem, RenderBin};
use crate::scene::visitor::TagFilter;
use crate::scene::SceneResult;

/// Camera(s) a light renders its shadow map from
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowCamera {
    /// One view into a 2D depth map
    Single(CameraView),
    /// Six cube faces (+X, -X, +Y, -Y, +Z, -Z) into a depth cube map
    Cube([CameraView; 6]),
}

impl ShadowCamera {
    /// Fit a shadow camera to `light` placed by `world_transform`
    ///
    /// Returns `None` for light types that never cast shadows.
    pub fn for_light(light: &Light, world_transform: &Mat4, near: f32) -> SceneResult<Option<Self>> {
        let radius = light.radius();
        let far = radius.max(near * 2.0);

        let camera = match light.light_type() {
            LightType::Directional => {
                let extent = radius.max(near);
                Self::Single(
                    Camera::orthographic(-extent, extent, -extent, extent, near, (2.0 * radius).max(near * 2.0))
                        .view(world_transform)?,
                )
            }
            LightType::Spot => {
                let fov = (2.0 * light.spot_cutoff()).clamp(1.0, 179.0);
                Self::Single(Camera::perspective(fov, 1.0, near, far).view(world_transform)?)
            }
            LightType::Point => Self::Cube(CameraView::cube_faces(world_transform.translation_part(), near, far)),
            LightType::Area => return Ok(None),
        };
        Ok(Some(camera))
    }

    /// Depth target shape this camera renders into
    pub fn texture_kind(&self) -> TextureKind {
        match self {
            Self::Single(_) => TextureKind::Depth2D,
            Self::Cube(_) => TextureKind::DepthCube,
        }
    }

    /// View-projection per rendered layer
    pub fn view_projections(&self) -> Vec<Mat4> {
        match self {
            Self::Single(view) => vec![view.view_projection()],
            Self::Cube(faces) => faces.iter().map(CameraView::view_projection).collect(),
        }
    }

    fn views(&self) -> &[CameraView] {
        match self {
            Self::Single(view) => std::slice::from_ref(view),
            Self::Cube(faces) => faces,
        }
    }
}

/// Shadow map produced for one light this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowMap {
    /// Light node
    pub light: NodeId,
    /// Depth texture (2D or cube)
    pub texture: TextureHandle,
    /// Shape of `texture`
    pub kind: TextureKind,
    /// Receiver eye space to shadow space
    ///
    /// For 2D maps this lands in the light's clip space. For cube maps it
    /// lands in world space centred on the light, ready for direction lookup.
    pub shadow_matrix: Mat4,
}

/// Find the shadow map of `light` in a frame's output
pub fn shadow_map_for(maps: &[ShadowMap], light: NodeId) -> Option<&ShadowMap> {
    maps.iter().find(|map| map.light == light)
}

#[derive(Debug, Clone, Copy, Default)]
struct ShadowSlot {
    depth_2d: Option<TextureHandle>,
    depth_cube: Option<TextureHandle>,
}

/// Shadow pass with a fixed number of caster slots
#[derive(Debug, Clone)]
pub struct ShadowPass {
    config: ShadowConfig,
    cull_config: CullConfig,
    slots: Vec<ShadowSlot>,
}

impl ShadowPass {
    /// Create a pass with `config.max_shadow_casters` slots
    pub fn new(config: ShadowConfig, cull_config: CullConfig) -> Self {
        let slots = vec![ShadowSlot::default(); config.max_shadow_casters];
        Self {
            config,
            cull_config,
            slots,
        }
    }

    /// Number of lights that can be shadowed per frame
    pub fn capacity(&self) -> usize {
        if self.config.enabled {
            self.slots.len()
        } else {
            0
        }
    }

    /// Shadow configuration
    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Render the shadow maps for every shadow-casting light in `bin`
    ///
    /// Casters are drawn with their `PassKind::Depth` variant from `shaders`;
    /// a missing variant fails the pass.
    pub fn render<B>(
        &mut self,
        backend: &mut B,
        shaders: &ShaderCache,
        bin: &RenderBin<'_>,
    ) -> BackendResult<Vec<ShadowMap>>
    where
        B: RenderBackend + ?Sized,
    {
        let mut maps = Vec::new();
        if !self.config.enabled {
            return Ok(maps);
        }

        let receiver_to_world = bin.camera.inverse_view();
        let mut next_slot = 0;

        for item in bin.lights.iter().filter(|item| item.light.cast_shadow()) {
            let Some(camera) = ShadowCamera::for_light(item.light, &item.world_transform, self.config.near_plane)?
            else {
                continue;
            };

            if next_slot >= self.slots.len() {
                warn!(
                    "Light '{}' exceeds the shadow caster cap of {} and is rendered without shadows",
                    light_label(bin, item),
                    self.slots.len()
                );
                continue;
            }
            let slot = next_slot;
            next_slot += 1;

            let kind = camera.texture_kind();
            let texture = self.slot_texture(backend, slot, kind)?;
            let casters = casters(bin, &camera, &self.cull_config, shaders)?;
            backend.render_depth(texture, &camera.view_projections(), &casters)?;

            let shadow_matrix = match &camera {
                ShadowCamera::Single(view) => view.view_projection() * receiver_to_world,
                ShadowCamera::Cube(_) => {
                    Mat4::new_translation(&-item.world_transform.translation_part()) * receiver_to_world
                }
            };

            debug!(
                "Shadow slot {} -> light '{}' ({:?}, {} caster(s))",
                slot,
                light_label(bin, item),
                kind,
                casters.len()
            );
            maps.push(ShadowMap {
                light: item.node,
                texture,
                kind,
                shadow_matrix,
            });
        }

        Ok(maps)
    }

    /// Release every allocated depth target
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        for slot in &mut self.slots {
            for texture in [slot.depth_2d.take(), slot.depth_cube.take()].into_iter().flatten() {
                backend.destroy_texture(texture);
            }
        }
    }

    fn slot_texture<B>(&mut self, backend: &mut B, slot: usize, kind: TextureKind) -> BackendResult<TextureHandle>
    where
        B: RenderBackend + ?Sized,
    {
        let (entry, size) = match kind {
            TextureKind::DepthCube => (&mut self.slots[slot].depth_cube, self.config.cube_resolution),
            _ => (&mut self.slots[slot].depth_2d, self.config.map_resolution),
        };
        if let Some(texture) = *entry {
            return Ok(texture);
        }
        let texture = backend.create_depth_target(kind, size)?;
        *entry = Some(texture);
        Ok(texture)
    }
}

/// Meshes seen by any view of `camera`, in first-seen order, as depth draws
fn casters(
    bin: &RenderBin<'_>,
    camera: &ShadowCamera,
    cull_config: &CullConfig,
    shaders: &ShaderCache,
) -> BackendResult<Vec<DepthDraw>> {
    let Some(scene) = bin.scene else {
        debug!("Render bin has no scene; shadow casters fall back to the visible items");
        return bin
            .items
            .iter()
            .map(|item| depth_draw(shaders, item.node, item.mesh.features(), item.world_transform))
            .collect();
    };

    let mut seen: HashSet<NodeId> = scene.skybox().into_iter().collect();
    let mut casters = Vec::new();
    for view in camera.views() {
        let mut visitor = CullVisitor::new(view, TagFilter::all(), cull_config).with_no_cull_exemption(false);
        scene.traverse(*view.view(), &mut visitor);
        for item in visitor.into_render_bin().items {
            if seen.insert(item.node) {
                casters.push(depth_draw(shaders, item.node, item.mesh.features(), item.world_transform)?);
            }
        }
    }
    Ok(casters)
}

fn depth_draw(
    shaders: &ShaderCache,
    node: NodeId,
    features: ShaderFeatures,
    model: Mat4,
) -> BackendResult<DepthDraw> {
    Ok(DepthDraw {
        node,
        shader: shaders.get(features, PassKind::Depth)?,
        model,
    })
}

fn light_label(bin: &RenderBin<'_>, item: &LightItem<'_>) -> String {
    bin.scene
        .and_then(|scene| scene.get(item.node))
        .map_or_else(|| format!("{:?}", item.node), |node| node.name().to_string())
}
