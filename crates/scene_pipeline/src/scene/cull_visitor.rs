//! Frustum culling
//!
//! [`CullVisitor`] walks the scene seeded with the camera's view matrix, so
//! every accumulated transform it sees is already in eye space. Meshes are
//! tested by their world-space AABB, lights by a sphere of their effect
//! radius, both against the camera's world-space frustum computed once up
//! front. There is no spatial index: every call walks the full graph.

use log::debug;

use crate::core::config::CullConfig;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::scene::bounds::{BoundingSphere, Frustum};
use crate::scene::camera::CameraView;
use crate::scene::light::{Light, LightType};
use crate::scene::mesh::Mesh;
use crate::scene::render_bin::{LightItem, RenderBin, RenderItem};
use crate::scene::scene_graph::SceneGraph;
use crate::scene::visitor::{TagFilter, Visit, Visitor};

/// Visitor producing a [`RenderBin`] for one camera
#[derive(Debug)]
pub struct CullVisitor<'a> {
    bin: RenderBin<'a>,
    frustum: Frustum,
    inverse_view: Mat4,
    filter: TagFilter,
    no_cull_tag: String,
    no_cull_exemption: bool,
    cull_directional_lights: bool,
    visited_meshes: usize,
    visited_lights: usize,
}

impl<'a> CullVisitor<'a> {
    /// Create a visitor for `view`; traversal must be seeded with `view.view()`
    pub fn new(view: &CameraView, filter: TagFilter, config: &CullConfig) -> Self {
        Self {
            frustum: view.frustum(),
            inverse_view: view.inverse_view(),
            bin: RenderBin::new(view.clone()),
            filter,
            no_cull_tag: config.no_cull_tag.clone(),
            no_cull_exemption: true,
            cull_directional_lights: config.cull_directional_lights,
            visited_meshes: 0,
            visited_lights: 0,
        }
    }

    /// Whether meshes tagged with the no-cull tag skip the frustum test
    ///
    /// On by default. Shadow caster selection turns it off so that a
    /// `no_cull` mesh only casts when it lies inside the light's volume.
    #[must_use]
    pub fn with_no_cull_exemption(mut self, exempt: bool) -> Self {
        self.no_cull_exemption = exempt;
        self
    }

    /// Meshes that passed the tag filter, whether or not they were visible
    pub fn visited_meshes(&self) -> usize {
        self.visited_meshes
    }

    /// Lights that passed the tag filter, whether or not they were relevant
    pub fn visited_lights(&self) -> usize {
        self.visited_lights
    }

    /// The bin collected so far
    pub fn render_bin(&self) -> &RenderBin<'a> {
        &self.bin
    }

    /// Finish culling; the bin's scene reference is left for the caller to set
    pub fn into_render_bin(self) -> RenderBin<'a> {
        debug!(
            "Culled {} mesh(es) to {} item(s), {} light(s) to {}",
            self.visited_meshes,
            self.bin.items.len(),
            self.visited_lights,
            self.bin.lights.len()
        );
        self.bin
    }

    fn light_is_relevant(&self, light: &Light, world: &Mat4) -> bool {
        if light.light_type() == LightType::Directional && !self.cull_directional_lights {
            return true;
        }
        let sphere = BoundingSphere::new(world.translation_part(), light.radius());
        self.frustum.intersects_sphere(&sphere)
    }
}

impl<'a> Visitor<'a> for CullVisitor<'a> {
    fn visit_mesh(&mut self, visit: &Visit<'a>, mesh: &'a Mesh) {
        if !self.filter.selects(visit.node.tags()) {
            return;
        }
        self.visited_meshes += 1;

        let world_transform = self.inverse_view * visit.transform;
        let visible = (self.no_cull_exemption && visit.node.has_tag(&self.no_cull_tag))
            || self.frustum.intersects_aabb(&mesh.bounding_box(&world_transform));

        if visible {
            self.bin.items.push(RenderItem {
                node: visit.id,
                mesh,
                transform: visit.transform,
                world_transform,
            });
        }
    }

    fn visit_light(&mut self, visit: &Visit<'a>, light: &'a Light) {
        if !self.filter.selects(visit.node.tags()) {
            return;
        }
        self.visited_lights += 1;

        let world_transform = self.inverse_view * visit.transform;
        if self.light_is_relevant(light, &world_transform) {
            self.bin.lights.push(LightItem {
                node: visit.id,
                light,
                transform: visit.transform,
                world_transform,
            });
        }
    }
}

/// Cull `graph` for `view` and return a bin that refers back to `graph`
pub fn cull<'a>(graph: &'a SceneGraph, view: &CameraView, filter: TagFilter, config: &CullConfig) -> RenderBin<'a> {
    let mut visitor = CullVisitor::new(view, filter, config);
    graph.traverse(*view.view(), &mut visitor);

    let mut bin = visitor.into_render_bin();
    bin.scene = Some(graph);
    bin
}
