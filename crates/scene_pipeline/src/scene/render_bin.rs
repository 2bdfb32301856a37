//! Render bins
//!
//! A [`RenderBin`] is the per-frame, per-camera output of culling: the
//! visible meshes and relevant lights with their eye-space transforms. It
//! borrows the scene and is thrown away once the renderer has consumed it.
//!
//! [`sort_render_bin`] partitions the items into opaque and transparent
//! lists and orders each one for drawing.

use std::cmp::Ordering;

use crate::core::config::{SortConfig, TransparentOrder};
use crate::foundation::math::Mat4;
use crate::scene::camera::CameraView;
use crate::scene::light::Light;
use crate::scene::mesh::{MaterialId, Mesh};
use crate::scene::object::NodeId;
use crate::scene::scene_graph::SceneGraph;

/// A visible mesh
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<'a> {
    /// Mesh node id
    pub node: NodeId,
    /// Mesh data
    pub mesh: &'a Mesh,
    /// Model-view transform (object to eye space)
    pub transform: Mat4,
    /// Model transform (object to world space)
    pub world_transform: Mat4,
}

impl RenderItem<'_> {
    /// Eye-space depth of the object origin (negative in front of the camera)
    pub fn eye_depth(&self) -> f32 {
        self.transform.m34
    }

    /// Primary material id
    pub fn material_id(&self) -> Option<MaterialId> {
        self.mesh.material_id()
    }
}

/// A light relevant to the view
#[derive(Debug, Clone, Copy)]
pub struct LightItem<'a> {
    /// Light node id
    pub node: NodeId,
    /// Light data
    pub light: &'a Light,
    /// Light-to-eye transform
    pub transform: Mat4,
    /// Light-to-world transform
    pub world_transform: Mat4,
}

/// Culling output for one camera pass
#[derive(Debug, Clone)]
pub struct RenderBin<'a> {
    /// Camera the bin was culled for
    pub camera: CameraView,
    /// Scene the items point into; set by the caller, not by culling
    pub scene: Option<&'a SceneGraph>,
    /// Visible meshes in traversal order
    pub items: Vec<RenderItem<'a>>,
    /// Relevant lights in traversal order
    pub lights: Vec<LightItem<'a>>,
}

impl<'a> RenderBin<'a> {
    /// Empty bin for a camera
    pub fn new(camera: CameraView) -> Self {
        Self {
            camera,
            scene: None,
            items: Vec::new(),
            lights: Vec::new(),
        }
    }

    /// Whether nothing survived culling
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.lights.is_empty()
    }
}

/// A render bin split into draw lists
#[derive(Debug, Clone)]
pub struct SortedRenderBin<'a> {
    /// Camera the bin was culled for
    pub camera: CameraView,
    /// Scene back-reference carried over from the bin
    pub scene: Option<&'a SceneGraph>,
    /// Opaque items, front to back
    pub opaque: Vec<RenderItem<'a>>,
    /// Transparent items, in the configured order
    pub transparent: Vec<RenderItem<'a>>,
    /// Lights in traversal order
    pub lights: Vec<LightItem<'a>>,
}

impl SortedRenderBin<'_> {
    /// Total number of mesh items
    pub fn item_count(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }
}

fn compare_depth(lhs: &RenderItem<'_>, rhs: &RenderItem<'_>) -> Ordering {
    lhs.eye_depth().total_cmp(&rhs.eye_depth())
}

fn compare_material(lhs: &RenderItem<'_>, rhs: &RenderItem<'_>) -> Ordering {
    lhs.material_id().cmp(&rhs.material_id())
}

/// Order opaque items by descending eye-space Z (front to back), then material
pub fn sort_opaque(items: &mut [RenderItem<'_>]) {
    items.sort_by(|lhs, rhs| compare_depth(rhs, lhs).then_with(|| compare_material(lhs, rhs)));
}

/// Order transparent items
///
/// [`TransparentOrder::MaterialThenDepth`] sorts ascending by material, then
/// ascending eye-space Z. [`TransparentOrder::BackToFront`] sorts ascending by
/// eye-space Z (furthest first) and uses the material only to break ties.
pub fn sort_transparent(items: &mut [RenderItem<'_>], order: TransparentOrder) {
    match order {
        TransparentOrder::MaterialThenDepth => {
            items.sort_by(|lhs, rhs| compare_material(lhs, rhs).then_with(|| compare_depth(lhs, rhs)));
        }
        TransparentOrder::BackToFront => {
            items.sort_by(|lhs, rhs| compare_depth(lhs, rhs).then_with(|| compare_material(lhs, rhs)));
        }
    }
}

/// Partition a bin into opaque and transparent lists and sort both
///
/// An item is opaque iff every material of its mesh is opaque. Sorting is
/// stable, so re-sorting a sorted list leaves it unchanged.
pub fn sort_render_bin<'a>(bin: RenderBin<'a>, config: &SortConfig) -> SortedRenderBin<'a> {
    let (mut opaque, mut transparent): (Vec<_>, Vec<_>) =
        bin.items.into_iter().partition(|item| item.mesh.is_opaque());

    sort_opaque(&mut opaque);
    sort_transparent(&mut transparent, config.transparent_order);

    SortedRenderBin {
        camera: bin.camera,
        scene: bin.scene,
        opaque,
        transparent,
        lights: bin.lights,
    }
}
