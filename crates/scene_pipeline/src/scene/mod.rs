//! Scene management system
//!
//! Object graph, traversal and the per-frame culling stage that turns a
//! scene plus a camera into a [`RenderBin`].
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (arena of Object3D)
//!      ↓  walk(seed = camera view)
//! CullVisitor
//!      ↓
//! RenderBin → sort_render_bin → SortedRenderBin
//!      ↓
//! Renderer (forward / deferred)
//! ```

use thiserror::Error;

pub mod bounds;
pub mod camera;
pub mod cull_visitor;
pub mod light;
pub mod mesh;
pub mod object;
pub mod render_bin;
pub mod scene_graph;
pub mod visitor;

#[cfg(test)]
mod tests;

pub use bounds::{BoundingSphere, Frustum, FrustumPlane, Plane, AABB, OBB};
pub use camera::{Camera, CameraView, Projection};
pub use cull_visitor::{cull, CullVisitor};
pub use light::{Attenuation, Light, LightType};
pub use mesh::{Geometry, Material, MaterialId, MaterialTextures, Mesh};
pub use object::{NodeId, NodeKind, Object3D, ObjectKind};
pub use render_bin::{sort_opaque, sort_render_bin, sort_transparent, LightItem, RenderBin, RenderItem, SortedRenderBin};
pub use scene_graph::SceneGraph;
pub use visitor::{walk, SelectVisitor, TagFilter, Visit, Visitor};

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Id does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The root node owns the scene and cannot be removed
    #[error("The scene root cannot be removed")]
    CannotRemoveRoot,

    /// Reparenting would place a node below itself
    #[error("Moving node {0:?} would create a cycle")]
    WouldCreateCycle(NodeId),

    /// Node has no camera payload
    #[error("Node {0:?} is not a camera")]
    NotACamera(NodeId),

    /// A transform that must be inverted is singular
    #[error("Transform is not invertible")]
    NotInvertible,
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
