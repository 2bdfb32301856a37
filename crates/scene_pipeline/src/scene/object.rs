//! Scene nodes
//!
//! An [`Object3D`] is one node of the scene graph: a name, an enable flag, a
//! tag set, a local transform and a typed payload ([`NodeKind`]). Tree links
//! are arena ids owned by the [`SceneGraph`](super::SceneGraph).

use std::collections::HashSet;

use slotmap::new_key_type;

use crate::foundation::math::{Mat4, Vec3};
use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::mesh::Mesh;
use crate::scene::visitor::{Visit, Visitor};

new_key_type! {
    /// Stable identifier of a node in a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

/// Payload carried by a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Plain grouping node
    Plain,
    /// Renderable geometry
    Mesh(Mesh),
    /// Light source
    Light(Light),
    /// Camera
    Camera(Camera),
}

/// Discriminant of [`NodeKind`], used for type-based selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Plain grouping node
    Plain,
    /// Mesh node
    Mesh,
    /// Light node
    Light,
    /// Camera node
    Camera,
}

impl NodeKind {
    /// Discriminant of this payload
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Plain => ObjectKind::Plain,
            Self::Mesh(_) => ObjectKind::Mesh,
            Self::Light(_) => ObjectKind::Light,
            Self::Camera(_) => ObjectKind::Camera,
        }
    }
}

/// A node of the scene graph
#[derive(Debug, Clone)]
pub struct Object3D {
    name: String,
    enabled: bool,
    tags: HashSet<String>,
    transform: Mat4,
    kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) world_transform: Mat4,
}

impl Object3D {
    /// Create a plain node
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Plain)
    }

    /// Create a mesh node
    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::with_kind(name, NodeKind::Mesh(mesh))
    }

    /// Create a light node
    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::with_kind(name, NodeKind::Light(light))
    }

    /// Create a camera node
    pub fn camera(name: impl Into<String>, camera: Camera) -> Self {
        Self::with_kind(name, NodeKind::Camera(camera))
    }

    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            tags: HashSet::new(),
            transform: Mat4::identity(),
            kind,
            parent: None,
            children: Vec::new(),
            world_transform: Mat4::identity(),
        }
    }

    /// Set the local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Set the local transform to a pure translation
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform = Mat4::new_translation(&position);
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the enable flag
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the node (and therefore its subtree) takes part in traversals
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the node
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tag set
    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    /// Check for a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Add a tag, returns `false` if it was already present
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Remove a tag, returns `true` if it was present
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Replace the local transform
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Local position (translation column of the local transform)
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.transform.m14, self.transform.m24, self.transform.m34)
    }

    /// Replace the translation of the local transform
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.m14 = position.x;
        self.transform.m24 = position.y;
        self.transform.m34 = position.z;
    }

    /// Cached world transform
    ///
    /// Only valid after [`SceneGraph::update_world_transforms`](super::SceneGraph::update_world_transforms);
    /// use [`SceneGraph::world_transform`](super::SceneGraph::world_transform)
    /// for an always-fresh value.
    pub fn cached_world_transform(&self) -> &Mat4 {
        &self.world_transform
    }

    /// Payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable payload
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Payload discriminant
    pub fn object_kind(&self) -> ObjectKind {
        self.kind.kind()
    }

    /// Mesh payload, if this is a mesh node
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Light payload, if this is a light node
    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Mutable light payload, if this is a light node
    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Camera payload, if this is a camera node
    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Parent id (`None` for the root)
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Double dispatch into the visitor hook matching this node's payload
    pub fn accept<'a>(&'a self, visit: &Visit<'a>, visitor: &mut dyn Visitor<'a>) {
        match &self.kind {
            NodeKind::Plain => visitor.visit_object(visit),
            NodeKind::Mesh(mesh) => visitor.visit_mesh(visit, mesh),
            NodeKind::Light(light) => visitor.visit_light(visit, light),
            NodeKind::Camera(camera) => visitor.visit_camera(visit, camera),
        }
    }
}
