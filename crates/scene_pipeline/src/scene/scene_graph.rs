//! Scene graph storage
//!
//! Nodes live in a slot-map arena. Parents own their children through id
//! lists, children point back with a plain parent id, so there are no
//! reference cycles and removing a node releases its whole subtree.

use slotmap::SlotMap;

use crate::foundation::math::Mat4;
use crate::scene::camera::CameraView;
use crate::scene::object::{NodeId, Object3D};
use crate::scene::visitor::{self, Visitor};
use crate::scene::{SceneError, SceneResult};

/// Hierarchical scene
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Object3D>,
    root: NodeId,
    skybox: Option<NodeId>,
}

impl SceneGraph {
    /// Create a scene holding only an enabled root node
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Object3D::new("scene root"));
        Self {
            nodes,
            root,
            skybox: None,
        }
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Access a node
    pub fn get(&self, id: NodeId) -> Option<&Object3D> {
        self.nodes.get(id)
    }

    /// Mutably access a node
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Object3D> {
        self.nodes.get_mut(id)
    }

    fn node(&self, id: NodeId) -> SceneResult<&Object3D> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Attach `object` under `parent`, returning its id
    pub fn add(&mut self, parent: NodeId, mut object: Object3D) -> SceneResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }

        object.parent = Some(parent);
        object.children.clear();
        let id = self.nodes.insert(object);
        self.nodes[parent].children.push(id);

        log::trace!("Added node {:?} under {:?}", id, parent);
        Ok(id)
    }

    /// Remove a node and its whole subtree, returning how many nodes were removed
    pub fn remove(&mut self, id: NodeId) -> SceneResult<usize> {
        if id == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }
        let parent = self.node(id)?.parent;

        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }

        let mut removed = 0;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next) {
                pending.extend(node.children);
                removed += 1;
            }
        }

        if self.skybox.is_some_and(|skybox| !self.nodes.contains_key(skybox)) {
            self.skybox = None;
        }

        log::trace!("Removed {} node(s) starting at {:?}", removed, id);
        Ok(removed)
    }

    /// Move `id` under `new_parent`
    ///
    /// Rejects moves that would put a node below itself.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> SceneResult<()> {
        if id == self.root {
            return Err(SceneError::WouldCreateCycle(id));
        }
        self.node(new_parent)?;
        let old_parent = self.node(id)?.parent;

        if self.ancestors(new_parent).any(|ancestor| ancestor == id) || new_parent == id {
            return Err(SceneError::WouldCreateCycle(id));
        }

        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(p)) {
            old.children.retain(|child| *child != id);
        }
        self.nodes[new_parent].children.push(id);
        self.nodes[id].parent = Some(new_parent);
        Ok(())
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Object3D::parent)
    }

    /// Children of a node (empty for unknown ids)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Object3D::children).unwrap_or(&[])
    }

    /// Iterate over the ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// First node with the given name, in arena order
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name() == name)
            .map(|(id, _)| id)
    }

    /// Iterate over all nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Object3D)> {
        self.nodes.iter()
    }

    /// Fresh world transform: product of all ancestor local transforms and the node's own
    pub fn world_transform(&self, id: NodeId) -> SceneResult<Mat4> {
        let mut transform = *self.node(id)?.transform();
        for ancestor in self.ancestors(id) {
            transform = self.nodes[ancestor].transform() * transform;
        }
        Ok(transform)
    }

    /// Refresh every node's cached world transform from the root down
    pub fn update_world_transforms(&mut self) {
        let mut pending = vec![(self.root, Mat4::identity())];
        while let Some((id, parent_transform)) = pending.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            node.world_transform = parent_transform * node.transform();
            let world = node.world_transform;
            pending.extend(node.children.iter().map(|child| (*child, world)));
        }
    }

    /// Camera view of a camera node, placed by its fresh world transform
    pub fn camera_view(&self, id: NodeId) -> SceneResult<CameraView> {
        let camera = self.node(id)?.as_camera().ok_or(SceneError::NotACamera(id))?;
        camera.view(&self.world_transform(id)?)
    }

    /// Designate the node whose environment map feeds image-based lighting
    pub fn set_skybox(&mut self, skybox: Option<NodeId>) -> SceneResult<()> {
        if let Some(id) = skybox {
            self.node(id)?;
        }
        self.skybox = skybox;
        Ok(())
    }

    /// Current skybox node
    pub fn skybox(&self) -> Option<NodeId> {
        self.skybox
    }

    /// Walk the whole scene with `visitor`, starting from `seed`
    pub fn traverse<'a>(&'a self, seed: Mat4, visitor: &mut dyn Visitor<'a>) {
        visitor::walk(self, self.root, seed, visitor);
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
