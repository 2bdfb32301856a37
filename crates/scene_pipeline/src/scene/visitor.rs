//! Scene traversal
//!
//! Depth-first, pre-order walks over the scene graph. The accumulated
//! transform is threaded through the recursion by value: each callback sees
//! `seed * ancestors... * local` for the node being visited, where `seed` is
//! whatever the caller started the walk with (identity for world space, a
//! camera's view matrix for eye space).
//!
//! A disabled node prunes its whole subtree. Tag filtering, in contrast, is
//! applied by each visitor to the node itself and never stops the descent.

use std::collections::HashSet;

use crate::foundation::math::Mat4;
use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::mesh::Mesh;
use crate::scene::object::{NodeId, Object3D, ObjectKind};
use crate::scene::scene_graph::SceneGraph;

/// The node currently being visited
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    /// Node id
    pub id: NodeId,
    /// Node data
    pub node: &'a Object3D,
    /// Accumulated transform including the node's own local transform
    pub transform: Mat4,
    /// Depth below the traversal root (root = 0)
    pub depth: usize,
}

/// Per-type traversal hooks
///
/// The typed hooks fall back to [`Visitor::visit_object`], so a visitor only
/// overrides the node types it cares about.
pub trait Visitor<'a> {
    /// Called for plain nodes and for every typed hook that is not overridden
    fn visit_object(&mut self, _visit: &Visit<'a>) {}

    /// Called for mesh nodes
    fn visit_mesh(&mut self, visit: &Visit<'a>, _mesh: &'a Mesh) {
        self.visit_object(visit);
    }

    /// Called for light nodes
    fn visit_light(&mut self, visit: &Visit<'a>, _light: &'a Light) {
        self.visit_object(visit);
    }

    /// Called for camera nodes
    fn visit_camera(&mut self, visit: &Visit<'a>, _camera: &'a Camera) {
        self.visit_object(visit);
    }
}

/// Walk the subtree at `root`, seeding the accumulated transform with `seed`
///
/// Assumes an acyclic graph, which [`SceneGraph`] maintains.
pub fn walk<'a>(graph: &'a SceneGraph, root: NodeId, seed: Mat4, visitor: &mut dyn Visitor<'a>) {
    walk_node(graph, root, seed, 0, visitor);
}

fn walk_node<'a>(
    graph: &'a SceneGraph,
    id: NodeId,
    parent_transform: Mat4,
    depth: usize,
    visitor: &mut dyn Visitor<'a>,
) {
    let Some(node) = graph.get(id) else {
        return;
    };
    if !node.enabled() {
        return;
    }

    let transform = parent_transform * node.transform();
    let visit = Visit { id, node, transform, depth };
    node.accept(&visit, visitor);

    for &child in node.children() {
        walk_node(graph, child, transform, depth + 1, visitor);
    }
}

/// Tag-based node selection
///
/// A node is selected iff the filter is empty or the node carries at least
/// one of the filter's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: HashSet<String>,
}

impl TagFilter {
    /// Filter that selects everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter selecting nodes with any of `tags`
    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the filter selects every node
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Filter tags
    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    /// Selection predicate; stops at the first shared tag
    pub fn selects(&self, node_tags: &HashSet<String>) -> bool {
        self.tags.is_empty() || node_tags.iter().any(|tag| self.tags.contains(tag))
    }
}

/// Collects enabled nodes of the requested kinds that pass a tag filter
#[derive(Debug, Clone)]
pub struct SelectVisitor {
    kinds: Option<HashSet<ObjectKind>>,
    filter: TagFilter,
    selected: Vec<NodeId>,
}

impl SelectVisitor {
    /// Select nodes of any kind
    pub fn new(filter: TagFilter) -> Self {
        Self {
            kinds: None,
            filter,
            selected: Vec::new(),
        }
    }

    /// Select only nodes of the given kinds
    pub fn of_kinds(kinds: impl IntoIterator<Item = ObjectKind>, filter: TagFilter) -> Self {
        Self {
            kinds: Some(kinds.into_iter().collect()),
            filter,
            selected: Vec::new(),
        }
    }

    /// Selected ids in traversal order
    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    /// Consume the visitor and return the selection
    pub fn into_selected(self) -> Vec<NodeId> {
        self.selected
    }
}

impl<'a> Visitor<'a> for SelectVisitor {
    fn visit_object(&mut self, visit: &Visit<'a>) {
        let kind_matches = self
            .kinds
            .as_ref()
            .map_or(true, |kinds| kinds.contains(&visit.node.object_kind()));

        if kind_matches && self.filter.selects(visit.node.tags()) {
            self.selected.push(visit.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use crate::scene::light::{Light, LightType};
    use approx::assert_relative_eq;

    fn tags(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_tag_filter_predicate() {
        let node = tags(&["debug"]);
        assert!(TagFilter::all().selects(&node));
        assert!(!TagFilter::any_of(["ui"]).selects(&node));
        assert!(TagFilter::any_of(["debug", "ui"]).selects(&node));
        assert!(!TagFilter::any_of(["ui"]).selects(&HashSet::new()));
        assert!(TagFilter::all().selects(&HashSet::new()));
    }

    /// Records every visited node with its transform and depth
    #[derive(Default)]
    struct Recorder {
        visits: Vec<(String, Mat4, usize)>,
        lights: usize,
    }

    impl<'a> Visitor<'a> for Recorder {
        fn visit_object(&mut self, visit: &Visit<'a>) {
            self.visits.push((visit.node.name().to_string(), visit.transform, visit.depth));
        }

        fn visit_light(&mut self, visit: &Visit<'a>, _light: &'a Light) {
            self.lights += 1;
            self.visit_object(visit);
        }
    }

    fn chain() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph
            .add(root, Object3D::new("a").with_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let b = graph
            .add(a, Object3D::new("b").with_position(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        let c = graph
            .add(b, Object3D::light("c", Light::new(LightType::Point)).with_position(Vec3::new(0.0, 0.0, 3.0)))
            .unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn test_transforms_accumulate_in_preorder() {
        let (graph, ..) = chain();
        let mut recorder = Recorder::default();
        walk(&graph, graph.root(), Mat4::identity(), &mut recorder);

        let names: Vec<&str> = recorder.visits.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, ["scene root", "a", "b", "c"]);

        let depths: Vec<usize> = recorder.visits.iter().map(|(_, _, d)| *d).collect();
        assert_eq!(depths, [0, 1, 2, 3]);

        let (_, leaf, _) = &recorder.visits[3];
        assert_relative_eq!(leaf.translation_part(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(recorder.lights, 1);
    }

    #[test]
    fn test_seed_transform_is_applied() {
        let (graph, ..) = chain();
        let mut recorder = Recorder::default();
        let seed = Mat4::new_translation(&Vec3::new(0.0, 0.0, -10.0));
        walk(&graph, graph.root(), seed, &mut recorder);

        let (_, leaf, _) = &recorder.visits[3];
        assert_relative_eq!(leaf.translation_part(), Vec3::new(1.0, 2.0, -7.0));
    }

    #[test]
    fn test_disabled_node_prunes_subtree() {
        let (mut graph, a, ..) = chain();
        graph.get_mut(a).unwrap().set_enabled(false);

        let mut recorder = Recorder::default();
        walk(&graph, graph.root(), Mat4::identity(), &mut recorder);
        assert_eq!(recorder.visits.len(), 1);
        assert_eq!(recorder.lights, 0);
    }

    #[test]
    fn test_select_visitor_by_kind_and_tag() {
        let (mut graph, a, _, c) = chain();
        graph.get_mut(a).unwrap().add_tag("group");
        graph.get_mut(c).unwrap().add_tag("group");

        let mut lights = SelectVisitor::of_kinds([ObjectKind::Light], TagFilter::all());
        walk(&graph, graph.root(), Mat4::identity(), &mut lights);
        assert_eq!(lights.selected(), &[c]);

        let mut grouped = SelectVisitor::new(TagFilter::any_of(["group"]));
        walk(&graph, graph.root(), Mat4::identity(), &mut grouped);
        assert_eq!(grouped.into_selected(), vec![a, c]);
    }
}
