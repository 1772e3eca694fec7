//! Scene graph: hierarchy, transforms and lazy geometry caches
//!
//! The [`Scene`] owns every node in a slotmap arena and is the single
//! mutation point for structure and transforms. Handles stay cheap to
//! copy and go stale safely: reads on a removed node return `None` or
//! an empty slice instead of touching freed storage.
//!
//! Transform writes are push-based invalidation only. They flag the
//! written node's whole subtree dirty and defer all recomputation to
//! the next geometry read, so editing many nodes between reads costs
//! one cache rebuild per dirty node, not one per write.

use std::collections::HashSet;

use bitflags::bitflags;
use slotmap::SlotMap;

use crate::core::config::ReparentPolicy;
use crate::events::{CommandQueue, Event};
use crate::foundation::math::{Placement, Quat, Vec3};
use crate::scene::camera::{StereoCamera, StereoPair};
use crate::scene::node::{NodeId, NodeKind, SceneNode, Segment};

/// Structural operation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The target node was not found where the caller said it would be
    #[error("scene object not found where expected")]
    TargetNotFound,
    /// Moving more than one object at a time is not supported
    #[error("moving multiple objects is not supported")]
    MultiMoveUnsupported,
}

/// Result of a [`Scene::move_to`] request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The selected node was spliced into its destination
    Moved,
    /// Nothing moved: empty selection, or a move into the node's own
    /// subtree was refused to keep the graph acyclic
    Rejected,
}

bitflags! {
    /// Where to splice a moved node relative to the drop target.
    ///
    /// `ANY` is the permissive rule used by plain drops; its bottom bit
    /// wins, so it behaves like [`InsertRule::BOTTOM`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InsertRule: u8 {
        /// Insert before the target in its parent's child list
        const TOP = 0b001;
        /// Insert after the target in its parent's child list
        const BOTTOM = 0b010;
        /// Insert as the target's first child
        const CENTER = 0b100;
        /// Accept any placement
        const ANY = Self::TOP.bits() | Self::BOTTOM.bits() | Self::CENTER.bits();
    }
}

const EMPTY_IDS: &[NodeId] = &[];
const EMPTY_SEGMENTS: &[Segment] = &[];

/// The editable scene: node arena, selection and clear notifications.
///
/// Three nodes exist for the scene's whole lifetime and are not part of
/// the user object set: the root group, the stereo camera and the
/// cruciform cursor. [`Scene::clear_all`] detaches the latter two
/// instead of destroying them.
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
    /// User-created nodes; excludes the root, camera and cursor.
    objects: HashSet<NodeId>,
    selection: HashSet<NodeId>,
    root: NodeId,
    camera: NodeId,
    cursor: NodeId,
    on_clear: Event<()>,
}

impl Scene {
    /// Default cursor arm size used until settings override it
    pub const DEFAULT_CURSOR_SIZE: f32 = 0.1;

    /// Create a scene containing the root, camera and cursor.
    ///
    /// The queue backs the clear notification event; handlers attach
    /// and detach through it like any other deferred work.
    pub fn new(queue: &CommandQueue) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::group("Root"));
        let camera = nodes.insert(SceneNode::camera_node(StereoCamera::default()));
        let cursor = nodes.insert(SceneNode::cross("cursor", Self::DEFAULT_CURSOR_SIZE));

        for singleton in [camera, cursor] {
            nodes[singleton].parent = Some(root);
            nodes[root].children.push(singleton);
        }

        Self {
            nodes,
            objects: HashSet::new(),
            selection: HashSet::new(),
            root,
            camera,
            cursor,
            on_clear: Event::new(queue),
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Handle of the root group
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Handle of the stereo camera node
    pub fn camera_id(&self) -> NodeId {
        self.camera
    }

    /// Handle of the cruciform cursor node
    pub fn cursor_id(&self) -> NodeId {
        self.cursor
    }

    /// Borrow a node, `None` if the handle is stale
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Mutably borrow a node for vertex and payload edits.
    ///
    /// Transform writes go through the scene instead so the subtree is
    /// invalidated; [`SceneNode`] exposes no transform setters.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Whether the handle still refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Children of a node in order; empty for stale handles
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(EMPTY_IDS, |n| &n.children)
    }

    /// Number of user-created objects, singletons excluded
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Preorder handles of a node's subtree, the node itself first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Add a node to the selection
    pub fn select(&mut self, id: NodeId) {
        if self.nodes.contains_key(id) {
            self.selection.insert(id);
        }
    }

    /// Remove a node from the selection
    pub fn deselect(&mut self, id: NodeId) {
        self.selection.remove(&id);
    }

    /// Drop the whole selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Currently selected handles
    pub fn selection(&self) -> &HashSet<NodeId> {
        &self.selection
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Insert a node under `parent`, or under the root when `None`.
    ///
    /// The node is appended to the parent's child list and registered
    /// as a user object.
    pub fn insert(&mut self, parent: Option<NodeId>, node: SceneNode) -> NodeId {
        let parent = match parent {
            Some(p) if self.nodes.contains_key(p) => p,
            Some(p) => {
                log::warn!("insert parent {p:?} is stale, attaching to root");
                self.root
            }
            None => self.root,
        };

        let id = self.nodes.insert(node);
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        self.objects.insert(id);
        id
    }

    /// Remove `target` and its whole subtree from under `parent`.
    ///
    /// Fails without touching the scene when `target` is not a child of
    /// `parent` or is not a user object; the root, camera and cursor
    /// cannot be deleted.
    pub fn delete(&mut self, parent: NodeId, target: NodeId) -> Result<(), SceneError> {
        if !self.objects.contains(&target) {
            log::error!("attempted to delete a non-object node");
            return Err(SceneError::TargetNotFound);
        }
        let Some(position) = self
            .nodes
            .get(parent)
            .and_then(|p| p.children.iter().position(|&c| c == target))
        else {
            log::error!("object to delete was not found among the parent's children");
            return Err(SceneError::TargetNotFound);
        };

        self.nodes[parent].children.remove(position);
        for id in self.descendants(target) {
            self.objects.remove(&id);
            self.selection.remove(&id);
            self.nodes.remove(id);
        }
        Ok(())
    }

    /// Reparent the selected node next to `target` per `rule`.
    ///
    /// Exactly one node may be selected; more is an error, none is a
    /// quiet [`MoveOutcome::Rejected`]. A destination inside the
    /// selected node's own subtree is also rejected, clearing the
    /// selection so a stuck drag cannot retry the same cycle.
    ///
    /// `target_index` is the target's position in its parent's child
    /// list; the moved node lands before or after it for `TOP` and
    /// `BOTTOM`, or becomes the target's first child for `CENTER`.
    /// With [`ReparentPolicy::Adapt`] the node keeps its world
    /// placement across the move, otherwise its local placement.
    pub fn move_to(
        &mut self,
        target: NodeId,
        target_index: usize,
        rule: InsertRule,
        policy: ReparentPolicy,
    ) -> Result<MoveOutcome, SceneError> {
        if self.selection.len() > 1 {
            log::error!("moving multiple objects is not supported");
            return Err(SceneError::MultiMoveUnsupported);
        }
        let Some(&id) = self.selection.iter().next() else {
            return Ok(MoveOutcome::Rejected);
        };
        if !self.nodes.contains_key(id) || !self.nodes.contains_key(target) {
            log::error!("move endpoints are stale");
            return Err(SceneError::TargetNotFound);
        }

        // Walk the destination's ancestor chain, itself included. The
        // selected node appearing there would make it its own ancestor.
        let mut ancestor = Some(target);
        while let Some(current) = ancestor {
            if self.selection.contains(&current) {
                log::debug!("rejecting move into the moved node's own subtree");
                self.selection.clear();
                return Ok(MoveOutcome::Rejected);
            }
            ancestor = self.nodes[current].parent;
        }

        // The root is every destination's ancestor, so the selected
        // node has a parent here.
        let Some(source_parent) = self.nodes[id].parent else {
            return Ok(MoveOutcome::Rejected);
        };
        // CENTER applies only on its own; a permissive mask like ANY
        // falls back to sibling placement through its BOTTOM bit.
        let as_center = rule.contains(InsertRule::CENTER)
            && !rule.intersects(InsertRule::TOP | InsertRule::BOTTOM);
        let dest_parent = if as_center {
            target
        } else {
            match self.nodes[target].parent {
                Some(p) => p,
                None => {
                    log::error!("move target has no parent to splice into");
                    return Err(SceneError::TargetNotFound);
                }
            }
        };
        let Some(source_index) = self.nodes[source_parent]
            .children
            .iter()
            .position(|&c| c == id)
        else {
            log::error!("moved object is missing from its parent's children");
            return Err(SceneError::TargetNotFound);
        };

        self.invalidate(id);
        let kept_placement = match policy {
            ReparentPolicy::Adapt => {
                Some((self.world_position_of(id), self.world_rotation_of(id)))
            }
            ReparentPolicy::None => None,
        };

        let same_list = source_parent == dest_parent && !as_center;
        let slot = if as_center {
            0
        } else if rule.contains(InsertRule::BOTTOM) {
            target_index + 1
        } else if same_list && source_index > target_index {
            // Removing the source first shifts the target up one slot.
            target_index.saturating_sub(1)
        } else {
            target_index
        };

        if same_list {
            let children = &mut self.nodes[source_parent].children;
            if slot <= source_index {
                children.remove(source_index);
                let slot = slot.min(children.len());
                children.insert(slot, id);
            } else {
                let slot = slot.min(children.len());
                children.insert(slot, id);
                children.remove(source_index);
            }
        } else {
            self.nodes[source_parent].children.remove(source_index);
            let len = self.nodes[dest_parent].children.len();
            self.nodes[dest_parent].children.insert(slot.min(len), id);
        }
        self.nodes[id].parent = Some(dest_parent);

        if let Some((position, rotation)) = kept_placement {
            self.set_world_position(id, position);
            self.set_world_rotation(id, rotation);
        }
        Ok(MoveOutcome::Moved)
    }

    /// Remove every user object, leaving the singletons detached.
    ///
    /// Fires the clear notification first, then empties the root's
    /// child list, the object set and the selection. The camera and
    /// cursor survive without a parent and can be re-attached by a
    /// later document load.
    pub fn clear_all(&mut self) {
        self.on_clear.invoke(&());

        for singleton in [self.camera, self.cursor] {
            self.nodes[singleton].parent = None;
            self.nodes[singleton].dirty = true;
        }
        for id in std::mem::take(&mut self.objects) {
            self.nodes.remove(id);
        }
        self.nodes[self.root].children.clear();
        self.selection.clear();
    }

    /// Event fired at the start of [`Scene::clear_all`]
    pub fn on_clear(&self) -> &Event<()> {
        &self.on_clear
    }

    pub(crate) fn attach_singleton(&mut self, id: NodeId) {
        if self.nodes[id].parent.is_none() {
            self.nodes[id].parent = Some(self.root);
            self.nodes[self.root].children.push(id);
        }
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Placements from the node up to the root, the node's own first
    fn placement_chain(&self, id: NodeId) -> Vec<Placement> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(c)) {
            chain.push(Placement::from_position_rotation(
                node.local_position,
                node.local_rotation,
            ));
            current = node.parent;
        }
        chain
    }

    fn world_position_of(&self, id: NodeId) -> Vec3 {
        let mut p = Vec3::zeros();
        for placement in self.placement_chain(id) {
            p = placement.apply(p);
        }
        p
    }

    fn world_rotation_of(&self, id: NodeId) -> Quat {
        let mut rotation = Quat::identity();
        for placement in self.placement_chain(id).iter().rev() {
            rotation = rotation * placement.rotation;
        }
        rotation
    }

    /// World-space position of a node, `None` for stale handles
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.nodes.contains_key(id).then(|| self.world_position_of(id))
    }

    /// World-space rotation of a node, `None` for stale handles
    pub fn world_rotation(&self, id: NodeId) -> Option<Quat> {
        self.nodes.contains_key(id).then(|| self.world_rotation_of(id))
    }

    /// Map a point from the node's local space into world space
    pub fn to_world_position(&self, id: NodeId, point: Vec3) -> Option<Vec3> {
        self.nodes.contains_key(id).then(|| {
            let mut p = point;
            for placement in self.placement_chain(id) {
                p = placement.apply(p);
            }
            p
        })
    }

    /// Map a world-space point into the node's local space
    pub fn to_local_position(&self, id: NodeId, point: Vec3) -> Option<Vec3> {
        self.nodes.contains_key(id).then(|| {
            let mut p = point;
            for placement in self.placement_chain(id).iter().rev() {
                p = placement.apply_inverse(p);
            }
            p
        })
    }

    /// Set a node's position relative to its parent.
    ///
    /// Stale handles are ignored with a log entry; the same holds for
    /// the other transform setters.
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) {
        if !self.nodes.contains_key(id) {
            log::warn!("transform write to stale node {id:?}");
            return;
        }
        self.invalidate(id);
        self.nodes[id].local_position = position;
    }

    /// Set a node's rotation relative to its parent
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) {
        if !self.nodes.contains_key(id) {
            log::warn!("transform write to stale node {id:?}");
            return;
        }
        self.invalidate(id);
        self.nodes[id].local_rotation = rotation;
    }

    /// Move a node to a world-space position, compensating for every
    /// ancestor transform
    pub fn set_world_position(&mut self, id: NodeId, position: Vec3) {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent) else {
            log::warn!("transform write to stale node {id:?}");
            return;
        };
        self.invalidate(id);
        let local = match parent {
            Some(parent) => {
                let mut p = position;
                for placement in self.placement_chain(parent).iter().rev() {
                    p = placement.apply_inverse(p);
                }
                p
            }
            None => position,
        };
        self.nodes[id].local_position = local;
    }

    /// Rotate a node to a world-space orientation
    pub fn set_world_rotation(&mut self, id: NodeId, rotation: Quat) {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent) else {
            log::warn!("transform write to stale node {id:?}");
            return;
        };
        self.invalidate(id);
        let local = match parent {
            Some(parent) => self.world_rotation_of(parent).inverse() * rotation,
            None => rotation,
        };
        self.nodes[id].local_rotation = local;
    }

    /// Flag a node and its whole subtree for cache rebuild.
    ///
    /// Runs unconditionally rather than stopping at already-dirty
    /// nodes: a dirty ancestor says nothing about its descendants.
    pub fn invalidate(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.dirty = true;
            stack.extend(node.children.iter().copied());
        }
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// World-space segments of a node, rebuilding its cache if dirty.
    ///
    /// Empty for stale handles, geometry-free kinds and polylines with
    /// fewer than two vertices.
    pub fn lines(&mut self, id: NodeId) -> &[Segment] {
        if self.nodes.get(id).is_some_and(|n| n.dirty) {
            self.rebuild_cache(id);
        }
        self.nodes
            .get(id)
            .map_or(EMPTY_SEGMENTS, |n| n.kind.cached_lines())
    }

    /// Raw local-space vertices of a node; never triggers a rebuild
    pub fn vertices(&self, id: NodeId) -> &[Vec3] {
        self.nodes.get(id).map_or(&[], SceneNode::vertices)
    }

    fn rebuild_cache(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let chain = self.placement_chain(id);
        let to_world = |v: Vec3| {
            let mut p = v;
            for placement in &chain {
                p = placement.apply(p);
            }
            p
        };

        let segments = match &node.kind {
            NodeKind::PolyLine { vertices, .. } => {
                if vertices.len() < 2 {
                    Some(Vec::new())
                } else {
                    let world: Vec<Vec3> = vertices.iter().copied().map(to_world).collect();
                    Some(world.windows(2).map(|w| Segment::new(w[0], w[1])).collect())
                }
            }
            NodeKind::Mesh { vertices, edges, .. } => {
                let world: Vec<Vec3> = vertices.iter().copied().map(to_world).collect();
                Some(
                    edges
                        .iter()
                        .filter_map(|&[a, b]| {
                            Some(Segment::new(*world.get(a)?, *world.get(b)?))
                        })
                        .collect(),
                )
            }
            NodeKind::Cross { size, .. } => {
                let s = *size;
                let ends = [
                    Vec3::new(-s, 0.0, 0.0),
                    Vec3::new(s, 0.0, 0.0),
                    Vec3::new(0.0, -s, 0.0),
                    Vec3::new(0.0, s, 0.0),
                    Vec3::new(0.0, 0.0, -s),
                    Vec3::new(0.0, 0.0, s),
                ];
                Some(
                    ends.chunks_exact(2)
                        .map(|pair| Segment::new(to_world(pair[0]), to_world(pair[1])))
                        .collect(),
                )
            }
            NodeKind::Group | NodeKind::Camera(_) => None,
        };

        let node = &mut self.nodes[id];
        match (&mut node.kind, segments) {
            (
                NodeKind::PolyLine { cache, .. }
                | NodeKind::Mesh { cache, .. }
                | NodeKind::Cross { cache, .. },
                Some(segments),
            ) => *cache = segments,
            _ => {}
        }
        node.dirty = false;
    }

    // ------------------------------------------------------------------
    // Projection
    // ------------------------------------------------------------------

    /// Project a world-space segment through the scene camera
    pub fn project(&self, segment: &Segment) -> Option<StereoPair> {
        let node = self.nodes.get(self.camera)?;
        let camera = node.camera()?;
        Some(camera.project(node.local_position, segment))
    }

    /// Stereo camera parameters
    pub fn camera(&self) -> Option<&StereoCamera> {
        self.nodes.get(self.camera).and_then(SceneNode::camera)
    }

    /// Mutable stereo camera parameters
    pub fn camera_mut(&mut self) -> Option<&mut StereoCamera> {
        self.nodes.get_mut(self.camera).and_then(SceneNode::camera_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::f32::consts::FRAC_PI_2;
    use std::rc::Rc;

    fn yaw(angle: f32) -> Quat {
        Quat::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn scene() -> Scene {
        Scene::new(&CommandQueue::new())
    }

    /// Names of the children of `parent`, in order
    fn child_names(scene: &Scene, parent: NodeId) -> Vec<String> {
        scene
            .children(parent)
            .iter()
            .map(|&c| scene.node(c).map_or_else(String::new, |n| n.name().to_string()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Transform composition
    // ------------------------------------------------------------------

    #[test]
    fn world_round_trip_through_nested_rotated_groups() {
        let mut scene = scene();
        let g1 = scene.insert(None, SceneNode::group("g1"));
        let g2 = scene.insert(Some(g1), SceneNode::group("g2"));
        let leaf = scene.insert(Some(g2), SceneNode::poly_line("leaf"));

        scene.set_local_position(g1, Vec3::new(1.0, 2.0, 3.0));
        scene.set_local_rotation(g1, yaw(FRAC_PI_2));
        scene.set_local_position(g2, Vec3::new(0.0, -1.0, 0.5));
        scene.set_local_rotation(g2, yaw(0.3));
        scene.set_local_position(leaf, Vec3::new(0.25, 0.0, 0.0));

        let p = Vec3::new(0.4, -0.7, 2.1);
        let world = scene.to_world_position(leaf, p).unwrap();
        let back = scene.to_local_position(leaf, world).unwrap();
        assert_relative_eq!(back, p, epsilon = 1e-5);
    }

    #[test]
    fn set_world_position_is_read_back_exactly() {
        let mut scene = scene();
        let g1 = scene.insert(None, SceneNode::group("g1"));
        let leaf = scene.insert(Some(g1), SceneNode::poly_line("leaf"));
        scene.set_local_position(g1, Vec3::new(5.0, 0.0, 0.0));
        scene.set_local_rotation(g1, yaw(1.1));

        let target = Vec3::new(-2.0, 4.0, 1.0);
        scene.set_world_position(leaf, target);
        assert_relative_eq!(scene.world_position(leaf).unwrap(), target, epsilon = 1e-5);
    }

    #[test]
    fn set_world_rotation_is_read_back_exactly() {
        let mut scene = scene();
        let g1 = scene.insert(None, SceneNode::group("g1"));
        let leaf = scene.insert(Some(g1), SceneNode::group("leaf"));
        scene.set_local_rotation(g1, yaw(0.8));

        let target = yaw(-0.4);
        scene.set_world_rotation(leaf, target);
        let got = scene.world_rotation(leaf).unwrap();
        assert_relative_eq!(got.angle_to(&target), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn parent_rotation_carries_children_around() {
        let mut scene = scene();
        let pivot = scene.insert(None, SceneNode::group("pivot"));
        let leaf = scene.insert(Some(pivot), SceneNode::group("leaf"));
        scene.set_local_position(leaf, Vec3::new(1.0, 0.0, 0.0));

        scene.set_local_rotation(pivot, yaw(FRAC_PI_2));
        // Yaw by a quarter turn sends +x to -z.
        assert_relative_eq!(
            scene.world_position(leaf).unwrap(),
            Vec3::new(0.0, 0.0, -1.0),
            epsilon = 1e-5
        );
    }

    // ------------------------------------------------------------------
    // Lazy caches
    // ------------------------------------------------------------------

    #[test]
    fn vertex_edits_are_visible_after_one_rebuild() {
        let mut scene = scene();
        let line = scene.insert(None, SceneNode::poly_line("line"));
        let node = scene.node_mut(line).unwrap();
        node.add_vertex(Vec3::zeros());
        node.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        node.add_vertex(Vec3::new(1.0, 1.0, 0.0));

        let lines = scene.lines(line);
        assert_eq!(lines.len(), 2);
        assert_relative_eq!(lines[1].end, Vec3::new(1.0, 1.0, 0.0));
        assert!(!scene.node(line).unwrap().is_dirty());

        // A later edit dirties the node again and shows up on read.
        scene.node_mut(line).unwrap().set_vertex_y(2, 5.0);
        assert!(scene.node(line).unwrap().is_dirty());
        assert_relative_eq!(scene.lines(line)[1].end.y, 5.0);
    }

    #[test]
    fn ancestor_transform_writes_dirty_the_whole_subtree() {
        let mut scene = scene();
        let group = scene.insert(None, SceneNode::group("group"));
        let line = scene.insert(Some(group), SceneNode::poly_line("line"));
        scene
            .node_mut(line)
            .unwrap()
            .add_vertices([Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)]);

        assert_relative_eq!(scene.lines(line)[0].start, Vec3::zeros());

        scene.set_local_position(group, Vec3::new(0.0, 10.0, 0.0));
        assert!(scene.node(line).unwrap().is_dirty());
        assert_relative_eq!(scene.lines(line)[0].start, Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn clean_reads_do_not_rewrite_caches() {
        let mut scene = scene();
        let line = scene.insert(None, SceneNode::poly_line("line"));
        scene
            .node_mut(line)
            .unwrap()
            .add_vertices([Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)]);

        let first = scene.lines(line).to_vec();
        assert!(!scene.node(line).unwrap().is_dirty());
        // No intervening edits: the second read sees the same cache.
        assert_eq!(scene.lines(line), first.as_slice());
    }

    #[test]
    fn single_vertex_polyline_yields_no_segments() {
        let mut scene = scene();
        let line = scene.insert(None, SceneNode::poly_line("line"));
        scene.node_mut(line).unwrap().add_vertex(Vec3::zeros());
        assert!(scene.lines(line).is_empty());
    }

    #[test]
    fn mesh_lines_follow_explicit_edges() {
        let mut scene = scene();
        let mesh = scene.insert(None, SceneNode::mesh("mesh"));
        let node = scene.node_mut(mesh).unwrap();
        node.add_vertices([Vec3::zeros(), Vec3::x(), Vec3::y()]);
        node.connect(0, 2);
        node.connect(2, 1);
        // Out-of-range edges produce no segment.
        node.connect(1, 9);

        let lines = scene.lines(mesh).to_vec();
        assert_eq!(lines.len(), 2);
        assert_relative_eq!(lines[0].end, Vec3::y());
        assert_relative_eq!(lines[1].end, Vec3::x());
    }

    #[test]
    fn cursor_cross_has_three_axis_segments() {
        let mut scene = scene();
        let cursor = scene.cursor_id();
        scene.set_local_position(cursor, Vec3::new(1.0, 0.0, 0.0));

        let lines = scene.lines(cursor).to_vec();
        assert_eq!(lines.len(), 3);
        assert_relative_eq!(lines[0].start, Vec3::new(0.9, 0.0, 0.0));
        assert_relative_eq!(lines[0].end, Vec3::new(1.1, 0.0, 0.0));
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    #[test]
    fn insert_appends_and_registers_objects() {
        let mut scene = scene();
        let a = scene.insert(None, SceneNode::group("a"));
        let b = scene.insert(Some(a), SceneNode::poly_line("b"));

        assert_eq!(scene.children(a), &[b]);
        assert_eq!(scene.node(b).unwrap().parent(), Some(a));
        assert_eq!(scene.object_count(), 2);
    }

    #[test]
    fn delete_removes_the_whole_subtree() {
        let mut scene = scene();
        let root = scene.root();
        let group = scene.insert(None, SceneNode::group("group"));
        let child = scene.insert(Some(group), SceneNode::poly_line("child"));
        let grandchild = scene.insert(Some(child), SceneNode::poly_line("grandchild"));
        scene.select(grandchild);

        scene.delete(root, group).unwrap();
        assert!(!scene.contains(group));
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert_eq!(scene.object_count(), 0);
        assert!(scene.selection().is_empty());

        // Stale handles read back as absent, not as garbage.
        assert!(scene.node(child).is_none());
        assert!(scene.world_position(grandchild).is_none());
        assert!(scene.lines(child).is_empty());
    }

    #[test]
    fn delete_with_wrong_parent_fails_without_side_effects() {
        let mut scene = scene();
        let a = scene.insert(None, SceneNode::group("a"));
        let b = scene.insert(None, SceneNode::group("b"));
        let child = scene.insert(Some(a), SceneNode::poly_line("child"));

        assert_eq!(scene.delete(b, child), Err(SceneError::TargetNotFound));
        assert!(scene.contains(child));
        assert_eq!(scene.children(a), &[child]);
    }

    #[test]
    fn singletons_cannot_be_deleted() {
        let mut scene = scene();
        let root = scene.root();
        let cursor = scene.cursor_id();
        assert_eq!(scene.delete(root, cursor), Err(SceneError::TargetNotFound));
        assert!(scene.contains(cursor));
    }

    #[test]
    fn move_to_bottom_of_later_sibling() {
        let mut scene = scene();
        let parent = scene.insert(None, SceneNode::group("parent"));
        let a = scene.insert(Some(parent), SceneNode::group("a"));
        let _b = scene.insert(Some(parent), SceneNode::group("b"));
        let _c = scene.insert(Some(parent), SceneNode::group("c"));
        let _d = scene.insert(Some(parent), SceneNode::group("d"));

        scene.select(a);
        let outcome = scene
            .move_to(scene.children(parent)[2], 2, InsertRule::BOTTOM, ReparentPolicy::None)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(child_names(&scene, parent), ["b", "c", "a", "d"]);
    }

    #[test]
    fn move_to_top_of_earlier_sibling() {
        let mut scene = scene();
        let parent = scene.insert(None, SceneNode::group("parent"));
        let _a = scene.insert(Some(parent), SceneNode::group("a"));
        let b = scene.insert(Some(parent), SceneNode::group("b"));
        let _c = scene.insert(Some(parent), SceneNode::group("c"));
        let d = scene.insert(Some(parent), SceneNode::group("d"));

        scene.select(d);
        let outcome = scene
            .move_to(b, 1, InsertRule::TOP, ReparentPolicy::None)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(child_names(&scene, parent), ["d", "a", "b", "c"]);
    }

    #[test]
    fn move_with_any_rule_splices_after_the_target() {
        let mut scene = scene();
        let parent = scene.insert(None, SceneNode::group("parent"));
        let a = scene.insert(Some(parent), SceneNode::group("a"));
        let b = scene.insert(Some(parent), SceneNode::group("b"));

        scene.select(a);
        let outcome = scene
            .move_to(b, 1, InsertRule::ANY, ReparentPolicy::None)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);

        // ANY keeps the node a sibling, landing below the target.
        assert_eq!(scene.node(a).unwrap().parent(), Some(parent));
        assert!(scene.children(b).is_empty());
        assert_eq!(child_names(&scene, parent), ["b", "a"]);
    }

    #[test]
    fn move_center_makes_the_node_the_targets_first_child() {
        let mut scene = scene();
        let group = scene.insert(None, SceneNode::group("group"));
        let existing = scene.insert(Some(group), SceneNode::group("existing"));
        let loose = scene.insert(None, SceneNode::poly_line("loose"));

        scene.select(loose);
        scene
            .move_to(group, 0, InsertRule::CENTER, ReparentPolicy::None)
            .unwrap();
        assert_eq!(scene.children(group), &[loose, existing]);
        assert_eq!(scene.node(loose).unwrap().parent(), Some(group));
    }

    #[test]
    fn move_into_own_subtree_is_rejected_silently() {
        let mut scene = scene();
        let group = scene.insert(None, SceneNode::group("group"));
        let child = scene.insert(Some(group), SceneNode::group("child"));
        let grandchild = scene.insert(Some(child), SceneNode::group("grandchild"));
        let before = child_names(&scene, scene.root());

        scene.select(group);
        let outcome = scene
            .move_to(grandchild, 0, InsertRule::CENTER, ReparentPolicy::Adapt)
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Rejected);
        assert!(scene.selection().is_empty());
        assert_eq!(child_names(&scene, scene.root()), before);
        assert_eq!(scene.children(child), &[grandchild]);
    }

    #[test]
    fn moving_the_root_is_rejected() {
        let mut scene = scene();
        let group = scene.insert(None, SceneNode::group("group"));
        scene.select(scene.root());
        let outcome = scene
            .move_to(group, 0, InsertRule::CENTER, ReparentPolicy::None)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Rejected);
    }

    #[test]
    fn multi_selection_moves_are_an_error() {
        let mut scene = scene();
        let a = scene.insert(None, SceneNode::group("a"));
        let b = scene.insert(None, SceneNode::group("b"));
        let c = scene.insert(None, SceneNode::group("c"));
        scene.select(a);
        scene.select(b);

        assert_eq!(
            scene.move_to(c, 2, InsertRule::ANY, ReparentPolicy::None),
            Err(SceneError::MultiMoveUnsupported)
        );
    }

    #[test]
    fn adapt_policy_preserves_world_placement_across_reparent() {
        let mut scene = scene();
        let group = scene.insert(
            None,
            SceneNode::group("group").with_position(Vec3::new(0.0, 5.0, 0.0)),
        );
        scene.set_local_rotation(group, yaw(0.7));
        let loose = scene.insert(None, SceneNode::group("loose"));
        scene.set_world_position(loose, Vec3::new(2.0, 1.0, 0.0));

        scene.select(loose);
        scene
            .move_to(group, 0, InsertRule::CENTER, ReparentPolicy::Adapt)
            .unwrap();

        assert_eq!(scene.node(loose).unwrap().parent(), Some(group));
        assert_relative_eq!(
            scene.world_position(loose).unwrap(),
            Vec3::new(2.0, 1.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn none_policy_keeps_local_placement_across_reparent() {
        let mut scene = scene();
        let group = scene.insert(
            None,
            SceneNode::group("group").with_position(Vec3::new(0.0, 5.0, 0.0)),
        );
        let loose = scene.insert(None, SceneNode::group("loose"));
        scene.set_local_position(loose, Vec3::new(2.0, 0.0, 0.0));

        scene.select(loose);
        scene
            .move_to(group, 0, InsertRule::CENTER, ReparentPolicy::None)
            .unwrap();

        assert_relative_eq!(
            scene.node(loose).unwrap().local_position(),
            Vec3::new(2.0, 0.0, 0.0)
        );
        assert_relative_eq!(
            scene.world_position(loose).unwrap(),
            Vec3::new(2.0, 5.0, 0.0),
            epsilon = 1e-5
        );
    }

    // ------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------

    #[test]
    fn clear_all_empties_objects_but_keeps_singletons() {
        let queue = CommandQueue::new();
        let mut scene = Scene::new(&queue);
        let group = scene.insert(None, SceneNode::group("group"));
        let _child = scene.insert(Some(group), SceneNode::poly_line("child"));
        scene.select(group);

        let fired = Rc::new(Cell::new(false));
        let fired_in = Rc::clone(&fired);
        scene.on_clear().subscribe(move |()| fired_in.set(true));
        queue.drain().unwrap();

        scene.clear_all();

        assert!(fired.get());
        assert_eq!(scene.object_count(), 0);
        assert!(scene.children(scene.root()).is_empty());
        assert!(scene.selection().is_empty());
        assert!(!scene.contains(group));

        // Camera and cursor survive, detached from the hierarchy.
        let camera = scene.camera_id();
        let cursor = scene.cursor_id();
        assert!(scene.contains(camera));
        assert!(scene.contains(cursor));
        assert_eq!(scene.node(camera).unwrap().parent(), None);
        assert_eq!(scene.node(cursor).unwrap().parent(), None);
    }
}
