//! Scene nodes and their geometry kinds
//!
//! A [`SceneNode`] owns its local transform, its hierarchy links and a
//! kind-specific payload. The kinds form a closed set so connectivity
//! rules are matched exhaustively instead of dispatched through
//! overridable defaults.
//!
//! Vertex edits only mark the node dirty; world-space segment caches
//! are rebuilt lazily by the scene on the next geometry read, so a
//! burst of edits costs one recomputation.

use crate::foundation::math::{Quat, Vec3};
use crate::scene::camera::StereoCamera;

slotmap::new_key_type! {
    /// Stable handle to a node in the scene arena
    pub struct NodeId;
}

/// A world-space line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Segment start point
    pub start: Vec3,
    /// Segment end point
    pub end: Vec3,
}

impl Segment {
    /// Create a segment between two points
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }
}

/// Tag identifying a node's kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Pure grouping node, no geometry of its own
    Group,
    /// Open polyline: consecutive vertices connect
    PolyLine,
    /// Mesh: explicit index-pair connections
    Mesh,
    /// Fixed cruciform cursor
    Cross,
    /// Stereo camera
    Camera,
}

/// Kind-specific payload of a scene node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Grouping node
    Group,
    /// Polyline vertices with cached world-space segments
    PolyLine {
        /// Ordered vertex sequence in local space
        vertices: Vec<Vec3>,
        /// World-space segments, valid while the node is clean
        cache: Vec<Segment>,
    },
    /// Mesh vertices, explicit edges and cached segments
    Mesh {
        /// Vertex sequence in local space
        vertices: Vec<Vec3>,
        /// Explicit index-pair connections between vertices
        edges: Vec<[usize; 2]>,
        /// World-space segments, valid while the node is clean
        cache: Vec<Segment>,
    },
    /// Cruciform generated from a single size scalar
    Cross {
        /// Half-length of each cruciform arm
        size: f32,
        /// World-space segments, valid while the node is clean
        cache: Vec<Segment>,
    },
    /// Stereo camera parameters; projection is pure, nothing cached
    Camera(StereoCamera),
}

impl NodeKind {
    pub(crate) fn cached_lines(&self) -> &[Segment] {
        match self {
            Self::PolyLine { cache, .. }
            | Self::Mesh { cache, .. }
            | Self::Cross { cache, .. } => cache,
            Self::Group | Self::Camera(_) => &[],
        }
    }
}

/// A positionable entity in the scene hierarchy.
///
/// Local position and rotation are authoritative; world values are
/// composed on demand by the [`Scene`](crate::scene::Scene), which also
/// owns the transform setters because any write must invalidate the
/// whole subtree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    name: String,
    pub(crate) local_position: Vec3,
    pub(crate) local_rotation: Quat,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) dirty: bool,
    pub(crate) kind: NodeKind,
}

impl SceneNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            local_position: Vec3::zeros(),
            local_rotation: Quat::identity(),
            parent: None,
            children: Vec::new(),
            // New nodes have never computed a cache.
            dirty: true,
            kind,
        }
    }

    /// Create a grouping node
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    /// Create an empty polyline
    pub fn poly_line(name: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::PolyLine {
                vertices: Vec::new(),
                cache: Vec::new(),
            },
        )
    }

    /// Create an empty mesh
    pub fn mesh(name: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::Mesh {
                vertices: Vec::new(),
                edges: Vec::new(),
                cache: Vec::new(),
            },
        )
    }

    /// Create a cruciform cursor of the given arm size
    pub fn cross(name: impl Into<String>, size: f32) -> Self {
        Self::new(
            name,
            NodeKind::Cross {
                size,
                cache: Vec::new(),
            },
        )
    }

    /// Create a stereo camera node
    pub fn camera_node(camera: StereoCamera) -> Self {
        Self::new("camera", NodeKind::Camera(camera))
    }

    /// Builder pattern: set the initial local position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.local_position = position;
        self
    }

    /// Builder pattern: set the initial local rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.local_rotation = rotation;
        self
    }

    /// Node display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Kind tag of this node
    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Group => NodeType::Group,
            NodeKind::PolyLine { .. } => NodeType::PolyLine,
            NodeKind::Mesh { .. } => NodeType::Mesh,
            NodeKind::Cross { .. } => NodeType::Cross,
            NodeKind::Camera(_) => NodeType::Camera,
        }
    }

    /// Local position relative to the parent
    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    /// Local rotation relative to the parent
    pub fn local_rotation(&self) -> Quat {
        self.local_rotation
    }

    /// Parent handle, `None` for the root and detached singletons
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children handles in render/UI order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether cached geometry must be recomputed before the next read
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raw local-space vertices; empty for kinds without vertex data
    pub fn vertices(&self) -> &[Vec3] {
        match &self.kind {
            NodeKind::PolyLine { vertices, .. } | NodeKind::Mesh { vertices, .. } => vertices,
            NodeKind::Group | NodeKind::Cross { .. } | NodeKind::Camera(_) => &[],
        }
    }

    /// Append a vertex. No-op for kinds without vertex data.
    pub fn add_vertex(&mut self, v: Vec3) {
        match &mut self.kind {
            NodeKind::PolyLine { vertices, .. } | NodeKind::Mesh { vertices, .. } => {
                vertices.push(v);
                self.dirty = true;
            }
            NodeKind::Group | NodeKind::Cross { .. } | NodeKind::Camera(_) => {}
        }
    }

    /// Append several vertices
    pub fn add_vertices(&mut self, vs: impl IntoIterator<Item = Vec3>) {
        for v in vs {
            self.add_vertex(v);
        }
    }

    /// Overwrite the vertex at `index`.
    ///
    /// The index must be in range; passing an out-of-range index is a
    /// caller contract violation and panics.
    pub fn set_vertex(&mut self, index: usize, v: Vec3) {
        match &mut self.kind {
            NodeKind::PolyLine { vertices, .. } | NodeKind::Mesh { vertices, .. } => {
                vertices[index] = v;
                self.dirty = true;
            }
            NodeKind::Group | NodeKind::Cross { .. } | NodeKind::Camera(_) => {}
        }
    }

    /// Set only the X coordinate of the vertex at `index`
    pub fn set_vertex_x(&mut self, index: usize, x: f32) {
        self.set_vertex_component(index, 0, x);
    }

    /// Set only the Y coordinate of the vertex at `index`
    pub fn set_vertex_y(&mut self, index: usize, y: f32) {
        self.set_vertex_component(index, 1, y);
    }

    /// Set only the Z coordinate of the vertex at `index`
    pub fn set_vertex_z(&mut self, index: usize, z: f32) {
        self.set_vertex_component(index, 2, z);
    }

    fn set_vertex_component(&mut self, index: usize, component: usize, value: f32) {
        match &mut self.kind {
            NodeKind::PolyLine { vertices, .. } | NodeKind::Mesh { vertices, .. } => {
                vertices[index][component] = value;
                self.dirty = true;
            }
            NodeKind::Group | NodeKind::Cross { .. } | NodeKind::Camera(_) => {}
        }
    }

    /// Replace the whole vertex sequence
    pub fn set_vertices(&mut self, vs: Vec<Vec3>) {
        match &mut self.kind {
            NodeKind::PolyLine { vertices, .. } | NodeKind::Mesh { vertices, .. } => {
                *vertices = vs;
                self.dirty = true;
            }
            NodeKind::Group | NodeKind::Cross { .. } | NodeKind::Camera(_) => {}
        }
    }

    /// Remove the last vertex, if any
    pub fn remove_last_vertex(&mut self) {
        match &mut self.kind {
            NodeKind::PolyLine { vertices, .. } | NodeKind::Mesh { vertices, .. } => {
                vertices.pop();
                self.dirty = true;
            }
            NodeKind::Group | NodeKind::Cross { .. } | NodeKind::Camera(_) => {}
        }
    }

    /// Connect two mesh vertices by index. No-op for other kinds.
    ///
    /// Indices must refer to existing vertices when the cache is next
    /// rebuilt; edges pointing past the vertex list produce no segment.
    pub fn connect(&mut self, a: usize, b: usize) {
        if let NodeKind::Mesh { edges, .. } = &mut self.kind {
            edges.push([a, b]);
            self.dirty = true;
        }
    }

    /// Remove the connection between two mesh vertices, if present
    pub fn disconnect(&mut self, a: usize, b: usize) {
        if let NodeKind::Mesh { edges, .. } = &mut self.kind {
            if let Some(pos) = edges.iter().position(|e| *e == [a, b]) {
                edges.remove(pos);
                self.dirty = true;
            }
        }
    }

    /// Explicit mesh connections; empty for other kinds
    pub fn connections(&self) -> &[[usize; 2]] {
        match &self.kind {
            NodeKind::Mesh { edges, .. } => edges,
            _ => &[],
        }
    }

    /// Replace the whole mesh connection list
    pub fn set_connections(&mut self, connections: Vec<[usize; 2]>) {
        if let NodeKind::Mesh { edges, .. } = &mut self.kind {
            *edges = connections;
            self.dirty = true;
        }
    }

    /// Cruciform arm size; `None` for other kinds
    pub fn cross_size(&self) -> Option<f32> {
        match &self.kind {
            NodeKind::Cross { size, .. } => Some(*size),
            _ => None,
        }
    }

    /// Resize the cruciform. No-op for other kinds.
    pub fn set_cross_size(&mut self, new_size: f32) {
        if let NodeKind::Cross { size, .. } = &mut self.kind {
            *size = new_size;
            self.dirty = true;
        }
    }

    /// Stereo camera parameters, if this node is the camera
    pub fn camera(&self) -> Option<&StereoCamera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Mutable stereo camera parameters, if this node is the camera
    pub fn camera_mut(&mut self) -> Option<&mut StereoCamera> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_nodes_start_dirty_and_detached() {
        let node = SceneNode::poly_line("line");
        assert!(node.is_dirty());
        assert_eq!(node.parent(), None);
        assert!(node.children().is_empty());
        assert_eq!(node.node_type(), NodeType::PolyLine);
    }

    #[test]
    fn vertex_edits_mark_dirty_without_recomputing() {
        let mut node = SceneNode::poly_line("line");
        node.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        node.set_vertex_y(0, 2.0);

        assert!(node.is_dirty());
        assert_eq!(node.vertices(), &[Vec3::new(1.0, 2.0, 0.0)]);
        // The cache is untouched until the scene rebuilds it.
        assert!(node.kind.cached_lines().is_empty());
    }

    #[test]
    fn vertex_edits_on_geometry_free_kinds_are_no_ops() {
        let mut node = SceneNode::group("g");
        node.add_vertex(Vec3::zeros());
        node.remove_last_vertex();
        assert!(node.vertices().is_empty());
    }

    #[test]
    fn mesh_connect_and_disconnect() {
        let mut node = SceneNode::mesh("m");
        node.add_vertices([Vec3::zeros(), Vec3::x(), Vec3::y()]);
        node.connect(0, 1);
        node.connect(1, 2);
        assert_eq!(node.connections(), &[[0, 1], [1, 2]]);

        node.disconnect(0, 1);
        assert_eq!(node.connections(), &[[1, 2]]);

        // Disconnecting an absent edge changes nothing.
        node.disconnect(0, 2);
        assert_eq!(node.connections(), &[[1, 2]]);
    }

    #[test]
    fn camera_node_exposes_its_parameters() {
        let node = SceneNode::camera_node(StereoCamera::new(0.7));
        assert_eq!(node.node_type(), NodeType::Camera);
        assert_eq!(node.name(), "camera");

        let camera = node.camera().unwrap();
        assert!((camera.eye_to_center - 0.7).abs() < f32::EPSILON);
        assert!(node.cross_size().is_none());
    }

    #[test]
    fn cross_size_updates() {
        let mut node = SceneNode::cross("cursor", 0.1);
        assert_eq!(node.cross_size(), Some(0.1));
        node.set_cross_size(0.5);
        assert_eq!(node.cross_size(), Some(0.5));
        assert!(node.is_dirty());
    }
}
