//! Scene persistence
//!
//! A [`SceneDocument`] is a plain serde tree captured from a live
//! [`Scene`] and applied back onto one. Documents store the user object
//! hierarchy plus the camera and cursor placement; handles are not
//! persisted, they are reissued on load.
//!
//! Files are RON, written pretty so scenes diff cleanly under version
//! control.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Quat, Vec3};
use crate::scene::graph::Scene;
use crate::scene::node::{NodeId, NodeKind, SceneNode};

/// Document load/save failures
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Filesystem error while reading or writing
    #[error("document io error: {0}")]
    Io(#[from] std::io::Error),
    /// The file contents are not a valid document
    #[error("document parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The document could not be serialized
    #[error("document serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

/// One user object and its subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeRecord {
    /// Grouping node
    Group {
        /// Display name
        name: String,
        /// Local position
        position: Vec3,
        /// Local rotation
        rotation: Quat,
        /// Child subtrees in order
        children: Vec<NodeRecord>,
    },
    /// Polyline with its vertex run
    PolyLine {
        /// Display name
        name: String,
        /// Local position
        position: Vec3,
        /// Local rotation
        rotation: Quat,
        /// Ordered local-space vertices
        vertices: Vec<Vec3>,
        /// Child subtrees in order
        children: Vec<NodeRecord>,
    },
    /// Mesh with vertices and explicit connections
    Mesh {
        /// Display name
        name: String,
        /// Local position
        position: Vec3,
        /// Local rotation
        rotation: Quat,
        /// Local-space vertices
        vertices: Vec<Vec3>,
        /// Index-pair connections
        edges: Vec<[usize; 2]>,
        /// Child subtrees in order
        children: Vec<NodeRecord>,
    },
}

/// Persisted camera placement and parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRecord {
    /// Camera node local position
    pub position: Vec3,
    /// Eye center offset
    pub position_modifier: Vec3,
    /// Eye separation
    pub eye_to_center: f32,
}

/// Persisted cursor placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorRecord {
    /// Cursor node local position
    pub position: Vec3,
    /// Cruciform arm size
    pub size: f32,
}

/// Serializable snapshot of a whole scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Camera placement and stereo parameters
    pub camera: CameraRecord,
    /// Cursor placement and size
    pub cursor: CursorRecord,
    /// Top-level user objects under the root
    pub objects: Vec<NodeRecord>,
}

impl SceneDocument {
    /// Snapshot a live scene into a document
    pub fn capture(scene: &Scene) -> Self {
        let camera_node = scene.node(scene.camera_id());
        let cursor_node = scene.node(scene.cursor_id());
        let camera_params = scene.camera().copied().unwrap_or_default();

        let objects = scene
            .children(scene.root())
            .iter()
            .filter(|&&id| id != scene.camera_id() && id != scene.cursor_id())
            .filter_map(|&id| capture_node(scene, id))
            .collect();

        Self {
            camera: CameraRecord {
                position: camera_node.map_or_else(Vec3::zeros, |n| n.local_position()),
                position_modifier: camera_params.position_modifier,
                eye_to_center: camera_params.eye_to_center,
            },
            cursor: CursorRecord {
                position: cursor_node.map_or_else(Vec3::zeros, |n| n.local_position()),
                size: cursor_node
                    .and_then(SceneNode::cross_size)
                    .unwrap_or(Scene::DEFAULT_CURSOR_SIZE),
            },
            objects,
        }
    }

    /// Replace a scene's contents with this document.
    ///
    /// Clears the scene first, which fires its clear notification, then
    /// re-attaches the singletons and rebuilds the object hierarchy.
    pub fn apply(&self, scene: &mut Scene) {
        scene.clear_all();

        let camera = scene.camera_id();
        let cursor = scene.cursor_id();
        scene.attach_singleton(camera);
        scene.attach_singleton(cursor);

        scene.set_local_position(camera, self.camera.position);
        if let Some(params) = scene.camera_mut() {
            params.position_modifier = self.camera.position_modifier;
            params.eye_to_center = self.camera.eye_to_center;
        }
        scene.set_local_position(cursor, self.cursor.position);
        if let Some(node) = scene.node_mut(cursor) {
            node.set_cross_size(self.cursor.size);
        }

        let root = scene.root();
        for record in &self.objects {
            insert_record(scene, root, record);
        }
    }

    /// Parse a document from RON text
    pub fn from_ron(text: &str) -> Result<Self, DocumentError> {
        Ok(ron::from_str(text)?)
    }

    /// Render the document as pretty RON
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load a document from a RON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        log::info!("loading scene document from {}", path.display());
        Self::from_ron(&fs::read_to_string(path)?)
    }

    /// Write the document to a RON file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        log::info!("saving scene document to {}", path.display());
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

fn capture_node(scene: &Scene, id: NodeId) -> Option<NodeRecord> {
    let node = scene.node(id)?;
    let children: Vec<NodeRecord> = node
        .children()
        .iter()
        .filter_map(|&child| capture_node(scene, child))
        .collect();
    let name = node.name().to_string();
    let position = node.local_position();
    let rotation = node.local_rotation();

    match &node.kind {
        NodeKind::Group => Some(NodeRecord::Group {
            name,
            position,
            rotation,
            children,
        }),
        NodeKind::PolyLine { vertices, .. } => Some(NodeRecord::PolyLine {
            name,
            position,
            rotation,
            vertices: vertices.clone(),
            children,
        }),
        NodeKind::Mesh { vertices, edges, .. } => Some(NodeRecord::Mesh {
            name,
            position,
            rotation,
            vertices: vertices.clone(),
            edges: edges.clone(),
            children,
        }),
        NodeKind::Cross { .. } | NodeKind::Camera(_) => {
            log::warn!("skipping non-serializable object {name:?}");
            None
        }
    }
}

fn insert_record(scene: &mut Scene, parent: NodeId, record: &NodeRecord) {
    let (node, children) = match record {
        NodeRecord::Group {
            name,
            position,
            rotation,
            children,
        } => (
            SceneNode::group(name.clone())
                .with_position(*position)
                .with_rotation(*rotation),
            children,
        ),
        NodeRecord::PolyLine {
            name,
            position,
            rotation,
            vertices,
            children,
        } => {
            let mut node = SceneNode::poly_line(name.clone())
                .with_position(*position)
                .with_rotation(*rotation);
            node.set_vertices(vertices.clone());
            (node, children)
        }
        NodeRecord::Mesh {
            name,
            position,
            rotation,
            vertices,
            edges,
            children,
        } => {
            let mut node = SceneNode::mesh(name.clone())
                .with_position(*position)
                .with_rotation(*rotation);
            node.set_vertices(vertices.clone());
            node.set_connections(edges.clone());
            (node, children)
        }
    };

    let id = scene.insert(Some(parent), node);
    for child in children {
        insert_record(scene, id, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CommandQueue;
    use approx::assert_relative_eq;

    fn sample_scene(queue: &CommandQueue) -> Scene {
        let mut scene = Scene::new(queue);
        let group = scene.insert(
            None,
            SceneNode::group("body").with_position(Vec3::new(0.0, 1.0, 0.0)),
        );
        let line = scene.insert(Some(group), SceneNode::poly_line("outline"));
        scene
            .node_mut(line)
            .unwrap()
            .add_vertices([Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)]);
        let mesh = scene.insert(None, SceneNode::mesh("frame"));
        let node = scene.node_mut(mesh).unwrap();
        node.add_vertices([Vec3::zeros(), Vec3::x(), Vec3::y()]);
        node.connect(0, 1);
        node.connect(1, 2);
        scene.set_local_position(scene.cursor_id(), Vec3::new(0.5, 0.5, 0.5));
        scene
    }

    #[test]
    fn capture_apply_round_trip_preserves_the_hierarchy() {
        let queue = CommandQueue::new();
        let scene = sample_scene(&queue);
        let document = SceneDocument::capture(&scene);

        let text = document.to_ron().unwrap();
        let parsed = SceneDocument::from_ron(&text).unwrap();

        let mut restored = Scene::new(&queue);
        parsed.apply(&mut restored);

        assert_eq!(restored.object_count(), 3);
        let root_children = restored.children(restored.root()).to_vec();
        // Singletons are re-attached first, user objects follow.
        let body = root_children[2];
        assert_eq!(restored.node(body).unwrap().name(), "body");
        assert_relative_eq!(
            restored.node(body).unwrap().local_position(),
            Vec3::new(0.0, 1.0, 0.0)
        );

        let outline = restored.children(body)[0];
        assert_eq!(restored.node(outline).unwrap().name(), "outline");
        assert_eq!(restored.node(outline).unwrap().vertices().len(), 2);

        let frame = root_children[3];
        assert_eq!(restored.node(frame).unwrap().connections(), &[[0, 1], [1, 2]]);

        assert_relative_eq!(
            restored.node(restored.cursor_id()).unwrap().local_position(),
            Vec3::new(0.5, 0.5, 0.5)
        );
    }

    #[test]
    fn apply_replaces_existing_content() {
        let queue = CommandQueue::new();
        let scene = sample_scene(&queue);
        let document = SceneDocument::capture(&scene);

        let mut target = Scene::new(&queue);
        let stale = target.insert(None, SceneNode::group("stale"));
        document.apply(&mut target);

        assert!(!target.contains(stale));
        assert_eq!(target.object_count(), 3);
    }

    #[test]
    fn camera_parameters_survive_the_round_trip() {
        let queue = CommandQueue::new();
        let mut scene = Scene::new(&queue);
        scene.camera_mut().unwrap().eye_to_center = 0.8;
        scene.set_local_position(scene.camera_id(), Vec3::new(0.0, 0.0, -2.0));

        let document = SceneDocument::capture(&scene);
        let mut restored = Scene::new(&queue);
        document.apply(&mut restored);

        assert_relative_eq!(restored.camera().unwrap().eye_to_center, 0.8);
        assert_relative_eq!(
            restored.node(restored.camera_id()).unwrap().local_position(),
            Vec3::new(0.0, 0.0, -2.0)
        );
    }
}
