//! Scene graph, stereo camera and persistence
//!
//! The scene is an arena of nodes addressed by stable handles. All
//! structure and transform mutation goes through [`Scene`] so dirty
//! flags and hierarchy invariants stay consistent; nodes themselves
//! only expose payload edits.

pub mod camera;
pub mod document;
pub mod graph;
pub mod node;

pub use camera::{StereoCamera, StereoPair};
pub use document::{DocumentError, NodeRecord, SceneDocument};
pub use graph::{InsertRule, MoveOutcome, Scene, SceneError};
pub use node::{NodeId, NodeType, SceneNode, Segment};
