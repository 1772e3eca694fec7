//! # Stereo Engine
//!
//! Scene graph and transform engine for an interactive stereoscopic
//! line-art editor.
//!
//! ## Features
//!
//! - **Scene Graph**: Arena-backed hierarchy of groups, polylines,
//!   meshes, crosses and a stereo camera with stable node handles
//! - **Lazy Geometry Caches**: World-space segment lists recomputed
//!   on read, invalidated on any transform or vertex change
//! - **Deferred Commands**: Frame-boundary command queue so handler
//!   registration never mutates a collection mid-iteration
//! - **Observable Properties**: Change-notifying value cells with
//!   one-way and two-way binding for settings and UI fields
//! - **Stereo Projection**: Pure left/right eye projection of cached
//!   world-space segments
//!
//! ## Quick Start
//!
//! ```rust
//! use stereo_engine::prelude::*;
//!
//! let queue = CommandQueue::new();
//! let mut scene = Scene::new(&queue);
//!
//! let line = scene.insert(None, SceneNode::poly_line("outline"));
//! scene.node_mut(line).unwrap().add_vertex(Vec3::new(0.0, 0.0, 1.0));
//! scene.node_mut(line).unwrap().add_vertex(Vec3::new(1.0, 0.0, 1.0));
//!
//! for segment in scene.lines(line).to_vec() {
//!     let pair = scene.project(&segment).unwrap();
//!     println!("L {:?} R {:?}", pair.left, pair.right);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod events;
pub mod foundation;
pub mod scene;
pub mod settings;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, ConfigError, EngineSettings, ReparentPolicy},
        events::{
            property::Property,
            CommandError, CommandQueue, DeferredCommand, Event, HandlerId,
        },
        foundation::math::{Placement, Quat, Vec3},
        scene::{
            DocumentError, InsertRule, MoveOutcome, NodeId, NodeType, Scene, SceneDocument, SceneError,
            SceneNode, Segment, StereoCamera, StereoPair,
        },
        settings::SceneSettings,
    };
}
