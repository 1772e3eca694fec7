//! Stereo line-art editor demo
//!
//! Builds a small scene, edits it across a few simulated frames and
//! prints the left/right stereo projection of every cached segment.
//! Pass a path as the first argument to save the resulting scene as a
//! RON document.

use stereo_engine::prelude::*;

struct EditorApp {
    queue: CommandQueue,
    scene: Scene,
    settings: SceneSettings,
    frame_index: u32,
}

impl EditorApp {
    fn new(config: &EngineSettings) -> Self {
        log::info!("creating editor session");
        let queue = CommandQueue::new();
        let scene = Scene::new(&queue);
        let settings = SceneSettings::from_config(config, &queue);

        Self {
            queue,
            scene,
            settings,
            frame_index: 0,
        }
    }

    fn build_scene(&mut self) {
        log::info!("building the demo scene");

        let square = self.scene.insert(None, SceneNode::group("square"));
        let outline = self
            .scene
            .insert(Some(square), SceneNode::poly_line("outline"));
        if let Some(node) = self.scene.node_mut(outline) {
            node.add_vertices([
                Vec3::new(-1.0, -1.0, 4.0),
                Vec3::new(1.0, -1.0, 4.0),
                Vec3::new(1.0, 1.0, 4.0),
                Vec3::new(-1.0, 1.0, 4.0),
                Vec3::new(-1.0, -1.0, 4.0),
            ]);
        }

        let pyramid = self.scene.insert(None, SceneNode::mesh("pyramid"));
        if let Some(node) = self.scene.node_mut(pyramid) {
            node.add_vertices([
                Vec3::new(-1.0, 0.0, 5.0),
                Vec3::new(1.0, 0.0, 5.0),
                Vec3::new(0.0, 0.0, 7.0),
                Vec3::new(0.0, 1.5, 6.0),
            ]);
            for [a, b] in [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]] {
                node.connect(a, b);
            }
        }

        let cursor = self.scene.cursor_id();
        self.scene
            .set_local_position(cursor, Vec3::new(0.0, 0.5, 4.0));
    }

    /// Reparent the pyramid under the square group, keeping its world
    /// placement per the configured policy.
    fn regroup(&mut self) {
        let root = self.scene.root();
        let Some(&pyramid) = self
            .scene
            .children(root)
            .iter()
            .find(|&&id| self.scene.node(id).map(SceneNode::name) == Some("pyramid"))
        else {
            log::warn!("pyramid is gone, nothing to regroup");
            return;
        };
        let Some(&square) = self
            .scene
            .children(root)
            .iter()
            .find(|&&id| self.scene.node(id).map(SceneNode::name) == Some("square"))
        else {
            log::warn!("square is gone, nothing to regroup");
            return;
        };

        self.scene.select(pyramid);
        let policy = self.settings.reparent_policy.get();
        match self.scene.move_to(square, 0, InsertRule::CENTER, policy) {
            Ok(MoveOutcome::Moved) => log::info!("pyramid regrouped under square"),
            Ok(MoveOutcome::Rejected) => log::info!("regroup rejected"),
            Err(err) => log::error!("regroup failed: {err}"),
        }
        self.scene.clear_selection();
    }

    /// One simulated frame: drain deferred work, apply live settings,
    /// then render every segment through the stereo camera.
    fn frame(&mut self) -> Result<(), CommandError> {
        self.frame_index += 1;
        log::info!("frame {}", self.frame_index);
        self.queue.drain()?;

        let cursor = self.scene.cursor_id();
        let size = self.settings.cursor_size.get();
        if let Some(node) = self.scene.node_mut(cursor) {
            node.set_cross_size(size);
        }
        if let Some(camera) = self.scene.camera_mut() {
            camera.eye_to_center = self.settings.eye_to_center.get();
        }

        self.render();
        Ok(())
    }

    fn render(&mut self) {
        let ids = self.scene.descendants(self.scene.root());
        for id in ids {
            let name = match self.scene.node(id) {
                Some(node) => node.name().to_string(),
                None => continue,
            };
            let segments = self.scene.lines(id).to_vec();
            for segment in segments {
                if let Some(StereoPair { left, right }) = self.scene.project(&segment) {
                    println!(
                        "{name}: L ({:.3}, {:.3}) -> ({:.3}, {:.3})  R ({:.3}, {:.3}) -> ({:.3}, {:.3})",
                        left.start.x, left.start.y, left.end.x, left.end.y,
                        right.start.x, right.start.y, right.end.x, right.end.y,
                    );
                }
            }
        }
    }

    fn save(&self, path: &str) {
        let document = SceneDocument::capture(&self.scene);
        match document.save_to_file(path) {
            Ok(()) => log::info!("scene saved to {path}"),
            Err(err) => log::error!("failed to save scene: {err}"),
        }
    }
}

fn run(config: EngineSettings) -> Result<(), CommandError> {
    if let Err(reason) = config.validate() {
        log::error!("invalid settings: {reason}");
        return Err(CommandError::Failed(reason));
    }

    let mut app = EditorApp::new(&config);
    app.build_scene();
    app.frame()?;

    // Second frame: nudge the square and fold the pyramid into it.
    let root = app.scene.root();
    if let Some(&square) = app.scene.children(root).iter().find(|&&id| {
        app.scene.node(id).map(SceneNode::name) == Some("square")
    }) {
        app.scene
            .set_world_position(square, Vec3::new(0.5, 0.0, 0.0));
    }
    app.regroup();
    app.frame()?;

    if let Some(path) = std::env::args().nth(1) {
        app.save(&path);
    }
    Ok(())
}

fn main() {
    let loaded = EngineSettings::load_from_file("settings.toml");
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => EngineSettings::default(),
    };

    // RUST_LOG still wins over the configured level.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.clone()),
    )
    .init();

    match loaded {
        Ok(_) => log::info!("loaded settings.toml"),
        Err(err) => log::warn!("using default settings: {err}"),
    }

    if let Err(err) = run(config) {
        log::error!("editor session failed: {err}");
        std::process::exit(1);
    }
}
