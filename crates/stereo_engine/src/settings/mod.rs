//! Live, observable view of the editor settings
//!
//! [`SceneSettings`] wraps [`EngineSettings`](crate::core::config::EngineSettings)
//! values in [`Property`] cells so UI fields can bind to them and other
//! components can subscribe to changes. The session constructs one and
//! passes it to whoever needs it; there is no global settings object.

use crate::core::config::{EngineSettings, ReparentPolicy};
use crate::events::{property::Property, CommandQueue};

/// Property-backed editor settings.
#[derive(Debug, Clone)]
pub struct SceneSettings {
    /// Reparent coordinate policy
    pub reparent_policy: Property<ReparentPolicy>,
    /// Step size for position drag fields
    pub position_step: Property<f32>,
    /// Step size for rotation drag fields
    pub rotation_step: Property<f32>,
    /// Eye-to-center distance of the stereo camera
    pub eye_to_center: Property<f32>,
    /// Cursor cross size
    pub cursor_size: Property<f32>,
}

impl SceneSettings {
    /// Build live settings from a loaded configuration
    pub fn from_config(config: &EngineSettings, queue: &CommandQueue) -> Self {
        Self {
            reparent_policy: Property::new(config.reparent_policy, queue),
            position_step: Property::new(config.position_step, queue),
            rotation_step: Property::new(config.rotation_step, queue),
            eye_to_center: Property::new(config.eye_to_center, queue),
            cursor_size: Property::new(config.cursor_size, queue),
        }
    }

    /// Snapshot the current values back into a serializable config
    pub fn snapshot(&self, log_level: String) -> EngineSettings {
        EngineSettings {
            reparent_policy: self.reparent_policy.get(),
            position_step: self.position_step.get(),
            rotation_step: self.rotation_step.get(),
            eye_to_center: self.eye_to_center.get(),
            cursor_size: self.cursor_size.get(),
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_and_snapshot_round_trip() {
        let queue = CommandQueue::new();
        let config = EngineSettings {
            reparent_policy: ReparentPolicy::None,
            position_step: 0.05,
            ..Default::default()
        };

        let settings = SceneSettings::from_config(&config, &queue);
        settings.eye_to_center.set(0.9);

        let snapshot = settings.snapshot("debug".to_string());
        assert_eq!(snapshot.reparent_policy, ReparentPolicy::None);
        assert!((snapshot.position_step - 0.05).abs() < f32::EPSILON);
        assert!((snapshot.eye_to_center - 0.9).abs() < f32::EPSILON);
        assert_eq!(snapshot.log_level, "debug");
    }

    #[test]
    fn policy_changes_notify_subscribers() {
        let queue = CommandQueue::new();
        let settings = SceneSettings::from_config(&EngineSettings::default(), &queue);

        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&seen);
        settings
            .reparent_policy
            .on_changed()
            .subscribe(move |p| sink.borrow_mut().push(*p));
        queue.drain().unwrap();

        settings.reparent_policy.set(ReparentPolicy::None);
        assert_eq!(*seen.borrow(), vec![ReparentPolicy::None]);
    }
}
