//! Explicit registration of robot logic by name.
//!
//! Logic is resolved through this table instead of by looking up an entry
//! point at runtime. An unknown name is a load failure.

use crate::robots::{ForwardRotate, Idle, RandomWalk, RightHandFollower};
use std::collections::BTreeMap;
use std::fmt;
use zigzag_core::RobotLogic;

type LogicFactory = Box<dyn Fn(u64) -> Box<dyn RobotLogic> + Send + Sync>;

struct LogicEntry {
    description: String,
    factory: LogicFactory,
}

/// Name-keyed table of robot logic factories. Factories receive the run seed.
#[derive(Default)]
pub struct LogicRegistry {
    entries: BTreeMap<String, LogicEntry>,
}

impl fmt::Debug for LogicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LogicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in robots.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("forward_rotate", "move forward then rotate clockwise every tick", |_| {
            Box::new(ForwardRotate)
        });
        registry.register("right_hand", "right-hand wall follower, stops on the goal", |_| {
            Box::new(RightHandFollower)
        });
        registry.register("random_walk", "seeded random walk toward a visible goal", |seed| {
            Box::new(RandomWalk::new(seed))
        });
        registry.register("idle", "does nothing", |_| Box::new(Idle));
        registry
    }

    /// Registers (or replaces) a factory under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, description: impl Into<String>, factory: F)
    where
        F: Fn(u64) -> Box<dyn RobotLogic> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            LogicEntry {
                description: description.into(),
                factory: Box::new(factory),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Instantiates the logic registered under `name`.
    pub fn create(&self, name: &str, seed: u64) -> Option<Box<dyn RobotLogic>> {
        self.entries.get(name).map(|entry| (entry.factory)(seed))
    }

    /// `(name, description)` pairs in name order.
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = LogicRegistry::builtin();
        let names: Vec<&str> = registry.describe().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["forward_rotate", "idle", "random_walk", "right_hand"]);
        assert!(registry.create("right_hand", 0).is_some());
    }

    #[test]
    fn test_unknown_name() {
        let registry = LogicRegistry::builtin();
        assert!(!registry.contains("Driver"));
        assert!(registry.create("Driver", 0).is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = LogicRegistry::new();
        assert!(registry.is_empty());
        registry.register("bot", "first", |_| Box::new(Idle));
        registry.register("bot", "second", |_| Box::new(Idle));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.describe(), vec![("bot", "second")]);
    }
}
