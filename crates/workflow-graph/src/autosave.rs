//! Autosave controller
//!
//! Debounced, tick-driven saving of the current workflow. The host loop
//! calls [`AutosaveController::tick`] on every iteration; the controller
//! only does work once the interval has elapsed since the last reset.

use std::time::{Duration, Instant};

use crate::registry::NodeTypeRegistry;
use crate::serializer::WorkflowSerializer;
use crate::store::WorkflowStore;
use crate::surface::RenderSurface;
use crate::tracker::GraphStateTracker;

/// Whether the debounce interval has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveState {
    /// Within the interval
    Idle,
    /// Interval elapsed; the next tick acts
    Due,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// Interval not elapsed yet
    NotDue,
    /// Nothing to save
    Clean,
    /// Dirty, but the workflow was never named
    Unnamed,
    /// Saved under this name
    Saved(String),
    /// The store refused the write; the graph stays dirty
    Failed(String),
}

/// Interval timer driving periodic saves
#[derive(Debug, Clone)]
pub struct AutosaveController {
    interval: Duration,
    last_reset: Instant,
}

impl AutosaveController {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_reset: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self, now: Instant) -> AutosaveState {
        if now.saturating_duration_since(self.last_reset) >= self.interval {
            AutosaveState::Due
        } else {
            AutosaveState::Idle
        }
    }

    /// Restart the interval
    pub fn reset(&mut self, now: Instant) {
        self.last_reset = now;
    }

    /// Run one host-loop tick
    ///
    /// Whenever the controller was due, the timer is reset regardless of
    /// the outcome, so a failing store is retried once per interval.
    pub fn tick<S: RenderSurface + ?Sized>(
        &mut self,
        now: Instant,
        registry: &NodeTypeRegistry,
        tracker: &mut GraphStateTracker,
        surface: &S,
        store: &WorkflowStore,
    ) -> AutosaveOutcome {
        if self.state(now) == AutosaveState::Idle {
            return AutosaveOutcome::NotDue;
        }
        self.reset(now);

        if !tracker.is_dirty() {
            return AutosaveOutcome::Clean;
        }
        let Some(name) = tracker.current_document_name() else {
            log::debug!("Skipping autosave of unnamed workflow");
            return AutosaveOutcome::Unnamed;
        };

        let document = WorkflowSerializer::new(registry).serialize(tracker, surface, &name);
        if store.save(&document, Some(&name)) {
            tracker.mark_saved();
            log::info!("Autosaved workflow '{}'", name);
            AutosaveOutcome::Saved(name)
        } else {
            log::warn!("Autosave of '{}' failed; retrying in {}s", name, self.interval.as_secs());
            AutosaveOutcome::Failed(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CatalogSource;
    use crate::surface::HeadlessSurface;
    use crate::types::{CustomData, Node};
    use tempfile::TempDir;

    const INTERVAL: Duration = Duration::from_secs(30);

    struct Fixture {
        registry: NodeTypeRegistry,
        tracker: GraphStateTracker,
        surface: HeadlessSurface,
        dir: TempDir,
        store: WorkflowStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = WorkflowStore::new(dir.path());
            Self {
                registry: NodeTypeRegistry::load_from(CatalogSource::BuiltIn).unwrap(),
                tracker: GraphStateTracker::new(),
                surface: HeadlessSurface::new(),
                dir,
                store,
            }
        }

        fn touch(&mut self) {
            let id = format!("launcher_{:08x}", self.tracker.node_count());
            self.tracker
                .register_node(Node {
                    id,
                    node_type: "launcher".to_string(),
                    position: (0.0, 0.0),
                    custom_data: CustomData::None,
                })
                .unwrap();
        }

        fn tick(&mut self, controller: &mut AutosaveController, now: Instant) -> AutosaveOutcome {
            controller.tick(now, &self.registry, &mut self.tracker, &self.surface, &self.store)
        }
    }

    #[test]
    fn test_state_transitions() {
        let start = Instant::now();
        let mut controller = AutosaveController::new(INTERVAL, start);

        assert_eq!(controller.state(start), AutosaveState::Idle);
        assert_eq!(controller.state(start + Duration::from_secs(29)), AutosaveState::Idle);
        assert_eq!(controller.state(start + INTERVAL), AutosaveState::Due);

        controller.reset(start + INTERVAL);
        assert_eq!(controller.state(start + INTERVAL), AutosaveState::Idle);
    }

    #[test]
    fn test_not_due_does_nothing() {
        let mut fx = Fixture::new();
        fx.tracker.set_current_document_name("demo");
        fx.touch();

        let start = Instant::now();
        let mut controller = AutosaveController::new(INTERVAL, start);
        assert_eq!(fx.tick(&mut controller, start + Duration::from_secs(1)), AutosaveOutcome::NotDue);
        assert!(fx.tracker.is_dirty());
        assert!(!fx.store.exists("demo"));
    }

    #[test]
    fn test_clean_graph_is_not_saved() {
        let mut fx = Fixture::new();
        fx.tracker.set_current_document_name("demo");

        let start = Instant::now();
        let mut controller = AutosaveController::new(INTERVAL, start);
        let due = start + INTERVAL;
        assert_eq!(fx.tick(&mut controller, due), AutosaveOutcome::Clean);
        assert!(!fx.store.exists("demo"));
        assert_eq!(controller.state(due), AutosaveState::Idle);
    }

    #[test]
    fn test_unnamed_workflow_is_never_autosaved() {
        let mut fx = Fixture::new();
        fx.touch();

        let start = Instant::now();
        let mut controller = AutosaveController::new(INTERVAL, start);
        let due = start + INTERVAL;
        assert_eq!(fx.tick(&mut controller, due), AutosaveOutcome::Unnamed);
        assert!(fx.tracker.is_dirty());
        assert!(fx.store.list().is_empty());
        assert_eq!(controller.state(due), AutosaveState::Idle);
    }

    #[test]
    fn test_dirty_named_workflow_is_saved() {
        let mut fx = Fixture::new();
        fx.tracker.set_current_document_name("demo");
        fx.touch();

        let start = Instant::now();
        let mut controller = AutosaveController::new(INTERVAL, start);
        let due = start + INTERVAL;
        assert_eq!(fx.tick(&mut controller, due), AutosaveOutcome::Saved("demo".to_string()));
        assert!(!fx.tracker.is_dirty());
        assert_eq!(fx.store.load("demo").unwrap().nodes.len(), 1);

        // Next interval with no changes is a no-op
        assert_eq!(fx.tick(&mut controller, due + INTERVAL), AutosaveOutcome::Clean);
    }

    #[test]
    fn test_failed_save_keeps_dirty_and_waits_an_interval() {
        let mut fx = Fixture::new();
        // A file where the store directory should be makes every write fail
        let blocker = fx.dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();
        fx.store = WorkflowStore::new(&blocker);
        fx.tracker.set_current_document_name("demo");
        fx.touch();

        let start = Instant::now();
        let mut controller = AutosaveController::new(INTERVAL, start);
        let due = start + INTERVAL;
        assert_eq!(fx.tick(&mut controller, due), AutosaveOutcome::Failed("demo".to_string()));
        assert!(fx.tracker.is_dirty());
        assert_eq!(fx.tick(&mut controller, due + Duration::from_secs(1)), AutosaveOutcome::NotDue);
        assert_eq!(
            fx.tick(&mut controller, due + INTERVAL),
            AutosaveOutcome::Failed("demo".to_string())
        );
    }
}
