use covergen_core::Controller;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Lifecycle events pushed to `/api/events` subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        slug: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<String>,
    },
    RunFinished {
        slug: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl RunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "run_started",
            RunEvent::RunFinished { .. } => "run_finished",
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub controller: Controller,
    /// Slugs with a background run in this server.
    active: Arc<Mutex<HashSet<String>>>,
    pub event_tx: broadcast::Sender<RunEvent>,
}

impl AppState {
    pub fn new(root: PathBuf, controller: Controller) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            root,
            controller,
            active: Arc::new(Mutex::new(HashSet::new())),
            event_tx,
        }
    }

    /// Load `covergen.yaml` under `root` and build the state from it.
    pub fn open(root: PathBuf) -> covergen_core::Result<Self> {
        let controller = Controller::open(&root)?;
        Ok(Self::new(root, controller))
    }

    pub fn is_active(&self, slug: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(slug)
    }

    /// Claim `slug` for a background run. `None` when one is already active.
    pub fn try_begin_run(&self, slug: &str) -> Option<RunGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(slug.to_string()) {
            return None;
        }
        Some(RunGuard {
            slug: slug.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn emit(&self, event: RunEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

/// Releases the slug's active-run claim on drop, including on panic.
#[derive(Debug)]
pub struct RunGuard {
    slug: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.slug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covergen_core::collab::Collaborators;
    use covergen_core::step::Pipeline;
    use covergen_core::store::MemoryStore;

    fn state() -> AppState {
        let controller = Controller::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Pipeline::standard()),
            Collaborators::offline(),
        );
        AppState::new(PathBuf::from("/tmp/test"), controller)
    }

    #[test]
    fn new_state_stores_root() {
        assert_eq!(state().root, PathBuf::from("/tmp/test"));
    }

    #[test]
    fn run_claim_is_exclusive_until_dropped() {
        let app = state();
        let guard = app.try_begin_run("demo").unwrap();
        assert!(app.is_active("demo"));
        assert!(app.try_begin_run("demo").is_none());
        assert!(app.try_begin_run("other").is_some());
        drop(guard);
        assert!(!app.is_active("demo"));
        assert!(app.try_begin_run("demo").is_some());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = RunEvent::RunFinished {
            slug: "demo".into(),
            ok: false,
            error: Some("quota exceeded".into()),
        };
        assert_eq!(event.name(), "run_finished");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "run_finished");
        assert_eq!(json["error"], "quota exceeded");
    }
}
