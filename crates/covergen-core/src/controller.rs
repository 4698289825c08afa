use crate::collab::Collaborators;
use crate::config::Config;
use crate::error::{CoverError, Result};
use crate::executor::Executor;
use crate::project::{self, BookInfo, ProjectHandle};
use crate::state::WorkflowState;
use crate::status::{self, ProjectSummary, StatusSummary};
use crate::step::Pipeline;
use crate::store::{FileStore, StateStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point shared by the CLI and the HTTP server.
///
/// Pausing needs no support here: every step commits before returning, so
/// a project is paused simply by not calling [`Controller::run_step`] or
/// [`Controller::run_all`] again.
#[derive(Debug, Clone)]
pub struct Controller {
    executor: Executor,
}

impl Controller {
    pub fn new(store: Arc<dyn StateStore>, pipeline: Arc<Pipeline>, collab: Collaborators) -> Self {
        Self {
            executor: Executor::new(store, pipeline, collab),
        }
    }

    /// File-backed controller for the workspace at `root`.
    pub fn from_config(root: &Path, config: &Config) -> Self {
        let store = FileStore::new(config.projects_dir(root));
        Self::new(
            Arc::new(store),
            Arc::new(Pipeline::standard()),
            Collaborators::from_config(config),
        )
    }

    /// Load `covergen.yaml` from `root` and build a controller from it.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        Ok(Self::from_config(root, &config))
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        self.executor.store()
    }

    pub fn pipeline(&self) -> &Pipeline {
        self.executor.pipeline()
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn create_project(&self, book: &BookInfo) -> Result<String> {
        project::create_project(self.store().as_ref(), self.pipeline(), book)
    }

    pub fn resolve_project(&self, slug: &str) -> Result<ProjectHandle> {
        project::resolve_project(self.store().as_ref(), slug)
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        status::list_projects(self.store().as_ref())
    }

    pub fn get_status(&self, slug: &str) -> Result<StatusSummary> {
        status::get_status(self.store().as_ref(), slug)
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Run one step: `step`, or the next pending step when `None`.
    ///
    /// A failed step is the next pending step, so calling this again after a
    /// failure is how a step is retried.
    pub fn run_step(&self, slug: &str, step: Option<&str>) -> Result<WorkflowState> {
        let state = self.store().load_state(slug)?;
        let Some(current) = state.current_step() else {
            return Err(CoverError::AllStepsComplete(slug.to_string()));
        };
        let step = step.unwrap_or(current).to_string();
        self.executor.execute_step(slug, &step)
    }

    /// Run every remaining step, stopping at the first failure.
    pub fn run_all(&self, slug: &str) -> Result<WorkflowState> {
        self.executor.execute_until_complete(slug)
    }

    /// Recover an interrupted step, then run every remaining step.
    pub fn resume(&self, slug: &str) -> Result<WorkflowState> {
        self.reconcile(slug)?;
        self.run_all(slug)
    }

    /// Invalidate `step` and everything after it, then run `step` again.
    pub fn rerun(&self, slug: &str, step: &str) -> Result<WorkflowState> {
        self.executor.rerun(slug, step)
    }

    pub fn reconcile(&self, slug: &str) -> Result<Option<String>> {
        self.executor.reconcile(slug)
    }

    /// Reconcile every project. Returns `(slug, step)` for each recovered
    /// step; unreadable projects are logged and skipped.
    pub fn reconcile_all(&self) -> Result<Vec<(String, String)>> {
        let mut recovered = Vec::new();
        for slug in self.store().list_slugs()? {
            match self.reconcile(&slug) {
                Ok(Some(step)) => recovered.push((slug, step)),
                Ok(None) => {}
                Err(e) => warn!(slug = %slug, error = %e, "could not reconcile project"),
            }
        }
        if !recovered.is_empty() {
            info!(count = recovered.len(), "recovered interrupted steps");
        }
        Ok(recovered)
    }
}
