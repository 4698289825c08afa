//! Runs pipeline steps against durable state.
//!
//! Every exit path of [`Executor::execute_step`] leaves the step in a
//! terminal status: success, a recorded failure, or (for a panicking step)
//! a recorded failure naming the panic. Only a process crash between
//! `mark_step_running` and the final write can leave a step `running`;
//! [`Executor::reconcile_with`] recovers from that.

use crate::collab::Collaborators;
use crate::error::{CoverError, Result};
use crate::project;
use crate::state::WorkflowState;
use crate::step::{Pipeline, StepContext, StepDescriptor, StepOutput};
use crate::store::StateStore;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn StateStore>,
    pipeline: Arc<Pipeline>,
    collab: Collaborators,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("pipeline", &self.pipeline)
            .field("collab", &self.collab)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(store: Arc<dyn StateStore>, pipeline: Arc<Pipeline>, collab: Collaborators) -> Self {
        Self {
            store,
            pipeline,
            collab,
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run exactly the step at the project's cursor.
    ///
    /// Fails with `StepOutOfOrder` (state untouched) when `step` is not the
    /// current step and with `StepAlreadyRunning` when another caller holds
    /// it. A step failure is recorded and then returned.
    pub fn execute_step(&self, slug: &str, step: &str) -> Result<WorkflowState> {
        let (index, descriptor) = self.pipeline.resolve(step)?;
        let name = descriptor.name.as_str();

        self.store.mark_step_running(slug, name)?;
        info!(slug, step = name, "step started");

        let outcome = self.run_guarded(slug, index, descriptor).and_then(|output| {
            self.store
                .mark_step_success(slug, name, &output.artifact, &output.files)
        });

        match outcome {
            Ok(state) => {
                info!(
                    slug,
                    step = name,
                    completed = state.completed_steps(),
                    total = state.total_steps(),
                    "step succeeded"
                );
                Ok(state)
            }
            Err(e) => {
                self.record_failure(slug, name, &e);
                Err(e)
            }
        }
    }

    /// Walk forward from the cursor until the pipeline completes or a step
    /// fails. Never retries.
    pub fn execute_until_complete(&self, slug: &str) -> Result<WorkflowState> {
        loop {
            let state = self.store.load_state(slug)?;
            let Some(step) = state.current_step() else {
                info!(slug, "pipeline complete");
                return Ok(state);
            };
            let step = step.to_string();
            self.execute_step(slug, &step)?;
        }
    }

    /// Recover a step left `running` by a process that no longer exists.
    ///
    /// The step is marked failed so that it becomes the next pending step
    /// again; success is never assumed. Returns the recovered step, if any.
    pub fn reconcile_with(
        &self,
        slug: &str,
        is_alive: &dyn Fn(u32, Option<&str>) -> bool,
    ) -> Result<Option<String>> {
        let state = self.store.load_state(slug)?;
        let Some(step) = state.running_step().map(str::to_string) else {
            return Ok(None);
        };
        let record = state.record(&step);
        let owner = record.and_then(|r| r.owner_pid);
        let token = record.and_then(|r| r.owner_token.as_deref());
        if owner.is_some_and(|pid| is_alive(pid, token)) {
            return Ok(None);
        }

        let summary = match owner {
            Some(pid) => format!("interrupted: process {pid} exited while the step was running"),
            None => "interrupted: step was left running without an owner".to_string(),
        };
        match self.store.mark_step_failed(slug, &step, &summary) {
            Ok(_) => {
                warn!(slug, step = %step, owner = ?owner, "recovered interrupted step");
                Ok(Some(step))
            }
            // Someone else finished or recovered it first.
            Err(CoverError::InvalidTransition { .. }) | Err(CoverError::StepOutOfOrder { .. }) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn reconcile(&self, slug: &str) -> Result<Option<String>> {
        self.reconcile_with(slug, &crate::process::is_owner_alive)
    }

    /// Invalidate `step` and every later step, deleting the files they had
    /// recorded, then execute `step` again.
    pub fn rerun(&self, slug: &str, step: &str) -> Result<WorkflowState> {
        let (_, descriptor) = self.pipeline.resolve(step)?;
        let name = descriptor.name.as_str();
        let stale = self.store.rewind_to(slug, name)?;
        for file in &stale {
            self.store.remove_file(slug, file)?;
        }
        info!(slug, step = name, removed = stale.len(), "invalidated step and downstream");
        self.execute_step(slug, name)
    }

    fn run_guarded(&self, slug: &str, index: usize, descriptor: &StepDescriptor) -> Result<StepOutput> {
        let run = || -> Result<StepOutput> {
            let input = project::load_input(self.store.as_ref(), slug)?;
            let ctx = StepContext {
                slug,
                step: descriptor,
                step_index: index,
                input: &input,
                collab: &self.collab,
                store: self.store.as_ref(),
                pipeline: &self.pipeline,
            };
            (descriptor.run)(&ctx)
        };
        panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(CoverError::Collaborator {
                step: descriptor.name.clone(),
                message: format!("step panicked: {message}"),
            })
        })
    }

    fn record_failure(&self, slug: &str, step: &str, err: &CoverError) {
        let summary = err.summary();
        warn!(slug, step, error = %summary, "step failed");
        if let Err(e) = self.store.mark_step_failed(slug, step, &summary) {
            error!(slug, step, error = %e, "could not record step failure");
        }
    }
}
