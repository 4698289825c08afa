//! Durable per-project workflow state and artifact storage.
//!
//! [`StateStore`] is the single source of truth for pipeline progress. The
//! workflow record is only ever changed through the `mark_*` operations (and
//! [`StateStore::rewind_to`] for explicit re-runs), each of which is one
//! atomic load–mutate–save cycle via [`StateStore::transact`].

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::state::WorkflowState;

pub trait StateStore: Send + Sync {
    /// Create a project's storage. Returns `false` without touching anything
    /// when `slug` is already taken.
    fn create_project(&self, slug: &str, input: &[u8], state: &WorkflowState) -> Result<bool>;

    /// Slugs of every project with a state record, sorted.
    fn list_slugs(&self) -> Result<Vec<String>>;

    /// Fails with `ProjectNotFound` when there is no record and
    /// `CorruptState` when the record cannot be parsed or is inconsistent.
    fn load_state(&self, slug: &str) -> Result<WorkflowState>;

    /// Replace the record atomically: readers observe the old or the new
    /// record, never a partial one.
    fn save_state(&self, slug: &str, state: &WorkflowState) -> Result<()>;

    /// Run `f` against the current record and persist the result, excluding
    /// every other `transact` on the same project for the whole cycle. Nothing
    /// is written when `f` fails.
    fn transact(
        &self,
        slug: &str,
        f: &mut dyn FnMut(&mut WorkflowState) -> Result<()>,
    ) -> Result<WorkflowState>;

    fn read_file(&self, slug: &str, name: &str) -> Result<Option<Vec<u8>>>;

    fn write_file(&self, slug: &str, name: &str, data: &[u8]) -> Result<()>;

    fn remove_file(&self, slug: &str, name: &str) -> Result<()>;

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Guarded transition to `running`, owned by the current process.
    /// Fails with `StepAlreadyRunning` if the step is already running.
    fn mark_step_running(&self, slug: &str, step: &str) -> Result<WorkflowState> {
        let pid = std::process::id();
        let token = crate::process::owner_token();
        self.transact(slug, &mut |state| state.begin(step, pid, token))
    }

    /// Record success and advance the cursor to the next step.
    fn mark_step_success(
        &self,
        slug: &str,
        step: &str,
        artifact: &str,
        outputs: &[String],
    ) -> Result<WorkflowState> {
        self.transact(slug, &mut |state| state.complete(step, artifact, outputs.to_vec()))
    }

    fn mark_step_failed(&self, slug: &str, step: &str, summary: &str) -> Result<WorkflowState> {
        self.transact(slug, &mut |state| state.fail(step, summary))
    }

    /// Invalidate `step` and everything after it. Returns the output files
    /// the invalidated steps had recorded.
    fn rewind_to(&self, slug: &str, step: &str) -> Result<Vec<String>> {
        let mut stale = Vec::new();
        self.transact(slug, &mut |state| {
            stale = state.rewind(step)?;
            Ok(())
        })?;
        Ok(stale)
    }
}
