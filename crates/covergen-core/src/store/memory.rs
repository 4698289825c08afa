use super::StateStore;
use crate::error::{CoverError, Result};
use crate::paths;
use crate::state::WorkflowState;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryProject {
    /// Serialized record, so corruption can be simulated with raw text.
    state: String,
    files: BTreeMap<String, Vec<u8>>,
}

/// In-process store used by tests and embedders that need no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: Mutex<BTreeMap<String, MemoryProject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a project's record with arbitrary text.
    pub fn put_raw_state(&self, slug: &str, raw: &str) {
        let mut projects = self.guard();
        projects.entry(slug.to_string()).or_default().state = raw.to_string();
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, MemoryProject>> {
        self.projects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn parse(slug: &str, raw: &str) -> Result<WorkflowState> {
        let corrupt = |reason: String| CoverError::CorruptState {
            slug: slug.to_string(),
            reason,
        };
        let state: WorkflowState = serde_yaml::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
        state.validate().map_err(corrupt)?;
        Ok(state)
    }
}

impl StateStore for MemoryStore {
    fn create_project(&self, slug: &str, input: &[u8], state: &WorkflowState) -> Result<bool> {
        paths::validate_slug(slug)?;
        let mut projects = self.guard();
        if projects.contains_key(slug) {
            return Ok(false);
        }
        let mut project = MemoryProject {
            state: serde_yaml::to_string(state)?,
            files: BTreeMap::new(),
        };
        project
            .files
            .insert(paths::INPUT_FILE.to_string(), input.to_vec());
        projects.insert(slug.to_string(), project);
        Ok(true)
    }

    fn list_slugs(&self) -> Result<Vec<String>> {
        Ok(self.guard().keys().cloned().collect())
    }

    fn load_state(&self, slug: &str) -> Result<WorkflowState> {
        let projects = self.guard();
        let project = projects
            .get(slug)
            .ok_or_else(|| CoverError::ProjectNotFound(slug.to_string()))?;
        Self::parse(slug, &project.state)
    }

    fn save_state(&self, slug: &str, state: &WorkflowState) -> Result<()> {
        let raw = serde_yaml::to_string(state)?;
        let mut projects = self.guard();
        let project = projects
            .get_mut(slug)
            .ok_or_else(|| CoverError::ProjectNotFound(slug.to_string()))?;
        project.state = raw;
        Ok(())
    }

    fn transact(
        &self,
        slug: &str,
        f: &mut dyn FnMut(&mut WorkflowState) -> Result<()>,
    ) -> Result<WorkflowState> {
        let mut projects = self.guard();
        let project = projects
            .get_mut(slug)
            .ok_or_else(|| CoverError::ProjectNotFound(slug.to_string()))?;
        let mut state = Self::parse(slug, &project.state)?;
        f(&mut state)?;
        project.state = serde_yaml::to_string(&state)?;
        Ok(state)
    }

    fn read_file(&self, slug: &str, name: &str) -> Result<Option<Vec<u8>>> {
        paths::validate_artifact_name(name)?;
        let projects = self.guard();
        let project = projects
            .get(slug)
            .ok_or_else(|| CoverError::ProjectNotFound(slug.to_string()))?;
        Ok(project.files.get(name).cloned())
    }

    fn write_file(&self, slug: &str, name: &str, data: &[u8]) -> Result<()> {
        paths::validate_artifact_name(name)?;
        let mut projects = self.guard();
        let project = projects
            .get_mut(slug)
            .ok_or_else(|| CoverError::ProjectNotFound(slug.to_string()))?;
        project.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn remove_file(&self, slug: &str, name: &str) -> Result<()> {
        paths::validate_artifact_name(name)?;
        if let Some(project) = self.guard().get_mut(slug) {
            project.files.remove(name);
        }
        Ok(())
    }
}
