use super::StateStore;
use crate::error::{CoverError, Result};
use crate::io::{atomic_write, ensure_dir, read_optional, remove_if_exists};
use crate::paths;
use crate::state::WorkflowState;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem-backed store rooted at a `projects/` directory.
///
/// Each project lives in `projects/<slug>/`. The workflow record is
/// `workflow.yaml`, replaced via tempfile+rename on every save, and
/// read-modify-write cycles hold an exclusive lock on `.workflow.lock` so
/// that separate processes never interleave them.
#[derive(Debug, Clone)]
pub struct FileStore {
    projects_dir: PathBuf,
}

/// Holds the project lock until dropped.
struct ProjectLock {
    file: File,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl FileStore {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
        }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    pub fn project_dir(&self, slug: &str) -> PathBuf {
        paths::project_dir(&self.projects_dir, slug)
    }

    fn lock(&self, slug: &str) -> Result<ProjectLock> {
        if !paths::state_path(&self.projects_dir, slug).exists() {
            return Err(CoverError::ProjectNotFound(slug.to_string()));
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(paths::lock_path(&self.projects_dir, slug))?;
        file.lock_exclusive()?;
        Ok(ProjectLock { file })
    }

    fn parse_state(slug: &str, data: &[u8]) -> Result<WorkflowState> {
        let corrupt = |reason: String| CoverError::CorruptState {
            slug: slug.to_string(),
            reason,
        };
        let state: WorkflowState =
            serde_yaml::from_slice(data).map_err(|e| corrupt(e.to_string()))?;
        if state.slug != slug {
            return Err(corrupt(format!("record belongs to '{}'", state.slug)));
        }
        state.validate().map_err(corrupt)?;
        Ok(state)
    }
}

impl StateStore for FileStore {
    fn create_project(&self, slug: &str, input: &[u8], state: &WorkflowState) -> Result<bool> {
        paths::validate_slug(slug)?;
        ensure_dir(&self.projects_dir)?;
        let dir = self.project_dir(slug);
        match std::fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        ensure_dir(&dir.join(paths::COVERS_DIR))?;
        atomic_write(&dir.join(paths::INPUT_FILE), input)?;
        // The state record goes last: its presence marks the project as usable.
        self.save_state(slug, state)?;
        debug!(slug, dir = %dir.display(), "project storage created");
        Ok(true)
    }

    fn list_slugs(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.projects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if paths::validate_slug(&name).is_ok() && entry.path().join(paths::STATE_FILE).exists() {
                slugs.push(name);
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    fn load_state(&self, slug: &str) -> Result<WorkflowState> {
        paths::validate_slug(slug).map_err(|_| CoverError::ProjectNotFound(slug.to_string()))?;
        let path = paths::state_path(&self.projects_dir, slug);
        let data = read_optional(&path)?.ok_or_else(|| CoverError::ProjectNotFound(slug.to_string()))?;
        Self::parse_state(slug, &data)
    }

    fn save_state(&self, slug: &str, state: &WorkflowState) -> Result<()> {
        let yaml = serde_yaml::to_string(state)?;
        atomic_write(&paths::state_path(&self.projects_dir, slug), yaml.as_bytes())
    }

    fn transact(
        &self,
        slug: &str,
        f: &mut dyn FnMut(&mut WorkflowState) -> Result<()>,
    ) -> Result<WorkflowState> {
        paths::validate_slug(slug).map_err(|_| CoverError::ProjectNotFound(slug.to_string()))?;
        let _lock = self.lock(slug)?;
        let mut state = self.load_state(slug)?;
        f(&mut state)?;
        self.save_state(slug, &state)?;
        Ok(state)
    }

    fn read_file(&self, slug: &str, name: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&paths::artifact_path(&self.projects_dir, slug, name)?)
    }

    fn write_file(&self, slug: &str, name: &str, data: &[u8]) -> Result<()> {
        atomic_write(&paths::artifact_path(&self.projects_dir, slug, name)?, data)
    }

    fn remove_file(&self, slug: &str, name: &str) -> Result<()> {
        remove_if_exists(&paths::artifact_path(&self.projects_dir, slug, name)?)?;
        Ok(())
    }
}
