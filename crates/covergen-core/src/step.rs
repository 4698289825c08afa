//! The step registry: an ordered, immutable list of named pipeline stages.

use crate::collab::Collaborators;
use crate::error::{CoverError, Result};
use crate::project::{BookInfo, ProjectInput};
use crate::store::StateStore;
use crate::{paths, stages};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const INPUT_COLLECTION: &str = "Input Collection";
pub const MARKET_RESEARCH: &str = "Market Research";
pub const COVER_STRATEGY: &str = "Cover Strategy";
pub const PROMPT_GENERATION: &str = "Prompt Generation";
pub const IMAGE_GENERATION: &str = "Image Generation";
pub const OUTPUT_ORGANIZATION: &str = "Output Organization";

pub type StepFn = dyn Fn(&StepContext<'_>) -> Result<StepOutput> + Send + Sync;

// ---------------------------------------------------------------------------
// StepOutput
// ---------------------------------------------------------------------------

/// Files written by one successful step run, relative to the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    /// The artifact later steps read through [`StepContext::artifact`].
    pub artifact: String,
    /// Every file written, primary artifact first.
    pub files: Vec<String>,
}

impl StepOutput {
    pub fn single(artifact: impl Into<String>) -> Self {
        let artifact = artifact.into();
        Self {
            files: vec![artifact.clone()],
            artifact,
        }
    }

    pub fn with_extra(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.files.extend(extra);
        self
    }
}

// ---------------------------------------------------------------------------
// StepDescriptor
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct StepDescriptor {
    /// Display name; the key in `step_results`.
    pub name: String,
    /// snake_case alias accepted wherever a step is named.
    pub alias: String,
    /// Primary artifact file the step produces.
    pub artifact: String,
    pub run: Arc<StepFn>,
}

impl fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("artifact", &self.artifact)
            .finish_non_exhaustive()
    }
}

impl StepDescriptor {
    pub fn new(
        name: impl Into<String>,
        artifact: impl Into<String>,
        run: impl Fn(&StepContext<'_>) -> Result<StepOutput> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        Self {
            alias: alias_for(&name),
            name,
            artifact: artifact.into(),
            run: Arc::new(run),
        }
    }
}

fn alias_for(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Ordered step registry, read-only once built.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<StepDescriptor>,
}

impl Pipeline {
    /// Build a custom pipeline. Duplicate names or aliases are rejected.
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self> {
        for (i, step) in steps.iter().enumerate() {
            if steps[..i]
                .iter()
                .any(|s| s.name.eq_ignore_ascii_case(&step.name) || s.alias == step.alias)
            {
                return Err(CoverError::InvalidInput(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
            paths::validate_artifact_name(&step.artifact)?;
        }
        Ok(Self { steps })
    }

    /// The six-stage cover pipeline.
    pub fn standard() -> Self {
        Self {
            steps: vec![
                StepDescriptor::new(INPUT_COLLECTION, paths::BRIEF_FILE, stages::input_collection),
                StepDescriptor::new(MARKET_RESEARCH, paths::RESEARCH_FILE, stages::market_research),
                StepDescriptor::new(COVER_STRATEGY, paths::STRATEGIES_FILE, stages::cover_strategy),
                StepDescriptor::new(
                    PROMPT_GENERATION,
                    paths::PROMPTS_FILE,
                    stages::prompt_generation,
                ),
                StepDescriptor::new(
                    IMAGE_GENERATION,
                    paths::GENERATION_FILE,
                    stages::image_generation,
                ),
                StepDescriptor::new(
                    OUTPUT_ORGANIZATION,
                    paths::REPORT_FILE,
                    stages::output_organization,
                ),
            ],
        }
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    /// Find a step by display name (case-insensitive) or alias.
    pub fn resolve(&self, name: &str) -> Result<(usize, &StepDescriptor)> {
        let wanted = name.trim();
        let alias = alias_for(&wanted.replace(['-', '_'], " "));
        self.steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.name.eq_ignore_ascii_case(wanted) || s.alias == alias)
            .ok_or_else(|| CoverError::UnknownStep(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// StepContext
// ---------------------------------------------------------------------------

/// What a running step may see: the project input, the collaborators, and
/// the artifacts of strictly earlier steps.
pub struct StepContext<'a> {
    pub slug: &'a str,
    pub step: &'a StepDescriptor,
    pub step_index: usize,
    pub input: &'a ProjectInput,
    pub collab: &'a Collaborators,
    pub(crate) store: &'a dyn StateStore,
    pub(crate) pipeline: &'a Pipeline,
}

impl<'a> StepContext<'a> {
    pub fn book(&self) -> &BookInfo {
        &self.input.book_info
    }

    /// Raw bytes of an earlier step's primary artifact.
    pub fn artifact_bytes(&self, step: &str) -> Result<Vec<u8>> {
        let (index, dep) = self.pipeline.resolve(step)?;
        if index >= self.step_index {
            return Err(CoverError::UndeclaredDependency {
                step: self.step.name.clone(),
                dependency: dep.name.clone(),
            });
        }
        self.store
            .read_file(self.slug, &dep.artifact)?
            .ok_or_else(|| CoverError::CorruptState {
                slug: self.slug.to_string(),
                reason: format!("artifact '{}' of step '{}' is missing", dep.artifact, dep.name),
            })
    }

    /// An earlier step's primary artifact, parsed as JSON.
    pub fn artifact<T: DeserializeOwned>(&self, step: &str) -> Result<T> {
        let data = self.artifact_bytes(step)?;
        serde_json::from_slice(&data).map_err(|e| CoverError::CorruptState {
            slug: self.slug.to_string(),
            reason: format!("artifact of step '{step}' is malformed: {e}"),
        })
    }

    pub fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        self.store.write_file(self.slug, name, data)
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec_pretty(value)?;
        self.write_file(name, &data)
    }

    pub fn remove_file(&self, name: &str) -> Result<()> {
        self.store.remove_file(self.slug, name)
    }

    /// Wrap a collaborator failure so it is recorded against this step.
    pub fn collaborator_error(&self, err: anyhow::Error) -> CoverError {
        CoverError::Collaborator {
            step: self.step.name.clone(),
            message: format!("{err:#}"),
        }
    }
}
