//! Read-only projections of workflow state for polling clients.

use crate::error::{CoverError, Result};
use crate::project;
use crate::state::WorkflowState;
use crate::store::StateStore;
use crate::types::StepStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub slug: String,
    /// `None` once every step has succeeded.
    pub current_step_name: Option<String>,
    pub current_step_index: usize,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub percent_complete: u8,
    pub is_complete: bool,
    pub is_failed: bool,
    pub is_running: bool,
    pub last_error: Option<String>,
    pub steps: Vec<StepView>,
    pub updated_at: DateTime<Utc>,
}

impl StatusSummary {
    pub fn from_state(state: &WorkflowState) -> Self {
        let completed = state.completed_steps();
        let total = state.total_steps();
        let percent = if total == 0 {
            100
        } else {
            (completed * 100 / total) as u8
        };
        Self {
            slug: state.slug.clone(),
            current_step_name: state.current_step().map(str::to_string),
            current_step_index: state.current_step_index,
            completed_steps: completed,
            total_steps: total,
            percent_complete: percent,
            is_complete: state.is_complete(),
            is_failed: state.is_failed(),
            is_running: state.running_step().is_some(),
            last_error: state.last_error().map(str::to_string),
            steps: state
                .steps
                .iter()
                .map(|name| {
                    let record = state.record(name);
                    StepView {
                        name: name.clone(),
                        status: record.map(|r| r.status).unwrap_or_default(),
                        timestamp: record.map(|r| r.timestamp),
                        error: record.and_then(|r| r.error.clone()),
                    }
                })
                .collect(),
            updated_at: state.updated_at,
        }
    }
}

pub fn get_status(store: &dyn StateStore, slug: &str) -> Result<StatusSummary> {
    let state = store.load_state(slug)?;
    Ok(StatusSummary::from_state(&state))
}

// ---------------------------------------------------------------------------
// Project listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub slug: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub status: Option<StatusSummary>,
    /// Why the project could not be read, if it could not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrupt: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Every project, most recently updated first. Unreadable projects are
/// listed with `corrupt` set instead of failing the listing.
pub fn list_projects(store: &dyn StateStore) -> Result<Vec<ProjectSummary>> {
    let mut projects = Vec::new();
    for slug in store.list_slugs()? {
        let summary = match project::resolve_project(store, &slug) {
            Ok(handle) => {
                let status = StatusSummary::from_state(&handle.state);
                let book = handle.input.book_info;
                ProjectSummary {
                    slug,
                    title: Some(book.title),
                    author: Some(book.author),
                    genre: Some(book.genre),
                    updated_at: Some(status.updated_at),
                    status: Some(status),
                    corrupt: None,
                }
            }
            Err(e @ CoverError::CorruptState { .. }) => {
                warn!(slug = %slug, error = %e, "skipping unreadable project");
                ProjectSummary {
                    slug,
                    title: None,
                    author: None,
                    genre: None,
                    status: None,
                    corrupt: Some(e.to_string()),
                    updated_at: None,
                }
            }
            // Removed between listing and loading.
            Err(CoverError::ProjectNotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        projects.push(summary);
    }
    projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.slug.cmp(&b.slug)));
    Ok(projects)
}
