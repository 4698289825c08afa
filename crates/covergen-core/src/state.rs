use crate::error::{CoverError, Result};
use crate::types::StepStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// StepRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    /// Time of the last status change.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Primary artifact written by the last successful run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Every file the last successful run wrote, relative to the project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    /// Process that owns a `running` step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_pid: Option<u32>,
    /// Per-process token of that owner; tells a restarted process that
    /// reused the pid apart from the one that started the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_token: Option<String>,
    #[serde(default)]
    pub attempts: u32,
}

impl StepRecord {
    fn pending(now: DateTime<Utc>) -> Self {
        Self {
            status: StepStatus::Pending,
            timestamp: now,
            started_at: None,
            finished_at: None,
            error: None,
            artifact: None,
            outputs: Vec::new(),
            owner_pid: None,
            owner_token: None,
            attempts: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Durable pipeline progress for one project.
///
/// `current_step_index == steps.len()` is the terminal sentinel: every step
/// has succeeded. `step_results` only holds entries for steps at or before
/// the cursor; a step without an entry is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub slug: String,
    /// Step names in pipeline order, fixed when the project is created.
    pub steps: Vec<String>,
    pub current_step_index: usize,
    #[serde(default)]
    pub step_results: BTreeMap<String, StepRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl WorkflowState {
    pub fn new(slug: impl Into<String>, steps: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            version: 1,
            slug: slug.into(),
            steps,
            current_step_index: 0,
            step_results: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // ---------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_complete(&self) -> bool {
        self.current_step_index >= self.steps.len()
    }

    /// Name of the step at the cursor, `None` once the pipeline is complete.
    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.current_step_index).map(String::as_str)
    }

    pub fn index_of(&self, step: &str) -> Option<usize> {
        self.steps.iter().position(|s| s == step)
    }

    pub fn record(&self, step: &str) -> Option<&StepRecord> {
        self.step_results.get(step)
    }

    pub fn status_of(&self, step: &str) -> StepStatus {
        self.record(step)
            .map(|r| r.status)
            .unwrap_or(StepStatus::Pending)
    }

    pub fn running_step(&self) -> Option<&str> {
        self.step_results
            .iter()
            .find(|(_, r)| r.status == StepStatus::Running)
            .map(|(name, _)| name.as_str())
    }

    pub fn completed_steps(&self) -> usize {
        self.step_results
            .values()
            .filter(|r| r.status == StepStatus::Success)
            .count()
    }

    pub fn is_failed(&self) -> bool {
        self.current_step()
            .map(|s| self.status_of(s) == StepStatus::Failed)
            .unwrap_or(false)
    }

    /// Error summary of the step at the cursor, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        let step = self.current_step()?;
        let record = self.record(step)?;
        if record.status == StepStatus::Failed {
            record.error.as_deref()
        } else {
            None
        }
    }

    /// Check the structural invariants of a loaded record.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.current_step_index > self.steps.len() {
            return Err(format!(
                "current_step_index {} exceeds {} steps",
                self.current_step_index,
                self.steps.len()
            ));
        }
        let mut running = 0;
        for (name, record) in &self.step_results {
            let Some(idx) = self.index_of(name) else {
                return Err(format!("result recorded for unknown step '{name}'"));
            };
            if idx > self.current_step_index {
                return Err(format!("result recorded for future step '{name}'"));
            }
            if idx < self.current_step_index && record.status != StepStatus::Success {
                return Err(format!(
                    "step '{name}' is behind the cursor but {}",
                    record.status
                ));
            }
            if idx == self.current_step_index && record.status == StepStatus::Success {
                return Err(format!("step '{name}' succeeded but the cursor did not advance"));
            }
            if record.status == StepStatus::Running {
                running += 1;
            }
        }
        if running > 1 {
            return Err(format!("{running} steps are running at once"));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Transitions (driven only by the store's mark_* operations)
    // ---------------------------------------------------------------------------

    fn ensure_current(&self, step: &str) -> Result<()> {
        if self.index_of(step).is_none() {
            return Err(CoverError::UnknownStep(step.to_string()));
        }
        match self.current_step() {
            Some(current) if current == step => Ok(()),
            Some(current) => Err(CoverError::StepOutOfOrder {
                requested: step.to_string(),
                expected: format!("'{current}'"),
            }),
            None => Err(CoverError::StepOutOfOrder {
                requested: step.to_string(),
                expected: "none (pipeline complete)".to_string(),
            }),
        }
    }

    /// Whether `step` would be accepted right now, as a plain run or as a
    /// rerun. Checks only; the record is not touched.
    pub fn check_runnable(&self, step: &str, rerun: bool) -> Result<()> {
        if let Some(running) = self.running_step() {
            return Err(CoverError::StepAlreadyRunning {
                slug: self.slug.clone(),
                step: running.to_string(),
            });
        }
        if !rerun {
            if self.is_complete() {
                return Err(CoverError::AllStepsComplete(self.slug.clone()));
            }
            return self.ensure_current(step);
        }
        match self.index_of(step) {
            None => Err(CoverError::UnknownStep(step.to_string())),
            Some(target) if target > self.current_step_index => self.ensure_current(step),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn begin(&mut self, step: &str, pid: u32, token: &str) -> Result<()> {
        self.ensure_current(step)?;
        if self.status_of(step) == StepStatus::Running {
            return Err(CoverError::StepAlreadyRunning {
                slug: self.slug.clone(),
                step: step.to_string(),
            });
        }
        let now = Utc::now();
        let record = self
            .step_results
            .entry(step.to_string())
            .or_insert_with(|| StepRecord::pending(now));
        record.status = StepStatus::Running;
        record.timestamp = now;
        record.started_at = Some(now);
        record.finished_at = None;
        record.error = None;
        record.owner_pid = Some(pid);
        record.owner_token = Some(token.to_string());
        record.attempts += 1;
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn complete(&mut self, step: &str, artifact: &str, outputs: Vec<String>) -> Result<()> {
        self.ensure_current(step)?;
        let now = Utc::now();
        let record = self.running_record(step, StepStatus::Success)?;
        record.status = StepStatus::Success;
        record.timestamp = now;
        record.finished_at = Some(now);
        record.error = None;
        record.artifact = Some(artifact.to_string());
        record.outputs = outputs;
        record.owner_pid = None;
        record.owner_token = None;
        self.current_step_index += 1;
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn fail(&mut self, step: &str, summary: &str) -> Result<()> {
        self.ensure_current(step)?;
        let now = Utc::now();
        let record = self.running_record(step, StepStatus::Failed)?;
        record.status = StepStatus::Failed;
        record.timestamp = now;
        record.finished_at = Some(now);
        record.error = Some(summary.to_string());
        record.owner_pid = None;
        record.owner_token = None;
        self.updated_at = now;
        Ok(())
    }

    /// Move the cursor back to `step`, resetting it and dropping every later
    /// result. Returns the output files recorded by the invalidated steps.
    pub(crate) fn rewind(&mut self, step: &str) -> Result<Vec<String>> {
        let Some(target) = self.index_of(step) else {
            return Err(CoverError::UnknownStep(step.to_string()));
        };
        if target > self.current_step_index {
            return Err(CoverError::StepOutOfOrder {
                requested: step.to_string(),
                expected: self
                    .current_step()
                    .map(|s| format!("'{s}'"))
                    .unwrap_or_else(|| "none (pipeline complete)".to_string()),
            });
        }
        if let Some(running) = self.running_step() {
            return Err(CoverError::StepAlreadyRunning {
                slug: self.slug.clone(),
                step: running.to_string(),
            });
        }

        let mut stale = Vec::new();
        for name in &self.steps[target..] {
            if let Some(record) = self.step_results.get(name) {
                stale.extend(record.outputs.iter().cloned());
            }
        }
        for name in self.steps[target + 1..].to_vec() {
            self.step_results.remove(&name);
        }

        let now = Utc::now();
        let record = self
            .step_results
            .entry(step.to_string())
            .or_insert_with(|| StepRecord::pending(now));
        record.status = StepStatus::Pending;
        record.timestamp = now;
        record.started_at = None;
        record.finished_at = None;
        record.error = None;
        record.artifact = None;
        record.outputs.clear();
        record.owner_pid = None;
        record.owner_token = None;

        self.current_step_index = target;
        self.updated_at = now;
        Ok(stale)
    }

    fn running_record(&mut self, step: &str, to: StepStatus) -> Result<&mut StepRecord> {
        let status = self.status_of(step);
        if status != StepStatus::Running {
            return Err(CoverError::InvalidTransition {
                step: step.to_string(),
                from: status.to_string(),
                to: to.to_string(),
            });
        }
        self.step_results
            .get_mut(step)
            .ok_or_else(|| CoverError::UnknownStep(step.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
