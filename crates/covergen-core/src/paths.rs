use crate::error::{CoverError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "covergen.yaml";
pub const DEFAULT_PROJECTS_DIR: &str = "projects";

pub const INPUT_FILE: &str = "input.json";
pub const STATE_FILE: &str = "workflow.yaml";
pub const LOCK_FILE: &str = ".workflow.lock";
pub const BRIEF_FILE: &str = "brief.json";
pub const RESEARCH_FILE: &str = "research.json";
pub const STRATEGIES_FILE: &str = "strategies.json";
pub const PROMPTS_FILE: &str = "prompts.json";
pub const GENERATION_FILE: &str = "generation_results.json";
pub const REPORT_FILE: &str = "final_report.json";
pub const COVERS_DIR: &str = "covers";

/// Upper bound on the title+author part of a derived slug.
pub const SLUG_BASE_MAX: usize = 50;
pub const SLUG_MAX: usize = 64;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn project_dir(projects_dir: &Path, slug: &str) -> PathBuf {
    projects_dir.join(slug)
}

pub fn state_path(projects_dir: &Path, slug: &str) -> PathBuf {
    project_dir(projects_dir, slug).join(STATE_FILE)
}

pub fn lock_path(projects_dir: &Path, slug: &str) -> PathBuf {
    project_dir(projects_dir, slug).join(LOCK_FILE)
}

pub fn cover_file(slug: &str, concept_id: u32, variation: u32, ext: &str) -> String {
    format!("{COVERS_DIR}/{slug}_concept_{concept_id}_v{variation}.{ext}")
}

/// Resolve a project-relative artifact name to a path, rejecting anything
/// that would escape the project directory.
pub fn artifact_path(projects_dir: &Path, slug: &str, name: &str) -> Result<PathBuf> {
    validate_artifact_name(name)?;
    Ok(project_dir(projects_dir, slug).join(name))
}

pub fn validate_artifact_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|c| c.is_empty() || c == "." || c == "..");
    if bad {
        return Err(CoverError::InvalidInput(format!(
            "invalid artifact name '{name}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > SLUG_MAX || !slug_re().is_match(slug) {
        return Err(CoverError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Derive the base slug for a project from its title and author.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `-`, and truncates to [`SLUG_BASE_MAX`] without leaving a trailing
/// separator. Falls back to `project` when nothing usable remains.
pub fn slugify(title: &str, author: &str) -> String {
    let mut out = String::with_capacity(title.len() + author.len() + 1);
    let mut pending_sep = false;
    for c in title.chars().chain(std::iter::once(' ')).chain(author.chars()) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out.truncate(SLUG_BASE_MAX);
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("project");
    }
    out
}

/// Slug candidate for the `attempt`-th collision (attempt 0 is the base).
pub fn disambiguate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else if attempt < 100 {
        format!("{base}-{}", attempt + 1)
    } else {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("{base}-{}", &id[..8])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
