use crate::error::{CoverError, Result};
use crate::paths;
use crate::state::WorkflowState;
use crate::step::Pipeline;
use crate::store::StateStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Attempts made to find a free slug before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 110;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInfo {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
}

impl BookInfo {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            description: description.into(),
        }
    }

    /// Trim every field and reject an empty title or author.
    pub fn normalized(&self) -> Result<Self> {
        let info = Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            genre: self.genre.trim().to_string(),
            description: self.description.trim().to_string(),
        };
        if info.title.is_empty() {
            return Err(CoverError::InvalidInput("title must not be empty".into()));
        }
        if info.author.is_empty() {
            return Err(CoverError::InvalidInput("author must not be empty".into()));
        }
        Ok(info)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMetadata {
    pub project_slug: String,
    pub created_at: DateTime<Utc>,
}

/// Contents of `input.json`, written once at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub book_info: BookInfo,
    pub metadata: InputMetadata,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProjectHandle {
    pub slug: String,
    pub input: ProjectInput,
    pub state: WorkflowState,
}

impl ProjectHandle {
    pub fn book(&self) -> &BookInfo {
        &self.input.book_info
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create a project and return its slug.
///
/// The slug is derived from title and author; when it is already taken a
/// numeric suffix is appended, so creating the same book twice yields two
/// distinct projects.
pub fn create_project(store: &dyn StateStore, pipeline: &Pipeline, book: &BookInfo) -> Result<String> {
    let book = book.normalized()?;
    let base = paths::slugify(&book.title, &book.author);

    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let slug = paths::disambiguate(&base, attempt);
        paths::validate_slug(&slug)?;

        let input = ProjectInput {
            book_info: book.clone(),
            metadata: InputMetadata {
                project_slug: slug.clone(),
                created_at: Utc::now(),
            },
        };
        let input_json = serde_json::to_vec_pretty(&input)?;
        let state = WorkflowState::new(slug.clone(), pipeline.step_names());

        if store.create_project(&slug, &input_json, &state)? {
            info!(slug = %slug, title = %book.title, "project created");
            return Ok(slug);
        }
    }

    Err(CoverError::InvalidInput(format!(
        "could not find a free slug for '{base}'"
    )))
}

/// Load a project's input and workflow state.
pub fn resolve_project(store: &dyn StateStore, slug: &str) -> Result<ProjectHandle> {
    paths::validate_slug(slug).map_err(|_| CoverError::ProjectNotFound(slug.to_string()))?;
    let state = store.load_state(slug)?;
    let input = load_input(store, slug)?;
    Ok(ProjectHandle {
        slug: slug.to_string(),
        input,
        state,
    })
}

pub fn load_input(store: &dyn StateStore, slug: &str) -> Result<ProjectInput> {
    let data = store
        .read_file(slug, paths::INPUT_FILE)?
        .ok_or_else(|| CoverError::CorruptState {
            slug: slug.to_string(),
            reason: format!("{} is missing", paths::INPUT_FILE),
        })?;
    serde_json::from_slice(&data).map_err(|e| CoverError::CorruptState {
        slug: slug.to_string(),
        reason: format!("{}: {e}", paths::INPUT_FILE),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Pipeline;
    use crate::store::MemoryStore;

    fn book() -> BookInfo {
        BookInfo::new(
            "Blood Moon Rising",
            "Sara Riouch",
            "paranormal romance",
            "A werewolf falls for a witch.",
        )
    }

    #[test]
    fn create_writes_input_and_pending_state() {
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        let slug = create_project(&store, &pipeline, &book()).unwrap();
        assert_eq!(slug, "blood-moon-rising-sara-riouch");

        let handle = resolve_project(&store, &slug).unwrap();
        assert_eq!(handle.book().genre, "paranormal romance");
        assert_eq!(handle.state.current_step_index, 0);
        assert_eq!(handle.state.total_steps(), 6);
        assert!(handle.state.step_results.is_empty());
    }

    #[test]
    fn same_title_and_author_get_distinct_slugs() {
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        let first = create_project(&store, &pipeline, &book()).unwrap();
        let second = create_project(&store, &pipeline, &book()).unwrap();
        assert_ne!(first, second);
        assert_eq!(second, "blood-moon-rising-sara-riouch-2");
    }

    #[test]
    fn empty_title_or_author_is_rejected() {
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        let mut b = book();
        b.title = "   ".into();
        assert!(matches!(
            create_project(&store, &pipeline, &b),
            Err(CoverError::InvalidInput(_))
        ));
        let mut b = book();
        b.author = "\t".into();
        assert!(matches!(
            create_project(&store, &pipeline, &b),
            Err(CoverError::InvalidInput(_))
        ));
        assert!(store.list_slugs().unwrap().is_empty());
    }

    #[test]
    fn fields_are_trimmed() {
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        let b = BookInfo::new("  Dune ", " Frank Herbert ", " sci-fi ", " spice ");
        let slug = create_project(&store, &pipeline, &b).unwrap();
        let handle = resolve_project(&store, &slug).unwrap();
        assert_eq!(handle.book().title, "Dune");
        assert_eq!(handle.book().author, "Frank Herbert");
    }

    #[test]
    fn resolve_unknown_project_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            resolve_project(&store, "nope"),
            Err(CoverError::ProjectNotFound(_))
        ));
        assert!(matches!(
            resolve_project(&store, "../etc"),
            Err(CoverError::ProjectNotFound(_))
        ));
    }
}
