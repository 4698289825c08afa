use covergen_core::paths::{CONFIG_FILE, DEFAULT_PROJECTS_DIR};
use std::path::{Path, PathBuf};

/// Resolve the covergen workspace root.
///
/// Priority:
/// 1. `--root` flag / `COVERGEN_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `covergen.yaml` or `projects/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root(&cwd).unwrap_or(cwd)
}

fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file() || dir.join(DEFAULT_PROJECTS_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_config_file_above() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}\n").unwrap();
        let subdir = dir.path().join("art/drafts");
        std::fs::create_dir_all(&subdir).unwrap();
        assert_eq!(find_root(&subdir).as_deref(), Some(dir.path()));
    }

    #[test]
    fn finds_projects_dir_above() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("projects/some-book")).unwrap();
        let subdir = dir.path().join("projects/some-book");
        // The project directory itself has no projects/ child; its parent does.
        assert_eq!(find_root(&subdir).as_deref(), Some(dir.path()));
    }
}
