use crate::error::{CoverError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ImagesConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageProvider {
    /// Ideogram when the API key variable is set, placeholders otherwise.
    #[default]
    Auto,
    Ideogram,
    Placeholder,
}

/// Aspect ratios the image service accepts.
pub const SUPPORTED_ASPECT_RATIOS: &[&str] = &["1:1", "2:3", "3:2", "3:4", "4:3", "9:16", "16:9"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub provider: ImageProvider,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_variations")]
    pub variations_per_concept: u32,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_rendering_speed")]
    pub rendering_speed: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.ideogram.ai/v1".to_string()
}

fn default_api_key_env() -> String {
    "IDEOGRAM_API_KEY".to_string()
}

fn default_variations() -> u32 {
    2
}

fn default_aspect_ratio() -> String {
    "2:3".to_string()
}

fn default_rendering_speed() -> String {
    "TURBO".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            provider: ImageProvider::default(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            variations_per_concept: default_variations(),
            aspect_ratio: default_aspect_ratio(),
            rendering_speed: default_rendering_speed(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ImagesConfig {
    /// The API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PROJECTS_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            images: ImagesConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load `covergen.yaml` from `root`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        let Some(data) = crate::io::read_optional(&path)? else {
            return Ok(Self::default());
        };
        serde_yaml::from_slice(&data)
            .map_err(|e| CoverError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Absolute projects directory for a workspace rooted at `root`.
    pub fn projects_dir(&self, root: &Path) -> PathBuf {
        if self.projects_dir.is_absolute() {
            self.projects_dir.clone()
        } else {
            root.join(&self.projects_dir)
        }
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let images = &self.images;

        if !(1..=8).contains(&images.variations_per_concept) {
            warnings.push(ConfigWarning {
                level: if images.variations_per_concept == 0 {
                    WarnLevel::Error
                } else {
                    WarnLevel::Warning
                },
                message: format!(
                    "images.variations_per_concept={} is outside 1..=8",
                    images.variations_per_concept
                ),
            });
        }

        if !SUPPORTED_ASPECT_RATIOS.contains(&images.aspect_ratio.as_str()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "unknown images.aspect_ratio '{}', falling back to 2:3",
                    images.aspect_ratio
                ),
            });
        }

        if images.base_url.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "images.base_url is empty".to_string(),
            });
        }

        if images.provider == ImageProvider::Ideogram && images.api_key().is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "images.provider is ideogram but ${} is not set",
                    images.api_key_env
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.projects_dir, PathBuf::from("projects"));
        assert_eq!(cfg.images.variations_per_concept, 2);
        assert_eq!(cfg.images.provider, ImageProvider::Auto);
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("covergen.yaml"),
            "images:\n  provider: placeholder\n  variations_per_concept: 1\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.images.provider, ImageProvider::Placeholder);
        assert_eq!(cfg.images.variations_per_concept, 1);
        assert_eq!(cfg.images.aspect_ratio, "2:3");
        assert_eq!(cfg.images.base_url, "https://api.ideogram.ai/v1");
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("covergen.yaml"), "images: [1, 2").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CoverError::Config(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.server.port = 8080;
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().server.port, 8080);
    }

    #[test]
    fn relative_projects_dir_is_joined_to_root() {
        let cfg = Config::default();
        assert_eq!(
            cfg.projects_dir(Path::new("/srv/covers")),
            PathBuf::from("/srv/covers/projects")
        );
        let cfg = Config {
            projects_dir: PathBuf::from("/data/projects"),
            ..Config::default()
        };
        assert_eq!(
            cfg.projects_dir(Path::new("/srv/covers")),
            PathBuf::from("/data/projects")
        );
    }

    #[test]
    fn default_config_has_no_warnings() {
        let mut cfg = Config::default();
        cfg.images.provider = ImageProvider::Placeholder;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.images.variations_per_concept = 0;
        cfg.images.aspect_ratio = "5:7".into();
        cfg.images.base_url = " ".into();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("variations_per_concept=0")));
        assert!(warnings.iter().any(|w| w.message.contains("'5:7'")));
        assert!(warnings.iter().any(|w| w.message.contains("base_url is empty")));
    }
}
