pub mod project;
pub mod run;
pub mod serve;

use anyhow::Context;
use covergen_core::config::{Config, WarnLevel};
use covergen_core::Controller;
use std::path::Path;

/// Load `covergen.yaml` (printing any warnings to stderr) and build the
/// controller for `root`.
pub fn open(root: &Path) -> anyhow::Result<(Config, Controller)> {
    let config = Config::load(root)
        .with_context(|| format!("failed to load config under {}", root.display()))?;
    for warning in config.validate() {
        let level = match warning.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "config error",
        };
        eprintln!("{level}: {}", warning.message);
    }
    let controller = Controller::from_config(root, &config);
    Ok((config, controller))
}
