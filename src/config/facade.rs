//! Config loading entry point: assembles sources in precedence order.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::StagehandConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: defaults, global file, `config/config.toml`,
    /// `config/{STAGEHAND_ENV}.toml`, `STAGEHAND__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<StagehandConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: StagehandConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from a single explicit file over the defaults
    pub fn load_from_file(path: &Path) -> Result<StagehandConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Load with an optional explicit file taking the place of the workspace files
    pub fn load_with_override(
        workspace_root: &Path,
        config_file: Option<&Path>,
    ) -> Result<StagehandConfig, ConfigError> {
        match config_file {
            Some(path) => {
                let builder = merge_policy::builder_with_defaults()?;
                let builder = global_file::add_to_builder(builder)?;
                let builder = environment::add_to_builder(builder.add_source(File::from(path)));
                builder.build()?.try_deserialize()
            }
            None => Self::load(workspace_root),
        }
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Defaults only, no files or environment
    pub fn defaults() -> Result<StagehandConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .build()?
            .try_deserialize()
    }
}
