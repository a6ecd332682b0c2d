use crate::config::SiteConfig;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Config file names probed in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["siteweave.config.json", "siteweave.config.toml"];

/// Values from the command line that override every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub output_dir: Option<PathBuf>,
}

impl SiteConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI overrides > environment variables > config file > defaults
    ///
    /// Returns the config together with the file it was read from (if any).
    /// Relative directories are resolved against that file's directory, or
    /// against `cwd` when no file was found.
    pub fn load(
        overrides: &ConfigOverrides,
        config_path: Option<&Path>,
        cwd: &Path,
    ) -> Result<(Self, Option<PathBuf>)> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        let config_file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    cwd.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => CONFIG_FILE_NAMES
                .iter()
                .map(|name| cwd.join(name))
                .find(|candidate| candidate.is_file()),
        };

        if let Some(ref path) = config_file {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                _ => figment.merge(Json::file(path)),
            };
        }

        // SITEWEAVE_DEV__PORT=4000 -> dev.port
        figment = figment.merge(Env::prefixed("SITEWEAVE_").split("__"));

        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("dev.port", port));
        }
        if let Some(ref output_dir) = overrides.output_dir {
            figment = figment.merge(Serialized::default("paths.outputDir", output_dir));
        }

        let mut config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Extract(e.to_string()))?;

        let root = config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(cwd)
            .to_path_buf();
        config.resolve_paths(&root);

        Ok((config, config_file))
    }

    /// Get default configuration values.
    pub(crate) fn default_config() -> Self {
        Self {
            pages: Vec::new(),
            api: Default::default(),
            paths: Default::default(),
            dev: Default::default(),
        }
    }
}
