//! Site configuration with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and config files.
//! Priority: CLI > Environment > File > Defaults

mod defaults;
mod descriptor;
mod loading;
mod tests;
mod types;
mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use defaults::*;
pub use descriptor::{DataTransform, PageDescriptor};
pub use loading::{ConfigOverrides, CONFIG_FILE_NAMES};
pub use types::*;

/// Site configuration - loaded from siteweave.config.json / .toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteConfig {
    /// Pages to build, in build order
    #[serde(default)]
    pub pages: Vec<PageConfig>,

    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Source and output directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Development server settings
    #[serde(default)]
    pub dev: DevSettings,
}

/// One page: a template rendered against (optional) API data into one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageConfig {
    /// Template file name, relative to `paths.templateDir`
    pub template: String,

    /// Output file name, relative to `paths.outputDir`
    pub output: String,

    /// API endpoint, relative to `api.baseUrl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,

    /// Request method
    #[serde(default)]
    pub method: HttpMethod,

    /// Query parameters (GET) or JSON body (POST)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: serde_json::Map<String, serde_json::Value>,

    /// Optional pure transform applied to the fetched data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformSpec>,
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL prepended to every page endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
            headers: BTreeMap::new(),
        }
    }
}

/// Source and output directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PathsConfig {
    /// Template source directory
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Output directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Static assets copied to `<outputDir>/assets`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            output_dir: default_output_dir(),
            assets_dir: default_assets_dir(),
        }
    }
}

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DevSettings {
    /// Preferred port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Quiet period before a burst of changes triggers a rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay between `build-complete` and `reload`
    #[serde(default = "default_reload_delay_ms")]
    pub reload_delay_ms: u64,

    /// Delay before a fresh watcher is attached after a rebuild
    #[serde(default = "default_reattach_delay_ms")]
    pub reattach_delay_ms: u64,

    /// Extra ignore patterns for the watcher
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_ignore: Vec<String>,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            debounce_ms: default_debounce_ms(),
            reload_delay_ms: default_reload_delay_ms(),
            reattach_delay_ms: default_reattach_delay_ms(),
            watch_ignore: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Resolve every configured directory against `root`.
    ///
    /// Absolute paths are kept as they are.
    pub fn resolve_paths(&mut self, root: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        resolve(&mut self.paths.template_dir);
        resolve(&mut self.paths.output_dir);
        resolve(&mut self.paths.assets_dir);
    }

    /// Build the immutable page descriptors, in configuration order.
    pub fn descriptors(&self) -> Vec<PageDescriptor> {
        self.pages.iter().map(PageDescriptor::from_config).collect()
    }

    /// Generate example siteweave.config.json content.
    pub fn example_config() -> String {
        let mut defaults = BTreeMap::new();
        defaults.insert("products".to_string(), serde_json::json!([]));

        let example = Self {
            pages: vec![
                PageConfig {
                    template: "index.html".to_string(),
                    output: "index.html".to_string(),
                    api: Some("/api/home".to_string()),
                    method: HttpMethod::Get,
                    params: serde_json::Map::new(),
                    transform: None,
                },
                PageConfig {
                    template: "product.html".to_string(),
                    output: "product.html".to_string(),
                    api: Some("/api/products".to_string()),
                    method: HttpMethod::Get,
                    params: serde_json::Map::new(),
                    transform: Some(TransformSpec::Defaults { values: defaults }),
                },
            ],
            api: ApiConfig {
                base_url: Some("http://localhost:3001".to_string()),
                ..ApiConfig::default()
            },
            paths: PathsConfig::default(),
            dev: DevSettings::default(),
        };

        serde_json::to_string_pretty(&example).unwrap_or_else(|_| "{}".to_string())
    }
}
