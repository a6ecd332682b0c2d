use crate::config::{HttpMethod, SiteConfig};
use crate::error::{ConfigError, Result};
use std::collections::HashSet;
use std::path::{Component, Path};

/// Check that a page output path stays inside the output directory.
pub fn validate_output_path(output: &str) -> Result<()> {
    let path = Path::new(output);

    if output.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "pages[].output".to_string(),
            value: output.to_string(),
            hint: "Output path cannot be empty".to_string(),
        }
        .into());
    }

    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConfigError::InvalidValue {
            field: "pages[].output".to_string(),
            value: output.to_string(),
            hint: "Output paths must be relative and stay inside the output directory"
                .to_string(),
        }
        .into());
    }

    Ok(())
}

impl SiteConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.pages.is_empty() {
            return Err(ConfigError::MissingField {
                field: "pages".to_string(),
                hint: "Declare at least one page with a 'template' and an 'output'".to_string(),
            }
            .into());
        }

        let mut outputs = HashSet::new();
        for page in &self.pages {
            if page.template.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "pages[].template".to_string(),
                    hint: format!("Page '{}' has no template", page.output),
                }
                .into());
            }

            validate_output_path(&page.output)?;

            if !outputs.insert(page.output.as_str()) {
                return Err(ConfigError::DuplicateOutput(page.output.clone()).into());
            }

            if page.api.is_some() && self.api.base_url.is_none() {
                return Err(ConfigError::MissingField {
                    field: "api.baseUrl".to_string(),
                    hint: format!(
                        "Page '{}' fetches data, so 'api.baseUrl' must be set",
                        page.template
                    ),
                }
                .into());
            }

            if page.method == HttpMethod::Post && page.api.is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "pages[].method".to_string(),
                    value: page.method.to_string(),
                    hint: format!("Page '{}' sets a method but no 'api'", page.template),
                }
                .into());
            }
        }

        if self.api.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeoutMs".to_string(),
                value: "0".to_string(),
                hint: "Timeout must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Check that the source directories exist on disk.
    pub fn validate_paths(&self) -> Result<()> {
        if !self.paths.template_dir.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "paths.templateDir".to_string(),
                value: self.paths.template_dir.display().to_string(),
                hint: "Template directory does not exist".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
