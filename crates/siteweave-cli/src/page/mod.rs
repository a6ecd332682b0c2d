//! Page building.
//!
//! Turns one [`PageDescriptor`] into one HTML file:
//!
//! 1. read the page template
//! 2. fetch and transform its data
//! 3. extract `<style>`/`<script>` blocks from included sub-templates
//! 4. render, through a staging root when sub-templates were cleaned
//! 5. inject links to the extracted assets
//! 6. write the output file
//!
//! Failures never escape [`PageBuilder::build`]; they come back as a failed
//! [`BuildResult`] so the other pages still build.

pub mod extract;
pub mod staging;

pub use extract::{inject_assets, process_sub_template, SubTemplateAsset};
pub use staging::StagingRoot;

use crate::config::PageDescriptor;
use crate::error::PageError;
use crate::fetch::Fetcher;
use crate::render::{parse_includes, TemplateEngine, TemplateRoot};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Outcome of building one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub template: String,
    pub output: String,
    pub success: bool,
    /// Present iff `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildResult {
    pub fn ok(page: &PageDescriptor) -> Self {
        Self {
            template: page.template.clone(),
            output: page.output.clone(),
            success: true,
            error: None,
        }
    }

    pub fn failed(page: &PageDescriptor, error: impl Into<String>) -> Self {
        Self {
            template: page.template.clone(),
            output: page.output.clone(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Builds single pages against one template tree and output directory.
#[derive(Debug, Clone)]
pub struct PageBuilder {
    template_dir: PathBuf,
    output_dir: PathBuf,
    staging_parent: PathBuf,
    fetcher: Fetcher,
    engine: TemplateEngine,
}

impl PageBuilder {
    pub fn new(
        template_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        fetcher: Fetcher,
        engine: TemplateEngine,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            output_dir: output_dir.into(),
            staging_parent: std::env::temp_dir(),
            fetcher,
            engine,
        }
    }

    /// Create staging roots under `parent` instead of the system temp dir.
    pub fn with_staging_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.staging_parent = parent.into();
        self
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build one page. Never fails; errors are captured in the result.
    pub async fn build(&self, page: &PageDescriptor) -> BuildResult {
        match self.try_build(page).await {
            Ok(path) => {
                tracing::debug!(template = %page.template, output = %path.display(), "page built");
                BuildResult::ok(page)
            }
            Err(e) => {
                tracing::warn!(template = %page.template, error = %e, "page failed");
                BuildResult::failed(page, e.to_string())
            }
        }
    }

    async fn try_build(&self, page: &PageDescriptor) -> Result<PathBuf, PageError> {
        let template_path = self.template_dir.join(&page.template);
        let source = match tokio::fs::read_to_string(&template_path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PageError::TemplateNotFound(template_path));
            }
            Err(e) => return Err(PageError::io(template_path, e)),
        };

        let data = self.load_data(page).await?;

        let mut assets = Vec::new();
        for name in parse_includes(&source) {
            assets.push(process_sub_template(&name, &self.template_dir, &self.output_dir).await?);
        }

        let rendered = if assets.iter().any(SubTemplateAsset::needs_staging) {
            let staging =
                StagingRoot::assemble(&self.staging_parent, &self.template_dir, &assets).await?;
            let rendered = self.engine.render(&staging.root(), &source, &data);
            let closed = staging.close();
            let html = rendered?;
            closed?;
            html
        } else {
            self.engine
                .render(&TemplateRoot::source(&self.template_dir), &source, &data)?
        };

        let html = inject_assets(&rendered, &assets, &page.output);

        let output_path = self.output_dir.join(&page.output);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PageError::io(parent, e))?;
        }
        tokio::fs::write(&output_path, html)
            .await
            .map_err(|e| PageError::io(&output_path, e))?;

        Ok(output_path)
    }

    async fn load_data(&self, page: &PageDescriptor) -> Result<Value, PageError> {
        let Some(ref endpoint) = page.endpoint else {
            return Ok(Value::Object(serde_json::Map::new()));
        };

        let data = self
            .fetcher
            .fetch(endpoint, page.method, &page.params)
            .await?;

        match page.transform {
            Some(ref transform) => transform
                .apply(data)
                .map_err(|e| PageError::Data(format!("transform failed: {}", e))),
            None => Ok(data),
        }
    }
}
