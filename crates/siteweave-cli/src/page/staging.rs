//! Staging roots for cleaned sub-templates.
//!
//! When a page's sub-templates had blocks extracted, the page is rendered
//! against a temporary copy of the template tree in which those
//! sub-templates are replaced by their cleaned markup. Source files are never
//! touched.
//!
//! The directory is owned by a [`tempfile::TempDir`], so it is removed on
//! every exit path: explicitly through [`StagingRoot::close`], or by `Drop`
//! on early returns and panics.

use crate::error::PageError;
use crate::page::SubTemplateAsset;
use crate::render::{sub_template_file, TemplateRoot};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Name prefix of staging directories; the watcher ignores dot-prefixed paths.
pub const STAGING_PREFIX: &str = ".siteweave-staging-";

/// A temporary template root, deleted when dropped.
#[derive(Debug)]
pub struct StagingRoot {
    dir: TempDir,
}

impl StagingRoot {
    /// Copy `template_dir` into a fresh directory under `parent`, then
    /// overwrite every extracted sub-template with its cleaned markup.
    pub async fn assemble(
        parent: &Path,
        template_dir: &Path,
        assets: &[SubTemplateAsset],
    ) -> Result<Self, PageError> {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PageError::Staging(format!("{}: {}", parent.display(), e)))?;

        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| PageError::Staging(format!("{}: {}", parent.display(), e)))?;
        let staging = Self { dir };

        staging.copy_tree(template_dir).await?;

        for asset in assets {
            let Some(cleaned) = asset.cleaned_content.as_deref() else {
                continue;
            };
            let target = staging.path().join(sub_template_file(&asset.name));
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| staging_io(parent, e))?;
            }
            tokio::fs::write(&target, cleaned)
                .await
                .map_err(|e| staging_io(&target, e))?;
        }

        tracing::debug!(path = %staging.path().display(), "staging root assembled");
        Ok(staging)
    }

    async fn copy_tree(&self, template_dir: &Path) -> Result<(), PageError> {
        for entry in WalkDir::new(template_dir).follow_links(true) {
            let entry = entry.map_err(|e| PageError::Staging(e.to_string()))?;
            let Ok(relative) = entry.path().strip_prefix(template_dir) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let target = self.path().join(relative);
            if entry.file_type().is_dir() {
                tokio::fs::create_dir_all(&target)
                    .await
                    .map_err(|e| staging_io(&target, e))?;
            } else {
                tokio::fs::copy(entry.path(), &target)
                    .await
                    .map_err(|e| staging_io(&target, e))?;
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Template root pointing into this staging directory.
    pub fn root(&self) -> TemplateRoot {
        TemplateRoot::ephemeral(self.path())
    }

    /// Remove the directory, reporting failures instead of swallowing them.
    pub fn close(self) -> Result<PathBuf, PageError> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| PageError::Staging(format!("failed to remove {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "staging root removed");
        Ok(path)
    }
}

fn staging_io(path: &Path, err: std::io::Error) -> PageError {
    PageError::Staging(format!("{}: {}", path.display(), err))
}
