//! Template rendering.
//!
//! Templates are rendered with minijinja. Pages use the inclusion directive
//! `{{include "name"}}`, which resolves `name.html` against a [`TemplateRoot`]
//! handed to every render call; there is no process-wide root to swap.
//!
//! Every `{{ value }}` is HTML-escaped, in the page and in included parts
//! alike; use the `safe` filter to emit trusted markup.
//!
//! The engine keeps a source cache shared by all renders. Call
//! [`TemplateEngine::invalidate`] before a rebuild so edited templates are
//! read again.

use crate::error::PageError;
use minijinja::{AutoEscape, Environment, ErrorKind};
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Extension appended to sub-template names.
pub const TEMPLATE_EXT: &str = "html";

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*include\s+['"]([^'"]+)['"]\s*\}\}"#).expect("valid include regex")
});

/// Names of all sub-templates included by `source`, in order of appearance.
///
/// Duplicates are kept once, at their first position.
pub fn parse_includes(source: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in INCLUDE_RE.captures_iter(source) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// File name for a sub-template identifier (`header` -> `header.html`).
pub fn sub_template_file(name: &str) -> String {
    if name.ends_with(&format!(".{}", TEMPLATE_EXT)) {
        name.to_string()
    } else {
        format!("{}.{}", name, TEMPLATE_EXT)
    }
}

/// Rewrite `{{include "x"}}` into minijinja's `{% include "x.html" %}`.
fn to_engine_syntax(source: &str) -> String {
    INCLUDE_RE
        .replace_all(source, |caps: &regex::Captures<'_>| {
            format!("{{% include \"{}\" %}}", sub_template_file(&caps[1]))
        })
        .into_owned()
}

/// Directory that include directives resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRoot {
    dir: PathBuf,
    cacheable: bool,
}

impl TemplateRoot {
    /// The long-lived template source directory; its files are cached.
    pub fn source(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cacheable: true,
        }
    }

    /// A short-lived directory (a staging root); never cached.
    pub fn ephemeral(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cacheable: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

type SourceCache = Arc<RwLock<HashMap<PathBuf, Arc<str>>>>;

/// Template engine with a shared source cache.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    cache: SourceCache,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached template source.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        if !cache.is_empty() {
            tracing::debug!(entries = cache.len(), "template cache invalidated");
        }
        cache.clear();
    }

    /// Number of cached template sources.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Render `source` against `data`, resolving includes under `root`.
    pub fn render<S: Serialize>(
        &self,
        root: &TemplateRoot,
        source: &str,
        data: &S,
    ) -> Result<String, PageError> {
        let mut env = Environment::new();
        let loader_root = root.clone();
        let cache = Arc::clone(&self.cache);

        env.set_loader(move |name| load_template(&loader_root, &cache, name));
        // Pages and included parts are all HTML, whatever their name
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        env.render_str(&to_engine_syntax(source), data)
            .map_err(|e| PageError::Render(render_error_message(&e)))
    }
}

/// Whether a template name stays below the directory it is resolved against.
pub fn stays_inside_root(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn load_template(
    root: &TemplateRoot,
    cache: &SourceCache,
    name: &str,
) -> Result<Option<String>, minijinja::Error> {
    let relative = Path::new(name);
    if !stays_inside_root(name) {
        return Err(minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("include '{}' leaves the template root", name),
        ));
    }

    let path = root.dir.join(relative);
    if root.cacheable {
        if let Some(hit) = cache.read().get(&path) {
            return Ok(Some(hit.to_string()));
        }
    }

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to read {}: {}", path.display(), e),
            ))
        }
    };

    let source = to_engine_syntax(&raw);
    if root.cacheable {
        cache.write().insert(path, Arc::from(source.as_str()));
    }
    Ok(Some(source))
}

fn render_error_message(err: &minijinja::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
