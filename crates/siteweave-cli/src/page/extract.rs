//! Sub-template asset extraction.
//!
//! Inline `<style>` and `<script>` blocks are lifted out of included
//! sub-templates into `assets/components/<name>/<name>.{css,js}`, and the
//! rendered page gets `<link>` / `<script src>` references instead.

use crate::error::PageError;
use crate::render::{stays_inside_root, sub_template_file};
use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style>").expect("valid style regex"));

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script([^>]*)>(.*?)</script>").expect("valid script regex")
});

static SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)src\s*=").expect("valid src regex"));

/// Output directory for extracted component assets, relative to the output root.
pub const COMPONENTS_DIR: &str = "assets/components";

/// What extraction produced for one included sub-template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubTemplateAsset {
    /// Sub-template identifier as written in the include directive
    pub name: String,
    /// Output-relative path of the extracted stylesheet
    pub css_path: Option<String>,
    /// Output-relative path of the extracted script
    pub js_path: Option<String>,
    /// Markup with the extracted blocks removed; `None` when nothing was extracted
    pub cleaned_content: Option<String>,
}

impl SubTemplateAsset {
    pub fn needs_staging(&self) -> bool {
        self.cleaned_content.is_some()
    }
}

/// Blocks pulled out of one piece of markup.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub cleaned: String,
}

/// Collect every `<style>` body and remove the blocks from the markup.
pub fn extract_styles(html: &str) -> (Vec<String>, String) {
    let styles = STYLE_RE
        .captures_iter(html)
        .map(|caps| caps[1].trim().to_string())
        .collect();
    let cleaned = STYLE_RE.replace_all(html, "").into_owned();
    (styles, cleaned)
}

/// Collect inline `<script>` bodies and remove those blocks.
///
/// Script tags carrying a `src` attribute are left in place untouched.
pub fn extract_scripts(html: &str) -> (Vec<String>, String) {
    let mut scripts = Vec::new();
    let cleaned = SCRIPT_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            if SRC_ATTR_RE.is_match(&caps[1]) {
                caps[0].to_string()
            } else {
                scripts.push(caps[2].trim().to_string());
                String::new()
            }
        })
        .into_owned();
    (scripts, cleaned)
}

/// Run style then script extraction over `html`.
pub fn extract_blocks(html: &str) -> Extracted {
    let (styles, without_styles) = extract_styles(html);
    let (scripts, cleaned) = extract_scripts(&without_styles);
    Extracted {
        styles,
        scripts,
        cleaned,
    }
}

/// Extract one sub-template's blocks and write them under `output_dir`.
///
/// A missing sub-template yields an empty asset; the render step reports the
/// missing include.
pub async fn process_sub_template(
    name: &str,
    template_dir: &Path,
    output_dir: &Path,
) -> Result<SubTemplateAsset, PageError> {
    let file_name = sub_template_file(name);
    if !stays_inside_root(&file_name) {
        return Err(PageError::Render(format!(
            "include '{}' leaves the template root",
            name
        )));
    }

    let mut asset = SubTemplateAsset {
        name: name.to_string(),
        ..Default::default()
    };

    let path = template_dir.join(file_name);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(asset),
        Err(e) => return Err(PageError::io(path, e)),
    };

    let extracted = extract_blocks(&content);
    if extracted.styles.is_empty() && extracted.scripts.is_empty() {
        return Ok(asset);
    }

    let relative_dir = format!("{}/{}", COMPONENTS_DIR, name);
    let component_dir = output_dir.join(&relative_dir);
    tokio::fs::create_dir_all(&component_dir)
        .await
        .map_err(|e| PageError::io(&component_dir, e))?;

    let base = file_stem(name);

    if !extracted.styles.is_empty() {
        let file = component_dir.join(format!("{}.css", base));
        tokio::fs::write(&file, extracted.styles.join("\n\n"))
            .await
            .map_err(|e| PageError::io(&file, e))?;
        asset.css_path = Some(format!("{}/{}.css", relative_dir, base));
    }

    if !extracted.scripts.is_empty() {
        let file = component_dir.join(format!("{}.js", base));
        tokio::fs::write(&file, extracted.scripts.join("\n\n"))
            .await
            .map_err(|e| PageError::io(&file, e))?;
        asset.js_path = Some(format!("{}/{}.js", relative_dir, base));
    }

    tracing::debug!(
        sub_template = name,
        styles = extracted.styles.len(),
        scripts = extracted.scripts.len(),
        "extracted component assets"
    );

    asset.cleaned_content = Some(extracted.cleaned);
    Ok(asset)
}

/// Last path segment of a sub-template name (`parts/card` -> `card`).
fn file_stem(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// `../` once per directory level of `output`, so output-relative asset
/// paths resolve from the page's own location.
pub fn relative_prefix(output: &str) -> String {
    let depth = Path::new(output)
        .parent()
        .map(|dir| {
            dir.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    "../".repeat(depth)
}

/// Insert stylesheet links before `</head>` and scripts before `</body>`.
///
/// `output` is the page's output-relative path; references are written
/// relative to it. Links keep discovery order. A page without the closing
/// marker is left unchanged for that kind of asset.
pub fn inject_assets(html: &str, assets: &[SubTemplateAsset], output: &str) -> String {
    let prefix = relative_prefix(output);
    let css: Vec<String> = assets
        .iter()
        .filter_map(|a| a.css_path.as_deref())
        .map(|href| format!("  <link rel=\"stylesheet\" href=\"{}{}\">", prefix, href))
        .collect();
    let js: Vec<String> = assets
        .iter()
        .filter_map(|a| a.js_path.as_deref())
        .map(|src| format!("  <script src=\"{}{}\"></script>", prefix, src))
        .collect();

    let mut result = html.to_string();
    if !css.is_empty() {
        result = insert_before(&result, "</head>", &css.join("\n"));
    }
    if !js.is_empty() {
        result = insert_before(&result, "</body>", &js.join("\n"));
    }
    result
}

fn insert_before(html: &str, marker: &str, block: &str) -> String {
    match html.find(marker) {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + block.len() + 1);
            out.push_str(&html[..pos]);
            out.push_str(block);
            out.push('\n');
            out.push_str(&html[pos..]);
            out
        }
        None => {
            tracing::debug!(marker, "closing marker not found, assets not injected");
            html.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_styles() {
        let html = "<div>a</div><style>\n.a { color: red; }\n</style><STYLE media=\"x\">.b{}</STYLE>";
        let (styles, cleaned) = extract_styles(html);
        assert_eq!(styles, vec![".a { color: red; }", ".b{}"]);
        assert_eq!(cleaned, "<div>a</div>");
    }

    #[test]
    fn test_extract_scripts_skips_external() {
        let html = r#"<script src="/lib.js"></script><script>init();</script><script type="module" data-src="x">run();</script>"#;
        let (scripts, cleaned) = extract_scripts(html);
        assert_eq!(scripts, vec!["init();", "run();"]);
        assert_eq!(cleaned, r#"<script src="/lib.js"></script>"#);

        let (scripts, cleaned) = extract_scripts(r#"<SCRIPT SRC = "a.js"></SCRIPT>"#);
        assert!(scripts.is_empty());
        assert_eq!(cleaned, r#"<SCRIPT SRC = "a.js"></SCRIPT>"#);
    }

    #[test]
    fn test_extract_blocks_without_any() {
        let extracted = extract_blocks("<nav>plain</nav>");
        assert!(extracted.styles.is_empty());
        assert!(extracted.scripts.is_empty());
        assert_eq!(extracted.cleaned, "<nav>plain</nav>");
    }

    #[test]
    fn test_inject_css_in_head_and_js_before_body_end() {
        let html = "<html><head><title>t</title></head><body><p>x</p></body></html>";
        let assets = vec![
            SubTemplateAsset {
                name: "a".to_string(),
                css_path: Some("assets/components/a/a.css".to_string()),
                ..Default::default()
            },
            SubTemplateAsset {
                name: "b".to_string(),
                js_path: Some("assets/components/b/b.js".to_string()),
                ..Default::default()
            },
        ];

        let out = inject_assets(html, &assets, "index.html");
        let link = out
            .find(r#"<link rel="stylesheet" href="assets/components/a/a.css">"#)
            .unwrap();
        let script = out
            .find(r#"<script src="assets/components/b/b.js"></script>"#)
            .unwrap();
        assert!(link < out.find("</head>").unwrap());
        assert!(script > out.find("<body>").unwrap());
        assert!(script < out.find("</body>").unwrap());
    }

    #[test]
    fn test_inject_keeps_discovery_order() {
        let html = "<head></head><body></body>";
        let assets: Vec<_> = ["x", "y"]
            .iter()
            .map(|n| SubTemplateAsset {
                name: n.to_string(),
                css_path: Some(format!("{}.css", n)),
                ..Default::default()
            })
            .collect();
        let out = inject_assets(html, &assets, "index.html");
        assert!(out.find("x.css").unwrap() < out.find("y.css").unwrap());
    }

    #[test]
    fn test_inject_without_markers_is_noop() {
        let assets = vec![SubTemplateAsset {
            name: "a".to_string(),
            css_path: Some("a.css".to_string()),
            js_path: Some("a.js".to_string()),
            cleaned_content: Some(String::new()),
        }];
        assert_eq!(
            inject_assets("<p>fragment</p>", &assets, "index.html"),
            "<p>fragment</p>"
        );
    }

    #[tokio::test]
    async fn test_process_sub_template_writes_assets() {
        let templates = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(
            templates.path().join("card.html"),
            "<div class=\"card\"></div><style>.card{}</style><script>card();</script>",
        )
        .unwrap();

        let asset = process_sub_template("card", templates.path(), output.path())
            .await
            .unwrap();

        assert_eq!(
            asset.css_path.as_deref(),
            Some("assets/components/card/card.css")
        );
        assert_eq!(asset.js_path.as_deref(), Some("assets/components/card/card.js"));
        assert_eq!(
            asset.cleaned_content.as_deref(),
            Some("<div class=\"card\"></div>")
        );

        let css = fs::read_to_string(output.path().join("assets/components/card/card.css")).unwrap();
        assert_eq!(css, ".card{}");
    }

    #[tokio::test]
    async fn test_process_sub_template_missing_or_plain() {
        let templates = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(templates.path().join("plain.html"), "<p>plain</p>").unwrap();

        let missing = process_sub_template("nope", templates.path(), output.path())
            .await
            .unwrap();
        assert!(!missing.needs_staging());

        let plain = process_sub_template("plain", templates.path(), output.path())
            .await
            .unwrap();
        assert!(!plain.needs_staging());
        assert!(!output.path().join(COMPONENTS_DIR).exists());
    }

    #[test]
    fn test_relative_prefix_per_directory_level() {
        assert_eq!(relative_prefix("index.html"), "");
        assert_eq!(relative_prefix("./index.html"), "");
        assert_eq!(relative_prefix("products/index.html"), "../");
        assert_eq!(relative_prefix("a/b/page.html"), "../../");
    }

    #[test]
    fn test_inject_for_nested_page() {
        let assets = vec![SubTemplateAsset {
            name: "card".to_string(),
            css_path: Some("assets/components/card/card.css".to_string()),
            js_path: Some("assets/components/card/card.js".to_string()),
            ..Default::default()
        }];
        let out = inject_assets(
            "<head></head><body></body>",
            &assets,
            "products/index.html",
        );
        assert!(out.contains(r#"href="../assets/components/card/card.css""#));
        assert!(out.contains(r#"src="../assets/components/card/card.js""#));
    }

    #[tokio::test]
    async fn test_include_outside_template_dir_writes_nothing() {
        let root = TempDir::new().unwrap();
        let templates = root.path().join("templates");
        let output = root.path().join("dist");
        fs::create_dir_all(&templates).unwrap();
        fs::write(
            root.path().join("evil.html"),
            "<p>x</p><style>p{}</style><script>x();</script>",
        )
        .unwrap();

        let result = process_sub_template("../evil", &templates, &output).await;

        assert!(matches!(result, Err(PageError::Render(_))));
        assert!(!output.exists());
    }
}
