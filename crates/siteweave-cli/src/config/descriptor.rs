use crate::config::{HttpMethod, PageConfig, TransformSpec};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A pure data transform: `data -> data`.
///
/// Config files use [`TransformSpec`]; library callers can supply a closure
/// through [`PageDescriptor::with_transform_fn`].
pub trait DataTransform: Send + Sync {
    fn apply(&self, data: Value) -> Result<Value, String>;
}

impl DataTransform for TransformSpec {
    fn apply(&self, data: Value) -> Result<Value, String> {
        TransformSpec::apply(self, data)
    }
}

struct FnTransform<F>(F);

impl<F> DataTransform for FnTransform<F>
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync,
{
    fn apply(&self, data: Value) -> Result<Value, String> {
        (self.0)(data)
    }
}

/// Immutable description of one page, built once from configuration.
#[derive(Clone)]
pub struct PageDescriptor {
    /// Template file name, relative to the template directory
    pub template: String,
    /// Output file name, relative to the output directory
    pub output: String,
    /// API endpoint; `None` renders the template against `{}`
    pub endpoint: Option<String>,
    pub method: HttpMethod,
    pub params: serde_json::Map<String, Value>,
    pub transform: Option<Arc<dyn DataTransform>>,
}

impl PageDescriptor {
    /// A page with no data source.
    pub fn new(template: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            output: output.into(),
            endpoint: None,
            method: HttpMethod::Get,
            params: serde_json::Map::new(),
            transform: None,
        }
    }

    pub fn from_config(page: &PageConfig) -> Self {
        Self {
            template: page.template.clone(),
            output: page.output.clone(),
            endpoint: page.api.clone(),
            method: page.method,
            params: page.params.clone(),
            transform: page
                .transform
                .clone()
                .map(|spec| Arc::new(spec) as Arc<dyn DataTransform>),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>, method: HttpMethod) -> Self {
        self.endpoint = Some(endpoint.into());
        self.method = method;
        self
    }

    pub fn with_transform_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(FnTransform(f)));
        self
    }
}

impl fmt::Debug for PageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageDescriptor")
            .field("template", &self.template)
            .field("output", &self.output)
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
