use tracing::debug;
use crate::context::Context;
use crate::error::TemplateError;
use crate::store::TemplateStore;
use crate::template::{Rendered, RenderOptions, Template};


/// Renders named templates from a store.
///
/// Template source is loaded and parsed on every call, so edits to the
/// store are picked up by the next render.
///
/// ```
/// use framelet::{Context, Engine, TemplateMap};
///
/// let store = TemplateMap::new()
///     .with("status.html", "{% if t > 30 %}Hot{% else %}Cold{% endif %}");
/// let engine = Engine::new(store);
/// let context = Context::new().with("t", 35);
/// assert_eq!(engine.render("status.html", &context).unwrap(), "Hot");
/// ```
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    options: RenderOptions,
}

impl<S: TemplateStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Engine::with_options(store, RenderOptions::default())
    }

    pub fn with_options(store: S, options: RenderOptions) -> Self {
        Engine { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        self.render_report(name, context).map(|rendered| rendered.text)
    }

    pub fn render_report(&self, name: &str, context: &Context) -> Result<Rendered, TemplateError> {
        let source = self.store.load(name)?;
        let template = Template::from(&source)?;
        let rendered = template.render_with(context, &self.options);
        if !rendered.failures.is_empty() {
            debug!(template = name, failures = rendered.failures.len(), "rendered with failures");
        }
        Ok(rendered)
    }
}
