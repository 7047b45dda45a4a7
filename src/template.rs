/// Template rendering: a thin wrapper over tera, parsed once per handler.
use std::error::Error as _;

use tera::{Context, Tera};

use crate::error::Error;

/// A named set of pre-parsed templates belonging to one handler.
///
/// Templates are compiled at handler construction and rendered with a fresh
/// context per call; the set holds no per-request state, so handlers can be
/// shared across concurrent requests.
pub struct TemplateSet {
    /// Handler name, used for compile diagnostics.
    handler: String,
    /// The compiled template collection.
    tera: Tera,
}

impl TemplateSet {
    /// Create an empty set for the named handler.
    pub fn new(handler: &str) -> Self {
        Self {
            handler: handler.to_string(),
            tera: Tera::default(),
        }
    }

    /// Parse and register one template under `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CatalogInvalid` when the template fails to parse.
    pub fn add(&mut self, name: &str, source: &str) -> Result<(), Error> {
        self.tera
            .add_raw_template(name, source)
            .map_err(|e| Error::CatalogInvalid {
                handler: self.handler.clone(),
                reason: format!("template `{name}`: {}", flatten(&e)),
            })
    }

    /// Whether a template was registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a registered template against `context`.
    ///
    /// Contexts are built with the full variable vocabulary populated (absent
    /// values as empty strings), so a render failure means a malformed
    /// template, not missing data.
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` when tera reports a render failure.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, Error> {
        self.tera.render(name, context).map_err(|e| Error::Template {
            reason: flatten(&e),
            template: name.to_string(),
        })
    }

    /// Render a selection field template to a non-negative integer.
    ///
    /// Degrades to `None` on any failure: unregistered template, render
    /// error, empty output, or a value that does not parse as an integer.
    /// Fields degrade independently; a bad end column never costs the
    /// start line.
    pub fn render_field(&self, name: &str, context: &Context) -> Option<u32> {
        if !self.contains(name) {
            return None;
        }
        let rendered = self.tera.render(name, context).ok()?;
        rendered.trim().parse::<u32>().ok()
    }
}

/// Collapse a tera error chain into one line.
fn flatten(error: &tera::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
