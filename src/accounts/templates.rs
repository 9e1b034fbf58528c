//! Page rendering with tera.

use anyhow::{Context, Result};
use serde::Serialize;
use tera::Tera;
use tracing::{debug, instrument};

/// Registration page, relative to the template root.
pub const REGISTER_TEMPLATE: &str = "users/user-auth.html";

const EMBEDDED: &[(&str, &str)] = &[(
    REGISTER_TEMPLATE,
    include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/templates/users/user-auth.html"
    )),
)];

#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Templates compiled into the binary.
    ///
    /// # Errors
    /// Returns an error if an embedded template does not parse.
    pub fn embedded() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED.iter().copied())
            .context("Failed to parse embedded templates")?;

        Ok(Self { tera })
    }

    /// Load every `*.html` under `dir`, overriding the embedded pages.
    ///
    /// # Errors
    /// Returns an error if a template does not parse or the registration page is missing.
    pub fn from_dir(dir: &str) -> Result<Self> {
        let glob = format!("{}/**/*.html", dir.trim_end_matches('/'));
        let tera = Tera::new(&glob).with_context(|| format!("Failed to load templates: {glob}"))?;

        if !tera.get_template_names().any(|name| name == REGISTER_TEMPLATE) {
            return Err(anyhow::anyhow!(
                "Template {REGISTER_TEMPLATE} not found in {dir}"
            ));
        }

        debug!(
            "loaded {} templates from {}",
            tera.get_template_names().count(),
            dir
        );

        Ok(Self { tera })
    }

    /// Render `name` with `value` exposed under `key`.
    ///
    /// # Errors
    /// Returns an error if the template is unknown or rendering fails.
    #[instrument(skip(self, value))]
    pub fn render<T: Serialize>(&self, name: &str, key: &str, value: &T) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert(key, value);

        self.tera
            .render(name, &context)
            .with_context(|| format!("Failed to render template {name}"))
    }
}
