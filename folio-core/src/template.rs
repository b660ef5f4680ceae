use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

/// Theme directory holding partial overrides.
pub const PARTIALS_DIR: &str = "partials";

pub const PROJECT_CARD: &str = "partials/project_card.html";
pub const SKILLS_CATEGORY: &str = "partials/skills_category.html";
pub const CONTACT_ITEM: &str = "partials/contact_item.html";

/// Page used when the theme does not ship its own `index.html`.
pub const DEFAULT_PAGE: &str = include_str!("templates/index.html");

const BUILTIN_PARTIALS: [(&str, &str); 3] = [
    (PROJECT_CARD, include_str!("templates/project_card.html")),
    (SKILLS_CATEGORY, include_str!("templates/skills_category.html")),
    (CONTACT_ITEM, include_str!("templates/contact_item.html")),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders the repeated-markup partials.
///
/// Partials are `.html` templates, so Tera's autoescaping applies to every
/// interpolated field.
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Renderer with only the built-in partials.
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_PARTIALS)?;
        Ok(Self { tera })
    }

    /// Renderer whose partials may be overridden by files in
    /// `<theme>/partials/`.
    pub fn with_theme(theme_dir: &std::path::Path) -> Result<Self, TemplateError> {
        let mut renderer = Self::new()?;
        for (name, _) in BUILTIN_PARTIALS {
            let path = theme_dir.join(name);
            if path.is_file() {
                let source = std::fs::read_to_string(&path)?;
                renderer.tera.add_raw_template(name, &source)?;
                tracing::debug!("Using theme partial {}", path.display());
            }
        }
        Ok(renderer)
    }

    /// Render a partial with a single value bound to `key`.
    pub fn render<T: Serialize>(
        &self,
        template: &str,
        key: &str,
        value: &T,
    ) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert(key, value);
        self.render_with_context(template, &context)
    }

    pub fn render_with_context(
        &self,
        template: &str,
        context: &Context,
    ) -> Result<String, TemplateError> {
        Ok(self.tera.render(template, context)?)
    }
}
