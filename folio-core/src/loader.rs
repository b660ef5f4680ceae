use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use thiserror::Error;

use crate::dom::Document;
use crate::renderer::{RenderError, Renderer, apply_sections};
use crate::site::Site;

pub const DEFAULT_CONTENT_PATH: &str = "content/site.json";

pub const SEO_DESCRIPTION: &str = "seo-description";
pub const NAV_NAME: &str = "nav-name";
pub const HERO_NAME: &str = "hero-name";
pub const HERO_ROLE: &str = "hero-role";
pub const HERO_BIO: &str = "hero-bio";
pub const YEAR: &str = "year";
pub const FOOTER_COPY: &str = "footer-copy";

const COPYRIGHT: &str = "© ";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed content document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Where the content document comes from.
pub trait ContentSource {
    /// Human-readable location, for log lines.
    fn describe(&self) -> String;

    fn fetch(&self) -> impl Future<Output = Result<String, LoadError>> + Send;
}

/// Content document on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ContentSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Content document held in memory.
#[derive(Debug, Clone)]
pub struct StaticSource(String);

impl StaticSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self(json.into())
    }
}

impl ContentSource for StaticSource {
    fn describe(&self) -> String {
        "inline content".to_string()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        Ok(self.0.clone())
    }
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Fetch and parse the content document.
pub async fn load_site<S: ContentSource>(source: &S) -> Result<Site, LoadError> {
    let raw = source.fetch().await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Set an element's text when both the element and the value exist.
fn set_text(doc: &mut Document, id: &str, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    match doc.get_element_by_id(id) {
        Some(el) => doc.set_text(el, value),
        None => tracing::debug!("No #{id} anchor in page, skipping"),
    }
}

pub fn set_year(doc: &mut Document, year: i32) {
    set_text(doc, YEAR, Some(&year.to_string()));
}

/// Project a loaded site onto the page.
///
/// All markup is rendered before the first mutation, so an error here leaves
/// the document exactly as it was.
pub fn apply_site(
    doc: &mut Document,
    site: &Site,
    renderer: &Renderer,
    year: i32,
) -> Result<(), RenderError> {
    let sections = renderer.render_sections(site)?;

    doc.set_title(&site.page_title());
    if let (Some(meta), Some(description)) =
        (doc.get_element_by_id(SEO_DESCRIPTION), site.seo_description())
    {
        doc.set_attr(meta, "content", description);
    }

    set_text(doc, NAV_NAME, site.name.as_deref());
    set_text(doc, HERO_NAME, site.name.as_deref());
    set_text(doc, HERO_ROLE, site.role.as_deref());
    set_text(doc, HERO_BIO, Some(site.bio.as_deref().unwrap_or_default()));
    set_year(doc, year);
    if let Some(first) = doc
        .get_element_by_id(FOOTER_COPY)
        .and_then(|copy| doc.first_child(copy))
    {
        doc.set_text(first, COPYRIGHT);
    }

    apply_sections(doc, &sections);
    Ok(())
}

/// Load content and project it onto the page.
///
/// Failures are logged and swallowed: the page keeps its template content.
/// Returns the site when it was applied.
pub async fn load_into<S: ContentSource>(
    doc: &mut Document,
    source: &S,
    renderer: &Renderer,
    year: i32,
) -> Option<Site> {
    let result = match load_site(source).await {
        Ok(site) => apply_site(doc, &site, renderer, year)
            .map(|_| site)
            .map_err(LoadError::from),
        Err(err) => Err(err),
    };

    match result {
        Ok(site) => {
            tracing::info!(
                projects = site.projects.len(),
                skill_categories = site.skills.len(),
                socials = site.socials.len(),
                "Loaded content from {}",
                source.describe()
            );
            Some(site)
        }
        Err(err) => {
            tracing::error!("Failed to load {}: {err}", source.describe());
            None
        }
    }
}
