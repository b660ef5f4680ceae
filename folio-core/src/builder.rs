use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assets::{AssetError, ThemeAssets};
use crate::behavior::SectionOffsets;
use crate::client::{self, CLIENT_SCRIPT};
use crate::config::{Config, LiveReload, PageConfig};
use crate::dom::Document;
use crate::loader::{self, FileSource};
use crate::page::PageController;
use crate::renderer::Renderer;
use crate::site::Site;
use crate::template::{DEFAULT_PAGE, TemplateError, TemplateRenderer};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source directory not specified")]
    MissingSourceDir,
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Asset error: {0}")]
    Assets(#[from] AssetError),
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Client that reloads the page when the preview server says so.
pub fn livereload_script(reload: &LiveReload) -> String {
    format!(
        r#"<script>
(function() {{
    const socket = new WebSocket('ws://{}:{}/__livereload');
    socket.onmessage = function(event) {{
        if (event.data === 'reload') {{
            location.reload();
        }}
    }};
    socket.onclose = function() {{
        console.log('Live reload disconnected');
    }};
}})();
</script>"#,
        reload.host, reload.port
    )
}

pub struct PageBuilder {
    source_dir: Option<PathBuf>,
    output_dir: PathBuf,
    theme_dir: PathBuf,
    config: PageConfig,
    year: Option<i32>,
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBuilder {
    pub fn new() -> Self {
        Self {
            source_dir: None,
            output_dir: PathBuf::from("./out"),
            theme_dir: PathBuf::from("./theme"),
            config: PageConfig::default(),
            year: None,
        }
    }

    // Required configuration
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    // Optional paths
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn theme_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.theme_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn page_config(mut self, config: PageConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin the footer year instead of reading the clock.
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Parse the page template and set up the renderer. Falls back to the
    /// built-in page when the theme has no template.
    pub fn build(self) -> Result<Page, BuildError> {
        let source_dir = self.source_dir.ok_or(BuildError::MissingSourceDir)?;

        let template_path = self.theme_dir.join(&self.config.template);
        let markup = if template_path.is_file() {
            std::fs::read_to_string(&template_path).map_err(io_error(&template_path))?
        } else {
            tracing::debug!(
                "No template at {}, using the built-in page",
                template_path.display()
            );
            DEFAULT_PAGE.to_string()
        };

        let templates = if self.theme_dir.is_dir() {
            TemplateRenderer::with_theme(&self.theme_dir)?
        } else {
            TemplateRenderer::new()?
        };

        let mut document = Document::parse(&markup);
        client::attach(&mut document);
        if let Some(reload) = &self.config.live_reload
            && let Some(body) = document.body()
        {
            document.append_html(body, &livereload_script(reload));
        }

        Ok(Page {
            document,
            renderer: Renderer::new(templates),
            source: FileSource::new(source_dir.join(&self.config.content)),
            output_dir: self.output_dir,
            theme_dir: self.theme_dir,
            template: PathBuf::from(&self.config.template),
            year: self.year.unwrap_or_else(loader::current_year),
            site: None,
        })
    }
}

/// The resume page, ready to load content and be written out.
pub struct Page {
    document: Document,
    renderer: Renderer,
    source: FileSource,
    output_dir: PathBuf,
    theme_dir: PathBuf,
    template: PathBuf,
    year: i32,
    site: Option<Site>,
}

impl Page {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }

    /// Run the page's ready handling and load the content document. A
    /// failed load leaves the template's own text in place.
    pub async fn load(&mut self) -> Option<&Site> {
        // Nothing is laid out at build time, so the scroll-spy marks no link
        let (_, site) = PageController::start(
            &mut self.document,
            SectionOffsets::new(),
            &self.source,
            &self.renderer,
            self.year,
        )
        .await;
        self.site = site;
        self.site.as_ref()
    }

    /// Write `index.html`, the browser client and the theme assets into the
    /// output directory. A theme file named like the client replaces it.
    /// Returns the page path.
    pub fn write(&self) -> Result<PathBuf, BuildError> {
        std::fs::create_dir_all(&self.output_dir).map_err(io_error(&self.output_dir))?;

        let index = self.output_dir.join("index.html");
        let file = std::fs::File::create(&index).map_err(io_error(&index))?;
        let mut out = std::io::BufWriter::new(file);
        self.document
            .write_to(&mut out)
            .and_then(|()| out.flush())
            .map_err(io_error(&index))?;

        let script = self.output_dir.join(CLIENT_SCRIPT);
        std::fs::write(&script, client::client_script()?).map_err(io_error(&script))?;

        ThemeAssets::new(&self.theme_dir, &self.template).copy_to(&self.output_dir)?;
        Ok(index)
    }
}

/// Build the page from `source` with `theme` into `output`.
pub async fn build_site(
    config: &Config,
    source: &Path,
    output: &Path,
    theme: &Path,
) -> Result<Page, BuildError> {
    let mut page = PageBuilder::new()
        .source_dir(source)
        .output_dir(output)
        .theme_dir(theme)
        .page_config(config.page.clone())
        .build()?;

    page.load().await;
    let index = page.write()?;
    tracing::info!("Wrote {}", index.display());

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_dir() {
        assert!(matches!(
            PageBuilder::new().build(),
            Err(BuildError::MissingSourceDir)
        ));
    }

    #[test]
    fn test_builtin_page_without_theme() {
        let dir = tempfile::tempdir().unwrap();
        let page = PageBuilder::new()
            .source_dir(dir.path())
            .theme_dir(dir.path().join("theme"))
            .build()
            .unwrap();
        assert!(page.document().get_element_by_id("projects-grid").is_some());
        assert!(page.site().is_none());
    }

    #[test]
    fn test_theme_template_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let theme = dir.path().join("theme");
        std::fs::create_dir_all(&theme).unwrap();
        std::fs::write(
            theme.join("resume.html"),
            "<html><body><h1 id=\"hero-name\">Me</h1></body></html>",
        )
        .unwrap();

        let config = PageConfig {
            template: "resume.html".into(),
            ..PageConfig::default()
        };
        let page = PageBuilder::new()
            .source_dir(dir.path())
            .theme_dir(&theme)
            .page_config(config)
            .build()
            .unwrap();
        assert!(page.document().get_element_by_id("projects-grid").is_none());
        assert!(page.document().get_element_by_id("hero-name").is_some());
    }

    #[test]
    fn test_dev_mode_appends_reload_client() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.dev("127.0.0.1", 3000);

        let page = PageBuilder::new()
            .source_dir(dir.path())
            .theme_dir(dir.path())
            .page_config(config.page)
            .build()
            .unwrap();

        let html = page.document().to_html();
        assert!(html.contains("ws://127.0.0.1:3000/__livereload"));
        assert!(html.contains(r#"<script src="folio.js"></script>"#));
        let script = html.find("__livereload").unwrap();
        assert!(script < html.rfind("</body>").unwrap());
    }
}
