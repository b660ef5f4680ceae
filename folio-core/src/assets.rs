use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::template::PARTIALS_DIR;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Static files a theme ships next to its page template: stylesheets,
/// scripts, images.
pub struct ThemeAssets {
    theme_dir: PathBuf,
    template: PathBuf,
}

impl ThemeAssets {
    pub fn new<P: AsRef<Path>, T: AsRef<Path>>(theme_dir: P, template: T) -> Self {
        Self {
            theme_dir: theme_dir.as_ref().to_path_buf(),
            template: template.as_ref().to_path_buf(),
        }
    }

    /// Relative paths of every asset. The page template and partials are
    /// left out; they are rendered, not copied.
    pub fn scan(&self) -> Result<Vec<PathBuf>, AssetError> {
        if !self.theme_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(&self.theme_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.theme_dir)
                .map_err(|_| AssetError::InvalidPath(entry.path().to_path_buf()))?;
            if relative == self.template || relative.starts_with(PARTIALS_DIR) {
                continue;
            }
            assets.push(relative.to_path_buf());
        }

        Ok(assets)
    }

    /// Copy every asset into `output_dir`, keeping the theme's layout.
    /// Returns how many files were copied.
    pub fn copy_to<P: AsRef<Path>>(&self, output_dir: P) -> Result<usize, AssetError> {
        let assets = self.scan()?;
        for relative in &assets {
            let target = output_dir.as_ref().join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(self.theme_dir.join(relative), &target)?;
        }
        tracing::debug!(
            "Copied {} theme assets from {}",
            assets.len(),
            self.theme_dir.display()
        );
        Ok(assets.len())
    }
}
