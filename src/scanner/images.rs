//! Catalogue of PNG files in a checkout and icon lookup against it

use anyhow::{Context, Result};
use image::ImageFormat;
use regex::Regex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::model::BranchRecord;

/// Directory value marking an icon to be taken from the theme
pub const THEMED_ICON_DIR: &str = "__icon__:apps";

static SIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[.-]\d\d$").unwrap());

/// Edge length of copied application icons
const ICON_SIZE: u32 = 24;

#[derive(Debug, Default, Clone)]
pub struct ImageCatalog {
    images: Vec<PathBuf>,
}

impl ImageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf) {
        self.images.push(path);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Files that may be `icon` at some size
    fn candidates(&self, icon: &str) -> Vec<&Path> {
        let (stem, file) = match icon.strip_suffix(".png") {
            Some(stem) => (stem, icon.to_string()),
            None => (icon, format!("{icon}.png")),
        };
        self.images
            .iter()
            .filter(|img| {
                let Some(base) = img.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                if base == file {
                    return true;
                }
                if let Some(mid) = base.strip_prefix(stem).and_then(|rest| rest.strip_suffix(".png")) {
                    if SIZE_SUFFIX.is_match(mid) {
                        return true;
                    }
                }
                base.starts_with("hicolor_apps_") && base.ends_with(&file)
            })
            .map(PathBuf::as_path)
            .collect()
    }

    /// Point `record` at an icon for `icon`.
    ///
    /// A 24x24 candidate is preferred, then 22x22; the chosen file is copied
    /// into `icons_dir`. Failing both, the smallest larger square image is
    /// scaled down to 24 pixels. Without one the record falls back to the
    /// themed icon.
    pub async fn locate_icon(&self, record: &mut BranchRecord, icon: &str, icons_dir: &Path) -> Result<()> {
        let mut img22 = None;
        let mut img24 = None;
        let mut big: Option<(&Path, u32)> = None;
        for candidate in self.candidates(icon) {
            match image_dimensions(candidate).await {
                Ok((24, 24)) => {
                    img24 = Some(candidate);
                    break;
                }
                Ok((22, 22)) => img22 = Some(candidate),
                Ok((w, h)) if w == h && w > ICON_SIZE => {
                    if big.is_none_or(|(_, size)| w < size) {
                        big = Some((candidate, w));
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Could not read {}: {}", candidate.display(), e),
            }
        }

        if let Some(chosen) = img24.or(img22) {
            let Some(name) = chosen.file_name() else {
                return Ok(());
            };
            tokio::fs::create_dir_all(icons_dir).await?;
            tokio::fs::copy(chosen, icons_dir.join(name)).await?;
            debug!("Using icon {} for {}", chosen.display(), record.ident);
            set_icon(record, name);
            return Ok(());
        }

        if let Some((source, size)) = big {
            let Some(name) = source.file_name() else {
                return Ok(());
            };
            tokio::fs::create_dir_all(icons_dir).await?;
            scale_icon(source.to_path_buf(), icons_dir.join(name)).await?;
            debug!("Scaled {}px icon {} for {}", size, source.display(), record.ident);
            set_icon(record, name);
            return Ok(());
        }

        let stem = icon.strip_suffix(".png").unwrap_or(icon);
        if record.icon_name.as_deref() != Some(stem) {
            record.icon_dir = Some(THEMED_ICON_DIR.to_string());
            record.icon_name = Some(stem.to_string());
        }
        Ok(())
    }
}

fn set_icon(record: &mut BranchRecord, file_name: &OsStr) {
    record.icon_dir = Some("apps".to_string());
    record.icon_name = Some(file_name.to_string_lossy().trim_end_matches(".png").to_string());
}

/// Width and height of an image file
pub async fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    let path = path.to_path_buf();
    let dims = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
        .await
        .context("Image decoding panicked")??;
    Ok(dims)
}

/// Write a copy of `source` shrunk to fit the icon size, as PNG
async fn scale_icon(source: PathBuf, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let thumbnail = image::open(&source)
            .with_context(|| format!("Could not decode {}", source.display()))?
            .thumbnail(ICON_SIZE, ICON_SIZE);
        thumbnail
            .save_with_format(&dest, ImageFormat::Png)
            .with_context(|| format!("Could not write {}", dest.display()))?;
        Ok(())
    })
    .await
    .context("Icon scaling panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BranchDetails;
    use crate::scm::{RepositoryRecord, ScmKind};
    use image::RgbaImage;
    use tempfile::TempDir;

    fn app() -> BranchRecord {
        let repo = RepositoryRecord::new(ScmKind::Git, "git://git.gnome.org/", "gedit", None, None);
        BranchRecord::new("/app/git.gnome.org/gedit/gedit/master", repo, BranchDetails::Application { exec: None })
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::new(width, height).save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_prefers_24_over_22() {
        let dir = TempDir::new().unwrap();
        let icons = dir.path().join("web/icons/apps");
        let mut catalog = ImageCatalog::new();
        for (name, size) in [("gedit-22.png", 22), ("gedit-24.png", 24), ("gedit-48.png", 48)] {
            catalog.add(write_png(dir.path(), name, size, size));
        }

        let mut record = app();
        catalog.locate_icon(&mut record, "gedit", &icons).await.unwrap();
        assert_eq!(record.icon_dir.as_deref(), Some("apps"));
        assert_eq!(record.icon_name.as_deref(), Some("gedit-24"));
        assert!(icons.join("gedit-24.png").exists());
    }

    #[tokio::test]
    async fn test_scales_smallest_larger_icon() {
        let dir = TempDir::new().unwrap();
        let icons = dir.path().join("web/icons/apps");
        let mut catalog = ImageCatalog::new();
        catalog.add(write_png(dir.path(), "gedit-64.png", 64, 64));
        catalog.add(write_png(dir.path(), "gedit-48.png", 48, 48));
        catalog.add(write_png(dir.path(), "gedit-16.png", 16, 16));

        let mut record = app();
        catalog.locate_icon(&mut record, "gedit", &icons).await.unwrap();
        assert_eq!(record.icon_dir.as_deref(), Some("apps"));
        assert_eq!(record.icon_name.as_deref(), Some("gedit-48"));
        assert_eq!(image_dimensions(&icons.join("gedit-48.png")).await.unwrap(), (24, 24));
        assert!(!icons.join("gedit-64.png").exists());
    }

    #[tokio::test]
    async fn test_themed_fallback() {
        let dir = TempDir::new().unwrap();
        let mut catalog = ImageCatalog::new();
        catalog.add(write_png(dir.path(), "gedit-48.png", 48, 48));

        let mut record = app();
        catalog.locate_icon(&mut record, "accessories-text-editor", dir.path()).await.unwrap();
        assert_eq!(record.icon_dir.as_deref(), Some(THEMED_ICON_DIR));
        assert_eq!(record.icon_name.as_deref(), Some("accessories-text-editor"));
    }

    #[tokio::test]
    async fn test_unreadable_candidates_are_skipped() {
        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("gedit.png");
        std::fs::write(&fake, b"not a png at all, just text....").unwrap();
        assert!(image_dimensions(&fake).await.is_err());

        let mut catalog = ImageCatalog::new();
        catalog.add(fake);
        let mut record = app();
        catalog.locate_icon(&mut record, "gedit", dir.path()).await.unwrap();
        assert_eq!(record.icon_dir.as_deref(), Some(THEMED_ICON_DIR));
        assert_eq!(record.icon_name.as_deref(), Some("gedit"));
    }
}
