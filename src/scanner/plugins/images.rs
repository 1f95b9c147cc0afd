//! Catalogues PNG files for the icon lookups of later plugins

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};

pub struct ImagesPlugin;

#[async_trait]
impl ScanPlugin for ImagesPlugin {
    fn name(&self) -> &'static str {
        "images"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::File]
    }

    async fn process_file(&mut self, ctx: &mut ScanContext<'_>, dir: &Path, basename: &str) -> Result<()> {
        if basename.ends_with(".png") {
            ctx.images.add(dir.join(basename));
        }
        Ok(())
    }
}
