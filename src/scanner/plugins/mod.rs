//! Extraction plugins run by the module scanner
//!
//! Registration order matters: `configure` runs first so the others can
//! resolve `@PACKAGE_NAME@`, and `images` catalogues icons before the
//! post-process hooks that look them up.

mod applets;
mod configure;
mod gdu;
mod gtkdoc;
mod images;
mod intltool;
mod keyfiles;
mod maintainers;
mod pkgconfig;
mod translations;

pub use applets::AppletsPlugin;
pub use configure::ConfigurePlugin;
pub use gdu::GduPlugin;
pub use gtkdoc::GtkDocPlugin;
pub use images::ImagesPlugin;
pub use intltool::IntltoolPlugin;
pub use keyfiles::KeyFilesPlugin;
pub use maintainers::MaintainersPlugin;
pub use pkgconfig::PkgConfigPlugin;
pub use translations::refresh_translation_stats;

use std::path::Path;
use tracing::debug;

use super::context::ScanContext;
use super::plugin::PluginRegistry;

/// All plugins in their run order
pub fn default_plugins() -> PluginRegistry {
    PluginRegistry::new()
        .with(ConfigurePlugin)
        .with(MaintainersPlugin)
        .with(ImagesPlugin)
        .with(IntltoolPlugin)
        .with(GduPlugin::default())
        .with(GtkDocPlugin)
        .with(PkgConfigPlugin::default())
        .with(KeyFilesPlugin::default())
        .with(AppletsPlugin::default())
}

/// Output of `program` run in the checkout, or the raw file when the tool
/// is missing, fails or prints nothing.
pub(crate) async fn tool_or_raw(ctx: &ScanContext<'_>, program: &str, args: &[&str], path: &Path) -> std::io::Result<String> {
    match ctx.checkout.runner().run(&ctx.root(), program, args).await {
        Ok(output) if output.success && !output.stdout.trim().is_empty() => return Ok(output.stdout),
        Ok(output) => debug!(program, error = %output.last_line(), "tool failed, reading raw file"),
        Err(e) => debug!(program, error = %e, "tool unavailable, reading raw file"),
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plugin_order() {
        let registry = default_plugins();
        assert_eq!(
            registry.names(),
            ["configure", "maintainers", "images", "intltool", "gdu", "gtkdoc", "pkgconfig", "keyfiles", "applets"]
        );
    }
}
