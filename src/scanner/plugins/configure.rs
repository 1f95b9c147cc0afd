//! Package name and version from the module's configure script

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::model::BranchDetails;
use crate::parsers::Autoconf;
use crate::routine;
use crate::scanner::context::ScanContext;
use crate::scanner::plugin::{Hook, ScanPlugin};

use super::tool_or_raw;

const SOURCES: [&str; 2] = ["configure.in", "configure.ac"];

pub struct ConfigurePlugin;

#[async_trait]
impl ScanPlugin for ConfigurePlugin {
    fn name(&self) -> &'static str {
        "configure"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::Prepare]
    }

    async fn prepare(&mut self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let root = ctx.root();
        let Some(path) = SOURCES.iter().map(|name| root.join(name)).find(|p| p.is_file()) else {
            debug!("No configure script in {}", ctx.branch.ident);
            return Ok(());
        };

        let stamp = ctx.file_stamp(&path, routine!("configure")).await?;
        if stamp.unchanged {
            debug!("Skipping file {}", stamp.path);
            return Ok(());
        }
        info!("Processing file {}", stamp.path);

        let rel = ctx.checkout_path(&path);
        let text = match tool_or_raw(ctx, "autoconf", &[rel.as_str()], &path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return Ok(());
            }
        };
        let parsed = match Autoconf::parse_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Could not parse {}: {}", stamp.path, e);
                return Ok(());
            }
        };

        debug!(
            "Package {} {} for {}",
            parsed.package_name(),
            parsed.package_version(),
            ctx.branch.ident
        );
        ctx.branch.details = BranchDetails::Module {
            package_name: Some(parsed.package_name().to_string()).filter(|n| !n.is_empty()),
            package_version: Some(parsed.package_version().to_string()).filter(|v| !v.is_empty()),
        };
        ctx.record_stamp(&stamp);
        Ok(())
    }
}
