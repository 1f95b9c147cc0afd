//! Extraction plugin interface and the ordered registry

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::model::BranchKind;

use super::context::ScanContext;

/// Points in a branch scan where a plugin is called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Once, before the tree walk
    Prepare,
    /// For every regular file of the walk
    File,
    /// Once, after the walk
    PostProcess,
    /// Once, after the module took its name and icon from its default child
    Finish,
}

/// An extraction plugin.
///
/// A plugin is built fresh for every branch scan, so it may keep per-scan
/// state in `self`. Returning `Err` aborts the branch; unparseable input
/// should be logged and skipped instead.
#[async_trait]
pub trait ScanPlugin: Send {
    fn name(&self) -> &'static str;

    fn hooks(&self) -> &'static [Hook];

    /// Child kinds this plugin registers; these get reconciled even when
    /// nothing was found.
    fn produces(&self) -> &'static [BranchKind] {
        &[]
    }

    async fn prepare(&mut self, _ctx: &mut ScanContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn process_file(&mut self, _ctx: &mut ScanContext<'_>, _dir: &Path, _basename: &str) -> Result<()> {
        Ok(())
    }

    async fn post_process(&mut self, _ctx: &mut ScanContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn finish(&mut self, _ctx: &mut ScanContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Plugins in registration order
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn ScanPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl ScanPlugin + 'static) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with(mut self, plugin: impl ScanPlugin + 'static) -> Self {
        self.register(plugin);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Every kind some plugin produces, deduplicated
    pub fn produces(&self) -> Vec<BranchKind> {
        let mut kinds: Vec<BranchKind> = self.plugins.iter().flat_map(|p| p.produces().iter().copied()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Plugins declaring `hook`, in registration order
    pub fn with_hook(&mut self, hook: Hook) -> impl Iterator<Item = &mut Box<dyn ScanPlugin>> {
        self.plugins.iter_mut().filter(move |p| p.hooks().contains(&hook))
    }
}
