//! Sweep progress display
//!
//! A sweep shows one bar counting module branches, and each branch scan adds
//! a bar for the phase it is in while history is imported and files walked.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ScanState;

/// Part of a branch scan that reports progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Commits read from the repository
    History,
    /// Files of the checkout handed to the plugins
    Walk,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::History => "history",
            Phase::Walk => "files",
        }
    }
}

/// One running phase
pub trait PhaseHandle: Send + Sync {
    fn inc(&self, n: u64);
    /// What is being worked on right now
    fn set_message(&self, msg: &str);
    fn finish(&self);
}

/// Receives the progress of branch scans
pub trait ProgressReporter: Send + Sync {
    fn phase(&self, branch: &str, phase: Phase, total: u64) -> Box<dyn PhaseHandle>;
    /// A branch scan ended in `state`
    fn branch_done(&self, branch: &str, state: ScanState);
}

/// Discards everything, for tests and library use
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn phase(&self, _branch: &str, _phase: Phase, _total: u64) -> Box<dyn PhaseHandle> {
        Box::new(NoopHandle)
    }

    fn branch_done(&self, _branch: &str, _state: ScanState) {}
}

struct NoopHandle;

impl PhaseHandle for NoopHandle {
    fn inc(&self, _n: u64) {}
    fn set_message(&self, _msg: &str) {}
    fn finish(&self) {}
}

/// Indicatif bars for a sweep over `total` module branches
pub struct SweepProgress {
    multi: MultiProgress,
    branches: ProgressBar,
    failed: AtomicUsize,
}

impl SweepProgress {
    /// Bars are drawn only when `visible`; counts are kept either way.
    pub fn new(total: u64, visible: bool) -> Self {
        let target = if visible { ProgressDrawTarget::stderr() } else { ProgressDrawTarget::hidden() };
        let multi = MultiProgress::with_draw_target(target);
        let branches = multi.add(ProgressBar::new(total));
        branches.set_style(style("{spinner:.green} modules [{bar:40.cyan/blue}] {pos}/{len} {msg}"));
        Self { multi, branches, failed: AtomicUsize::new(0) }
    }

    pub fn scanned(&self) -> u64 {
        self.branches.position()
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.branches.finish_and_clear();
    }
}

impl ProgressReporter for SweepProgress {
    fn phase(&self, branch: &str, phase: Phase, total: u64) -> Box<dyn PhaseHandle> {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(style("  {prefix} {wide_msg} {pos}/{len}"));
        bar.set_prefix(format!("{} {}", short_name(branch), phase.label()));
        Box::new(BarHandle(bar))
    }

    fn branch_done(&self, branch: &str, state: ScanState) {
        if state == ScanState::Failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.branches.set_message(format!("{} {}", short_name(branch), state));
        self.branches.inc(1);
    }
}

struct BarHandle(ProgressBar);

impl PhaseHandle for BarHandle {
    fn inc(&self, n: u64) {
        self.0.inc(n);
    }

    fn set_message(&self, msg: &str) {
        self.0.set_message(msg.to_string());
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// `module/branch` out of a `/mod/server/module/branch` ident
fn short_name(ident: &str) -> &str {
    ident.splitn(4, '/').nth(3).filter(|s| !s.is_empty()).unwrap_or(ident)
}
