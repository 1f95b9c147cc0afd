use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::scanner::ScanOptions;
use crate::scm::ScmKind;

#[derive(Parser, Debug)]
#[command(name = "scmsweep", about = "Scan module checkouts for documents, translations and applications")]
pub struct Cli {
    /// Configuration file (default: <config dir>/scmsweep/scmsweep.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the checkout root
    #[arg(long, global = true)]
    pub scm_root: Option<PathBuf>,

    /// Override the database file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Skip history import and activity
    #[arg(long, global = true)]
    pub no_history: bool,

    /// Process every file even when its stamp is current
    #[arg(long, global = true)]
    pub no_timestamps: bool,

    /// Do not update existing checkouts
    #[arg(long, global = true)]
    pub no_update: bool,

    /// Show progress bars
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a module branch
    Add {
        #[arg(long, value_parser = parse_kind)]
        kind: ScmKind,
        /// Server URL, or CVS root
        #[arg(long)]
        server: String,
        #[arg(long)]
        module: String,
        /// Defaults to the kind's main branch
        #[arg(long)]
        branch: Option<String>,
        /// Repository path when it differs from the module name
        #[arg(long)]
        path: Option<String>,
    },
    /// Scan registered module branches
    Sweep {
        /// SQL LIKE pattern on branch identifiers, e.g. `/mod/git.gnome.org/%`
        pattern: Option<String>,
    },
}

impl Cli {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            history: !self.no_history,
            timestamps: !self.no_timestamps,
            update: !self.no_update,
        }
    }
}

fn parse_kind(value: &str) -> Result<ScmKind, String> {
    value.parse().map_err(|e: crate::error::ScmError| e.to_string())
}
