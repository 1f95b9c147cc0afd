//! Repository adapter: checkouts and commit histories for CVS, SVN and Git
//!
//! - **record**: repository locations and server naming
//! - **checkout**: working copies, locations, history commands
//! - **tool**: external command execution with a timeout
//! - **lock**: exclusive checkout lock
//! - **cvs** / **svn** / **git**: log output parsers
//! - **source**: the `HistorySource` trait and commit streams

mod checkout;
mod cvs;
mod date;
mod git;
mod lock;
mod record;
mod source;
mod svn;
mod tool;

pub use checkout::Checkout;
pub use date::{local_offset, parse_cvs_date, parse_git_date, parse_svn_date};
pub use lock::CheckoutLock;
pub use record::{RepositoryRecord, ScmKind, server_id, server_name};
pub use source::{CommitStream, HistorySource};
pub use tool::{DEFAULT_TOOL_TIMEOUT, ToolOutput, ToolRunner};

/// Log output parsers, exposed for callers that already hold tool output
pub mod parse {
    pub use super::cvs::parse_patchsets;
    pub use super::git::{parse_address, parse_rev_list, parse_show, parse_tip};
    pub use super::svn::{parse_last_changed, parse_log, parse_repository_root};
}
