//! Stateless file-format extractors used by the scan plugins

mod autoconf;
mod automake;
mod docbook;
mod keyfile;
mod po;

pub use autoconf::Autoconf;
pub use automake::{Automake, MAX_EXPANSION_DEPTH, expand_with};
pub use docbook::{Credit, DocbookInfo};
pub use keyfile::KeyFile;
pub use po::{MessageStatus, Po};
