mod format;
mod path;

pub use format::{format_timestamp, score, weeknum};
pub use path::{base_name, relative_path, strip_suffixes};
