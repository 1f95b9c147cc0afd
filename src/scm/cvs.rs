//! cvsps patch set output

use time::UtcOffset;
use tracing::warn;

use crate::model::{AuthorIdentity, Commit, CommitFile};

use super::date::parse_cvs_date;

const SEPARATOR: &str = "---------------------";

#[derive(PartialEq)]
enum Section {
    Header,
    Log,
    Members,
}

struct PatchSet {
    id: String,
    author: Option<String>,
    date: Option<String>,
    comment: String,
    files: Vec<CommitFile>,
}

/// Parse `cvsps -q -u -b <branch>` output into oldest-first commits.
///
/// The `since` patch set is excluded; entries without a parseable date are skipped.
pub fn parse_patchsets(output: &str, since: Option<&str>, local: UtcOffset) -> Vec<Commit> {
    let mut commits = Vec::new();
    let mut lines = output.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(id) = line.strip_prefix("PatchSet ") else {
            continue;
        };
        let mut set = PatchSet {
            id: id.trim().to_string(),
            author: None,
            date: None,
            comment: String::new(),
            files: Vec::new(),
        };
        let mut section = Section::Header;
        let mut blank = false;

        while let Some(line) = lines.next_if(|l| *l != SEPARATOR) {
            match section {
                Section::Log => {
                    if blank {
                        blank = false;
                        if line.trim() == "Members:" {
                            section = Section::Members;
                        } else {
                            set.comment.push('\n');
                            // the line after a blank one is content too
                            if !line.is_empty() {
                                set.comment.push_str(line);
                                set.comment.push('\n');
                            } else {
                                blank = true;
                            }
                        }
                    } else if line.is_empty() {
                        blank = true;
                    } else {
                        set.comment.push_str(line);
                        set.comment.push('\n');
                    }
                }
                Section::Members => {
                    let member = line.trim();
                    if member.is_empty() {
                        continue;
                    }
                    match parse_member(member) {
                        Some(file) => set.files.push(file),
                        None => warn!(patchset = %set.id, line = member, "unparseable cvsps member"),
                    }
                }
                Section::Header => {
                    if let Some(date) = line.strip_prefix("Date: ") {
                        set.date = Some(date.trim().to_string());
                    } else if let Some(author) = line.strip_prefix("Author: ") {
                        set.author = Some(author.trim().to_string());
                    } else if line.trim() == "Log:" {
                        section = Section::Log;
                    }
                }
            }
        }
        // consume the separator
        lines.next();

        if since == Some(set.id.as_str()) {
            continue;
        }
        let Some(datetime) = set.date.as_deref().and_then(|d| parse_cvs_date(d, local)) else {
            warn!(patchset = %set.id, "skipping patch set without a parseable date");
            continue;
        };
        commits.push(Commit {
            id: set.id,
            author: AuthorIdentity { userid: set.author, ..Default::default() },
            datetime,
            comment: set.comment.trim_end().to_string(),
            files: set.files,
        });
    }

    commits
}

/// `path/to/file:1.4->1.5` as (file, new revision, previous revision)
fn parse_member(line: &str) -> Option<CommitFile> {
    let (file, revs) = line.rsplit_once(':')?;
    let (previous, revision) = revs.split_once("->")?;
    let previous = match previous {
        "INITIAL" | "" => None,
        prev => Some(prev.to_string()),
    };
    Some(CommitFile::new(file, revision, previous))
}
