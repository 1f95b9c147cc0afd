//! `svn info` and `svn log -v` output

use time::OffsetDateTime;
use tracing::warn;

use crate::model::{AuthorIdentity, Commit, CommitFile};

use super::date::parse_svn_date;

fn is_separator(line: &str) -> bool {
    line.len() == 72 && line.bytes().all(|b| b == b'-')
}

/// `Repository Root:` value from `svn info`
pub fn parse_repository_root(info: &str) -> Option<String> {
    info.lines()
        .find_map(|l| l.strip_prefix("Repository Root:"))
        .map(|root| root.trim().to_string())
}

/// `Last Changed Rev:` and `Last Changed Date:` from `svn info`
pub fn parse_last_changed(info: &str) -> Option<(String, OffsetDateTime)> {
    let rev = info.lines().find_map(|l| l.strip_prefix("Last Changed Rev:"))?.trim();
    let date = info.lines().find_map(|l| l.strip_prefix("Last Changed Date:"))?;
    Some((rev.to_string(), parse_svn_date(date)?))
}

/// Parse verbose log output into oldest-first commits.
///
/// `location` is the full URL of the tracked branch. Changed paths under it
/// are made relative to it; others keep their repository path with a leading
/// `/`. Commits touching nothing under the branch are dropped, as is `since`.
pub fn parse_log(output: &str, root: &str, location: &str, since: Option<&str>) -> Vec<Commit> {
    let root = root.trim_end_matches('/');
    let location = location.trim_end_matches('/');
    let mut commits = Vec::new();

    let terminator = "-".repeat(72);
    let mut stanza: Vec<&str> = Vec::new();
    for line in output.lines().chain(std::iter::once(terminator.as_str())) {
        if !is_separator(line) {
            stanza.push(line);
            continue;
        }
        if stanza.iter().any(|l| !l.trim().is_empty()) {
            if let Some(commit) = parse_entry(&stanza, root, location, since) {
                commits.push(commit);
            }
        }
        stanza.clear();
    }

    commits
}

fn parse_entry(lines: &[&str], root: &str, location: &str, since: Option<&str>) -> Option<Commit> {
    let mut lines = lines.iter().copied().skip_while(|l| l.trim().is_empty());
    let header = lines.next()?;
    let fields: Vec<&str> = header.split('|').map(str::trim).collect();
    let (Some(rev), Some(author), Some(date)) = (fields.first(), fields.get(1), fields.get(2)) else {
        warn!(header, "unparseable svn log header");
        return None;
    };
    let id = rev.trim_start_matches('r').to_string();
    let Ok(number) = id.parse::<u64>() else {
        warn!(header, "unparseable svn revision");
        return None;
    };
    let Some(datetime) = parse_svn_date(date) else {
        warn!(header, "unparseable svn date");
        return None;
    };
    let previous = number.checked_sub(1).map(|n| n.to_string());

    let mut files = Vec::new();
    let mut on_branch = false;
    let mut rest = lines.peekable();
    if rest.next_if(|l| l.trim() == "Changed paths:").is_some() {
        while let Some(line) = rest.next_if(|l| !l.trim().is_empty()) {
            let path = line.trim().get(3..).unwrap_or("");
            let full = format!("{root}/{path}");
            let mut filename = match full.strip_prefix(location) {
                Some(tail) if tail.is_empty() || tail.starts_with('/') => {
                    on_branch = true;
                    tail.trim_start_matches('/').to_string()
                }
                _ => format!("/{path}"),
            };
            if let Some(i) = filename.find("(from ") {
                filename.truncate(i);
            }
            let filename = match filename.trim() {
                "" => ".".to_string(),
                name => name.to_string(),
            };
            files.push(CommitFile::new(filename, id.clone(), previous.clone()));
        }
    }
    rest.next_if(|l| l.trim().is_empty());
    let comment: Vec<&str> = rest.collect();

    if since == Some(id.as_str()) || !on_branch {
        return None;
    }

    Some(Commit {
        id,
        author: AuthorIdentity::userid(*author),
        datetime,
        comment: comment.join("\n").trim_end().to_string(),
        files,
    })
}
