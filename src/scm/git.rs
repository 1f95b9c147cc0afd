//! `git log` and `git show --name-only` output

use time::OffsetDateTime;
use tracing::warn;

use crate::model::{AuthorIdentity, Commit, CommitFile};

use super::date::parse_git_date;

/// `git log --pretty=format:%H %P` lines as oldest-first (revision, first parent)
pub fn parse_rev_list(output: &str) -> Vec<(String, Option<String>)> {
    let mut revs: Vec<(String, Option<String>)> = output
        .lines()
        .filter_map(|line| {
            let mut hashes = line.split_whitespace();
            let rev = hashes.next()?.to_string();
            Some((rev, hashes.next().map(str::to_string)))
        })
        .collect();
    revs.reverse();
    revs
}

/// Tip from `git show --name-only --pretty=format:%H%n%ad .`
pub fn parse_tip(output: &str) -> Option<(String, OffsetDateTime)> {
    let mut lines = output.lines();
    let rev = lines.next()?.trim();
    if rev.is_empty() {
        return None;
    }
    let date = parse_git_date(lines.next()?.trim())?;
    Some((rev.to_string(), date))
}

/// Split `Name <email>` into its parts
pub fn parse_address(text: &str) -> (Option<String>, Option<String>) {
    let text = text.trim();
    match (text.find('<'), text.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = text[..open].trim().trim_matches('"');
            let email = text[open + 1..close].trim();
            (
                Some(name.to_string()).filter(|n| !n.is_empty()),
                Some(email.to_string()).filter(|e| !e.is_empty()),
            )
        }
        _ if text.contains('@') && !text.contains(' ') => (None, Some(text.to_string())),
        _ => (Some(text.to_string()).filter(|n| !n.is_empty()), None),
    }
}

/// Parse one `git show --name-only <rev>` into a commit.
pub fn parse_show(output: &str, rev: &str, parent: Option<&str>) -> Option<Commit> {
    let mut author = AuthorIdentity::default();
    let mut datetime = None;
    let mut lines = output.lines().peekable();

    // header
    while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
        if let Some(addr) = line.strip_prefix("Author: ") {
            let (name, email) = parse_address(addr);
            author.name = name;
            author.email = email;
        } else if let Some(date) = line.strip_prefix("Date:") {
            datetime = parse_git_date(date.trim());
        }
    }
    lines.next();

    // indented message, blank-line delimited from the file list
    let mut comment = String::new();
    let mut blank = false;
    while let Some(&line) = lines.peek() {
        if line.trim().is_empty() {
            blank = true;
            comment.push('\n');
            lines.next();
            continue;
        }
        if blank && !line.starts_with(' ') {
            break;
        }
        blank = false;
        comment.push_str(line.strip_prefix("    ").unwrap_or(line));
        comment.push('\n');
        lines.next();
    }

    let files = lines
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|file| CommitFile::new(file, rev, parent.map(str::to_string)))
        .collect();

    let Some(datetime) = datetime else {
        warn!(rev, "git show output without a parseable date");
        return None;
    };

    Some(Commit {
        id: rev.to_string(),
        author,
        datetime,
        comment: comment.trim().to_string(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SHOW: &str = "\
commit 2b1c
Author: Jane Doe <jane@example.org>
Date:   Tue Mar 4 10:00:00 2008 +0100

    Add translations

    Second paragraph.

po/LINGUAS
po/de.po
";

    #[test]
    fn test_rev_list_is_reversed() {
        let revs = parse_rev_list("c3 b2\nb2 a1\na1\n");
        assert_eq!(revs[0], ("a1".to_string(), None));
        assert_eq!(revs[2], ("c3".to_string(), Some("b2".to_string())));
    }

    #[test]
    fn test_parse_tip() {
        let (rev, date) = parse_tip("2b1c\nTue Mar 4 10:00:00 2008 +0100\npo/LINGUAS\n").unwrap();
        assert_eq!(rev, "2b1c");
        assert_eq!(date, datetime!(2008-03-04 09:00:00 UTC));
        assert!(parse_tip("").is_none());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address("Jane Doe <jane@example.org>"),
            (Some("Jane Doe".into()), Some("jane@example.org".into()))
        );
        assert_eq!(parse_address("jane@example.org"), (None, Some("jane@example.org".into())));
        assert_eq!(parse_address("Jane"), (Some("Jane".into()), None));
    }

    #[test]
    fn test_parse_show() {
        let commit = parse_show(SHOW, "2b1c", Some("1a0b")).unwrap();
        assert_eq!(commit.author.email.as_deref(), Some("jane@example.org"));
        assert_eq!(commit.author.name.as_deref(), Some("Jane Doe"));
        assert_eq!(commit.datetime, datetime!(2008-03-04 09:00:00 UTC));
        assert_eq!(commit.comment, "Add translations\n\nSecond paragraph.");
        assert_eq!(commit.files.len(), 2);
        assert_eq!(commit.files[1], CommitFile::new("po/de.po", "2b1c", Some("1a0b".into())));
    }
}
