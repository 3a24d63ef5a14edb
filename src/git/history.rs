use crate::git::bare::BareGit;
use crate::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::error;

const COMMIT_SEPARATOR: &[u8] = b"\n------\n";
const SECTION_SEPARATOR: &[u8] = b"\n---\n";
const MESSAGE_INDENT: usize = 4;

/// `git log` format producing blocks of metadata, message and shortstat
///
/// The message is indented by four spaces so that it cannot contain a
/// separator line.
const PRETTY_FORMAT: &str = concat!(
    "--pretty=format:",
    "%n------%n",
    "id:%H%n",
    "short_id:%h%n",
    "parent_ids:%P%n",
    "author_name:%an%n",
    "author_email:%ae%n",
    "authored_date:%ad%n",
    "committer_name:%cn%n",
    "committer_email:%ce%n",
    "committed_date:%cd%n",
    "title:%s%n",
    "---%n",
    "%w(0,4,4)%B%w(0,0,0)%n",
    "---%n",
);

fn stats_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^ ([0-9]+) files? changed(?:, ([0-9]+) insertions?...)?(?:, ([0-9]+) deletions?...)?",
        )
        .expect("shortstat pattern is valid")
    })
}

/// Line counts of a `--shortstat` summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

impl DiffStats {
    pub fn new(additions: u64, deletions: u64) -> Self {
        Self {
            additions,
            deletions,
            total: additions + deletions,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    pub short_id: String,
    pub parent_ids: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub authored_date: i64,
    pub committer_name: String,
    pub committer_email: String,
    pub committed_date: i64,
    pub title: String,
    pub message: String,
    pub stats: DiffStats,
}

/// Row of `commits.csv`
#[derive(Debug, Serialize)]
pub struct CommitRow<'a> {
    pub id: &'a str,
    pub short_id: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
    pub author_name: &'a str,
    pub author_email: &'a str,
    pub committer_name: &'a str,
    pub committer_email: &'a str,
    pub authored_date: i64,
    pub committed_date: i64,
    pub parent_ids: String,
}

impl Commit {
    pub fn to_row(&self) -> CommitRow<'_> {
        CommitRow {
            id: &self.id,
            short_id: &self.short_id,
            title: &self.title,
            message: &self.message,
            additions: self.stats.additions,
            deletions: self.stats.deletions,
            total: self.stats.total,
            author_name: &self.author_name,
            author_email: &self.author_email,
            committer_name: &self.committer_name,
            committer_email: &self.committer_email,
            authored_date: self.authored_date,
            committed_date: self.committed_date,
            parent_ids: self.parent_ids.join(","),
        }
    }
}

/// Parsed access to the commit history of a bare repository
pub struct GitHistory {
    git: BareGit,
}

impl GitHistory {
    pub fn new(git: BareGit) -> Self {
        Self { git }
    }

    pub fn git(&self) -> &BareGit {
        &self.git
    }

    /// All commits reachable from any ref
    pub async fn commits(&self) -> Result<Vec<Commit>> {
        let options: Vec<String> = ["--all", "--date=raw", "--shortstat", PRETTY_FORMAT]
            .iter()
            .map(|o| o.to_string())
            .collect();
        let output = self.git.log(&options).await?;

        parse_log(&output).map_err(|e| {
            error!(
                "Cannot parse history of {}: {}",
                self.git.git_dir().display(),
                e
            );
            e
        })
    }
}

/// Parse the complete `git log` output produced with the history format
pub fn parse_log(output: &[u8]) -> Result<Vec<Commit>> {
    split_bytes(output, COMMIT_SEPARATOR)
        .into_iter()
        .filter(|block| !block.is_empty())
        .map(parse_commit)
        .collect()
}

/// Parse the output of one commit
pub fn parse_commit(block: &[u8]) -> Result<Commit> {
    let sections = split_bytes(block, SECTION_SEPARATOR);
    let [meta, message, stats] = sections.as_slice() else {
        return Err(Error::CommitParse(format!(
            "Expected 3 sections but found {} in: {}",
            sections.len(),
            String::from_utf8_lossy(block)
        )));
    };

    let mut commit = parse_meta(meta)?;
    commit.message = String::from_utf8_lossy(&unindent_message(message, MESSAGE_INDENT)).into_owned();
    commit.stats = parse_stats(&String::from_utf8_lossy(stats));
    Ok(commit)
}

/// Parse `key:value` lines of commit metadata
///
/// Lines are split at the first colon before decoding because some non-ASCII
/// bytes can be mistaken for line breaks and hide the colon.
fn parse_meta(input: &[u8]) -> Result<Commit> {
    let mut commit = Commit::default();

    for line in input.split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let Some(colon) = line.iter().position(|b| *b == b':') else {
            return Err(Error::CommitParse(format!(
                "Metadata line without key: {}",
                String::from_utf8_lossy(line)
            )));
        };
        let key = String::from_utf8_lossy(&line[..colon]);
        let value = String::from_utf8_lossy(&line[colon + 1..]).into_owned();

        match key.as_ref() {
            "id" => commit.id = value,
            "short_id" => commit.short_id = value,
            "parent_ids" => {
                commit.parent_ids = value.split_whitespace().map(String::from).collect()
            }
            "author_name" => commit.author_name = value,
            "author_email" => commit.author_email = value,
            "authored_date" => commit.authored_date = raw_date_to_timestamp(&value)?,
            "committer_name" => commit.committer_name = value,
            "committer_email" => commit.committer_email = value,
            "committed_date" => commit.committed_date = raw_date_to_timestamp(&value)?,
            "title" => commit.title = value,
            _ => {}
        }
    }

    Ok(commit)
}

/// POSIX timestamp of a raw git date like `1518046601 +0100`
pub fn raw_date_to_timestamp(date: &str) -> Result<i64> {
    date.split_whitespace()
        .next()
        .and_then(|ts| ts.parse().ok())
        .ok_or_else(|| Error::CommitParse(format!("Invalid raw date: {date}")))
}

/// Parse `--shortstat` output, all zeros if there is no summary line
pub fn parse_stats(stats: &str) -> DiffStats {
    for line in stats.lines() {
        if let Some(captures) = stats_pattern().captures(line) {
            let count = |group: usize| {
                captures
                    .get(group)
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(0)
            };
            return DiffStats::new(count(2), count(3));
        }
    }
    DiffStats::default()
}

/// Remove `level` bytes at the beginning of every line
///
/// Only `\n` separates lines. Lines shorter than `level` become empty.
pub fn unindent_message(message: &[u8], level: usize) -> Vec<u8> {
    message
        .split(|b| *b == b'\n')
        .map(|line| line.get(level..).unwrap_or(&[]))
        .collect::<Vec<_>>()
        .join(&b'\n')
}

fn split_bytes<'a>(input: &'a [u8], separator: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + separator.len() <= input.len() {
        if &input[i..i + separator.len()] == separator {
            parts.push(&input[start..i]);
            i += separator.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stats() {
        let cases = [
            (" 1 file changed, 104 insertions(+), 22 deletions(-)\n", (104, 22, 126)),
            (" 19 files changed, 2606 deletions(-)\n", (0, 2606, 2606)),
            (" 1 file changed, 5 insertions(+), 4 deletions(-)\n", (5, 4, 9)),
            (" 1 file changed, 21 insertions(+)\n", (21, 0, 21)),
            ("\n 1 file changed, 21 insertions(+)\n", (21, 0, 21)),
            (" 1 file changed, 1 insertion(+), 3 deletions(-)\n", (1, 3, 4)),
            (" 1 file changed, 4 insertions(+), 1 deletion(-)\n", (4, 1, 5)),
            ("      ", (0, 0, 0)),
            ("\n\n\n", (0, 0, 0)),
            ("", (0, 0, 0)),
        ];

        for (input, (additions, deletions, total)) in cases {
            assert_eq!(
                parse_stats(input),
                DiffStats {
                    additions,
                    deletions,
                    total
                },
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_unindent_message() {
        assert_eq!(unindent_message(b"    foo bar", 4), b"foo bar");
        assert_eq!(unindent_message(b"foo bar", 2), b"o bar");
        assert_eq!(
            unindent_message(b"    foo\n        bar\n    baz", 4),
            b"foo\n    bar\nbaz"
        );
        assert_eq!(unindent_message(b"", 4), b"");
        assert_eq!(unindent_message(b" \n ", 4), b"\n");
        assert_eq!(unindent_message(b"    \rfoo", 4), b"\rfoo");
    }

    #[test]
    fn test_raw_date_to_timestamp() {
        assert_eq!(raw_date_to_timestamp("1518046601 +0100").unwrap(), 1518046601);
        assert!(raw_date_to_timestamp("").is_err());
    }

    const LOG: &[u8] = b"
------
id:1111111111111111111111111111111111111111
short_id:1111111
parent_ids:2222222222222222222222222222222222222222 3333333333333333333333333333333333333333
author_name:Jane Doe
author_email:jane@example.com
authored_date:1518046601 +0100
committer_name:John Roe
committer_email:john@example.com
committed_date:1518046700 +0100
title:Merge: fix things
---
    Merge: fix things

    Body line
---

 2 files changed, 10 insertions(+), 3 deletions(-)

------
id:2222222222222222222222222222222222222222
short_id:2222222
parent_ids:
author_name:Jane Doe
author_email:jane@example.com
authored_date:1518000000 +0100
committer_name:Jane Doe
committer_email:jane@example.com
committed_date:1518000000 +0100
title:Initial commit
---
    Initial commit
---
";

    #[test]
    fn test_parse_log() {
        let commits = parse_log(LOG).unwrap();
        assert_eq!(commits.len(), 2);

        let merge = &commits[0];
        assert_eq!(merge.short_id, "1111111");
        assert_eq!(merge.parent_ids.len(), 2);
        assert_eq!(merge.author_name, "Jane Doe");
        assert_eq!(merge.committer_name, "John Roe");
        assert_eq!(merge.authored_date, 1518046601);
        assert_eq!(merge.committed_date, 1518046700);
        assert_eq!(merge.title, "Merge: fix things");
        assert_eq!(merge.message, "Merge: fix things\n\nBody line");
        assert_eq!(merge.stats, DiffStats::new(10, 3));

        let initial = &commits[1];
        assert!(initial.parent_ids.is_empty());
        assert_eq!(initial.stats, DiffStats::default());
        assert_eq!(initial.to_row().parent_ids, "");
    }

    #[test]
    fn test_parse_commit_requires_three_sections() {
        assert!(matches!(
            parse_commit(b"id:abc\n---\nmessage"),
            Err(Error::CommitParse(_))
        ));
    }

    #[test]
    fn test_meta_line_without_colon_fails() {
        assert!(matches!(
            parse_commit(b"id:abc\nbroken\n---\n    msg\n---\n"),
            Err(Error::CommitParse(_))
        ));
    }

    #[test]
    fn test_meta_decodes_lossily_after_split() {
        let commit = parse_commit(b"author_name:J\xffrg\n---\n    msg\n---\n").unwrap();
        assert_eq!(commit.author_name, "J\u{fffd}rg");
    }
}
