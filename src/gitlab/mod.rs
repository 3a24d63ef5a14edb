pub mod client;
pub mod models;

pub use client::GitLabClient;
pub use models::{Branch, Project, Tag};

/// Converter for repository names from GitHub to GitLab
pub struct GithubToGitlabName;

impl GithubToGitlabName {
    /// Estimate the GitLab path a mirrored GitHub repository ends up at
    ///
    /// `_`, `a-z` and `0-9` are kept, `A-Z` lowercased and `/` becomes `_`.
    /// Anything else turns into `-`; runs of `-` are collapsed and trailing
    /// ones removed.
    pub fn convert(repo_name: &str) -> String {
        let mut result = String::with_capacity(repo_name.len());

        for c in repo_name.chars().map(Self::translate) {
            if c == '-' && result.ends_with('-') {
                continue;
            }
            result.push(c);
        }

        result.trim_end_matches('-').to_string()
    }

    fn translate(c: char) -> char {
        match c {
            '_' | 'a'..='z' | '0'..='9' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            '/' => '_',
            _ => '-',
        }
    }
}
