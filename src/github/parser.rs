use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn full_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^([a-z0-9-]+)/([a-z0-9_.-]+)$").expect("full name pattern is valid")
    })
}

/// Owner and name of a GitHub repository, canonically `<owner>/<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullName {
    pub owner: String,
    pub name: String,
}

impl FullName {
    /// Extract owner and repository name from a full name
    ///
    /// Fails with `Error::InvalidRepoName` if the string does not look like
    /// `<owner_login>/<repo_name>`.
    pub fn parse(full_name: &str) -> Result<Self> {
        let captures = full_name_pattern()
            .captures(full_name)
            .ok_or_else(|| Error::InvalidRepoName(full_name.to_string()))?;

        Ok(FullName {
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for FullName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FullName::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let name = FullName::parse("python/cpython").unwrap();
        assert_eq!(name.owner, "python");
        assert_eq!(name.name, "cpython");
        assert_eq!(name.to_string(), "python/cpython");
    }

    #[test]
    fn test_parse_with_separators_and_case() {
        let name = FullName::parse("Google/battery-historian_v2.0").unwrap();
        assert_eq!(name.owner, "Google");
        assert_eq!(name.name, "battery-historian_v2.0");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for input in [
            "cpython",
            "python/",
            "/cpython",
            "python/cpython/extra",
            "py_thon/cpython",
            "https://github.com/python/cpython",
            "python /cpython",
            "",
        ] {
            assert!(
                matches!(FullName::parse(input), Err(Error::InvalidRepoName(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_str() {
        let name: FullName = "foo/bar".parse().unwrap();
        assert_eq!(name, FullName::parse("foo/bar").unwrap());
    }
}
