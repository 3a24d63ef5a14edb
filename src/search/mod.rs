use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// One step from the root of a JSON document to a nested value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

pub type JsonPath = Vec<PathSegment>;

/// A pattern match and the path of the string it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub path: JsonPath,
    pub matched: String,
}

/// Recursively search a parsed JSON document for a pattern
///
/// Objects and arrays are traversed depth-first. Numbers, booleans and null
/// are skipped since they cannot contain a match.
pub struct RecursiveSearch {
    pattern: Regex,
    extract: fn(&Captures) -> String,
    results: Vec<SearchMatch>,
}

impl RecursiveSearch {
    /// Search for `pattern`, recording the whole match
    pub fn new(pattern: Regex) -> Self {
        Self::with_extractor(pattern, |captures| captures[0].to_string())
    }

    /// Search for `pattern`, building the recorded match from its captures
    pub fn with_extractor(pattern: Regex, extract: fn(&Captures) -> String) -> Self {
        Self {
            pattern,
            extract,
            results: Vec::new(),
        }
    }

    /// Search `haystack`, appending matches to the results
    pub fn search(&mut self, haystack: &Value) {
        let mut path = Vec::new();
        self.search_at(haystack, &mut path);
    }

    fn search_at(&mut self, haystack: &Value, path: &mut JsonPath) {
        match haystack {
            Value::Object(map) => {
                for (key, value) in map {
                    path.push(PathSegment::Key(key.clone()));
                    self.search_at(value, path);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    self.search_at(item, path);
                    path.pop();
                }
            }
            Value::String(s) => {
                for captures in self.pattern.captures_iter(s) {
                    self.results.push(SearchMatch {
                        path: path.clone(),
                        matched: (self.extract)(&captures),
                    });
                }
            }
            Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }

    pub fn results(&self) -> &[SearchMatch] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SearchMatch> {
        self.results
    }
}

fn github_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)github\.com/([a-z0-9_-]+)/([a-z0-9_-]+)|github\.com%2F([a-z0-9_-]+)%2F([a-z0-9_-]+)",
        )
        .expect("GitHub link pattern is valid")
    })
}

/// Join whichever pair of alternate groups participated in the match
fn fold_link_groups(captures: &Captures) -> String {
    match (captures.get(1), captures.get(2)) {
        (Some(owner), Some(name)) => format!("{}/{}", owner.as_str(), name.as_str()),
        _ => format!(
            "{}/{}",
            captures.get(3).map_or("", |m| m.as_str()),
            captures.get(4).map_or("", |m| m.as_str())
        ),
    }
}

/// Search a JSON document for links to GitHub
///
/// Records the first two path segments of every link, which potentially
/// name a repository. URL encoded slashes (`%2F`) are matched as well.
///
/// ```
/// use repo_mining::search::GithubLinkSearch;
/// use serde_json::json;
///
/// let mut search = GithubLinkSearch::new();
/// search.search(&json!({
///     "description": "Code: https://github.com/google/battery-historian/blob/master/README.md",
///     "url": "https:%2F%2Fgithub.com%2Fblog%2Fcategory%2Fengineering",
/// }));
/// let links = search.links();
/// assert!(links.contains("google/battery-historian"));
/// assert!(links.contains("blog/category"));
/// ```
pub struct GithubLinkSearch {
    inner: RecursiveSearch,
}

impl Default for GithubLinkSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubLinkSearch {
    pub fn new() -> Self {
        Self {
            inner: RecursiveSearch::with_extractor(github_link_pattern().clone(), fold_link_groups),
        }
    }

    pub fn search(&mut self, haystack: &Value) {
        self.inner.search(haystack);
    }

    pub fn results(&self) -> &[SearchMatch] {
        self.inner.results()
    }

    /// Distinct `<owner>/<name>` candidates found so far
    pub fn links(&self) -> BTreeSet<String> {
        self.inner
            .results()
            .iter()
            .map(|r| r.matched.clone())
            .collect()
    }
}
