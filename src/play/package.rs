use crate::search::{GithubLinkSearch, SearchMatch};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Package name mapped to GitHub repositories with a manifest declaring it
pub type PackageRepos = HashMap<String, Vec<String>>;

/// An Android package to match against repositories on GitHub
///
/// The package name is the one defined in the Android manifest file and
/// used as identifier on Google Play.
#[derive(Debug, Clone)]
pub struct Package {
    pub package_name: String,
    details: Value,
    search_results: Vec<SearchMatch>,
    github_links: BTreeSet<String>,
    github_repos: Vec<String>,
    /// Linked repositories which also contain a manifest for this package
    pub repos: Vec<String>,
}

impl Package {
    pub fn new(package_name: impl Into<String>, details: Value) -> Self {
        Self {
            package_name: package_name.into(),
            details,
            search_results: Vec::new(),
            github_links: BTreeSet::new(),
            github_repos: Vec::new(),
            repos: Vec::new(),
        }
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    pub fn is_known_package(&self, known_packages: &PackageRepos) -> bool {
        known_packages.contains_key(&self.package_name)
    }

    /// Search Google Play details for links to GitHub
    ///
    /// Links are stored as their first two path segments, which potentially
    /// equal a repository identifier.
    pub fn search_github_links(&mut self) -> &BTreeSet<String> {
        let mut search = GithubLinkSearch::new();
        search.search(&self.details);
        self.github_links = search.links();
        self.search_results = search.results().to_vec();
        &self.github_links
    }

    pub fn search_results(&self) -> &[SearchMatch] {
        &self.search_results
    }

    pub fn github_links(&self) -> &BTreeSet<String> {
        &self.github_links
    }

    /// Take the repositories known for this package name
    pub fn set_github_repos(&mut self, known_packages: &PackageRepos) {
        self.github_repos = known_packages
            .get(&self.package_name)
            .cloned()
            .unwrap_or_default();
    }

    pub fn github_repos(&self) -> &[String] {
        &self.github_repos
    }

    /// Only one repository on GitHub mentions this package
    pub fn has_unique_github_repo(&self) -> bool {
        self.github_repos.iter().collect::<HashSet<_>>().len() == 1
    }

    pub fn has_github_links(&self) -> bool {
        !self.github_links.is_empty()
    }

    pub fn has_repo_links(&self) -> bool {
        !self.repos.is_empty()
    }

    pub fn has_too_many_repo_links(&self) -> bool {
        self.repos.len() > 1
    }

    /// Keep links from Google Play that point to a repository which also
    /// contains a manifest for this package
    pub fn match_repos_to_links(&mut self) {
        let matching = self
            .github_links
            .iter()
            .filter(|link| self.github_repos.contains(link))
            .cloned()
            .collect::<Vec<_>>();
        self.repos.extend(matching);
    }
}
