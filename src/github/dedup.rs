use crate::github::{client::GitHubClient, models::Repository};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Repository fields the popularity cascade looks at
pub trait RepoStats {
    fn full_name(&self) -> &str;
    fn is_fork(&self) -> bool;
    fn forks(&self) -> u64;
    fn watchers(&self) -> u64;
    fn subscribers(&self) -> u64;
}

impl RepoStats for Repository {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn is_fork(&self) -> bool {
        self.fork
    }

    fn forks(&self) -> u64 {
        self.forks_count
    }

    fn watchers(&self) -> u64 {
        self.watchers_count
    }

    fn subscribers(&self) -> u64 {
        self.subscribers_count
    }
}

/// Source of repository metadata by full name
#[async_trait]
pub trait RepoLookup {
    type Repo: RepoStats + Send;

    /// `None` if the repository cannot be found
    async fn lookup(&mut self, full_name: &str) -> Result<Option<Self::Repo>>;
}

#[async_trait]
impl RepoLookup for GitHubClient {
    type Repo = Repository;

    async fn lookup(&mut self, full_name: &str) -> Result<Option<Repository>> {
        self.get_repo(full_name).await
    }
}

/// Pick the unique most popular repository
///
/// Forks are dropped first. The remaining candidates are narrowed to those
/// with the maximum number of forks, then watchers, then subscribers,
/// stopping as soon as a single one is left.
pub fn pick_most_popular<R: RepoStats>(repos: Vec<R>) -> Option<String> {
    let mut repos: Vec<R> = repos.into_iter().filter(|r| !r.is_fork()).collect();
    let metrics: [fn(&R) -> u64; 3] = [R::forks, R::watchers, R::subscribers];

    for metric in metrics {
        if repos.len() <= 1 {
            break;
        }
        let max_value = repos.iter().map(metric).max()?;
        repos.retain(|r| metric(r) == max_value);
    }

    match repos.as_slice() {
        [repo] => Some(repo.full_name().to_string()),
        _ => None,
    }
}

/// Deduplicate repositories by popularity
///
/// A single candidate is returned as is without asking GitHub. Otherwise
/// metadata is fetched for every candidate, unknown repositories are
/// skipped and renamed ones collapse onto their canonical name before
/// `pick_most_popular` decides.
pub async fn deduplicate<L>(repo_names: &[String], lookup: &mut L) -> Result<Option<String>>
where
    L: RepoLookup + Send + ?Sized,
{
    if let [repo_name] = repo_names {
        return Ok(Some(repo_name.clone()));
    }

    let mut repos: HashMap<String, L::Repo> = HashMap::new();
    for repo_name in repo_names {
        match lookup.lookup(repo_name).await? {
            Some(repo) => {
                repos.insert(repo.full_name().to_string(), repo);
            }
            None => debug!("Cannot get repository {}", repo_name),
        }
    }

    Ok(pick_most_popular(repos.into_values().collect()))
}
