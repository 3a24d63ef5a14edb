//! Draw a random sample of commits from GitHub
//!
//! The population consists of all commits changing files below a directory
//! that holds a manifest for the package the repository is matched with.

use super::headerless_reader;
use crate::github::models::Repository;
use crate::github::GitHubClient;
use crate::Result;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Code search for manifests of a package within one repository
pub fn manifest_search(full_name: &str, package_name: &str) -> String {
    format!("repo:{full_name} filename:AndroidManifest.xml package=\"{package_name}\"")
}

/// One commit of the population, ordered by repository then hash
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CommitInfo {
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Commit")]
    pub commit: String,
    #[serde(rename = "Message")]
    pub message: String,
}

/// Commits changing the directories of manifest files for `package_name`
pub async fn find_commits(
    github: &mut GitHubClient,
    repo: &Repository,
    package_name: &str,
) -> Result<Vec<CommitInfo>> {
    let mut commits = Vec::new();
    let manifests = github
        .search_code(&manifest_search(&repo.full_name, package_name))
        .await?;

    for manifest in manifests {
        if manifest.repository.full_name != repo.full_name {
            warn!(
                "Repository in search result does not match: {} != {}",
                repo.full_name, manifest.repository.full_name
            );
        }

        let path = Path::new(&manifest.path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        for commit in github.list_commits(&repo.full_name, &path).await? {
            commits.push(CommitInfo {
                repository: repo.full_name.clone(),
                commit: commit.sha,
                message: commit.commit.message,
            });
        }
    }

    Ok(commits)
}

/// Collect commits of all repositories in `package_list` with at least
/// `min_commits` commits
pub async fn collect_commits<R: Read>(
    package_list: R,
    min_commits: u64,
    github: &mut GitHubClient,
) -> Result<BTreeSet<CommitInfo>> {
    let mut reader = headerless_reader(package_list);
    let mut commits = BTreeSet::new();

    for record in reader.records() {
        let record = record?;
        let (Some(package_name), Some(repo_name)) = (record.get(0), record.get(1)) else {
            warn!("Row without repository name: {:?}", record);
            continue;
        };

        // Latest repository name avoids broken search queries
        let Some(repo) = github.get_repo(repo_name).await? else {
            warn!("Cannot access repository: {}", repo_name);
            continue;
        };

        if github.has_n_commits(&repo, min_commits).await? {
            debug!(
                "Download commits for package {} in repo {}.",
                package_name, repo.full_name
            );
            commits.extend(find_commits(github, &repo, package_name).await?);
        } else {
            info!(
                "Repository {} has less than {} commits. Skip.",
                repo.full_name, min_commits
            );
        }
    }

    Ok(commits)
}

/// At most `sample_size` commits drawn without replacement, sorted
pub fn draw_sample<G: Rng + ?Sized>(
    commits: BTreeSet<CommitInfo>,
    sample_size: usize,
    rng: &mut G,
) -> Vec<CommitInfo> {
    if commits.len() <= sample_size {
        return commits.into_iter().collect();
    }

    let mut sample = commits.into_iter().choose_multiple(rng, sample_size);
    sample.sort();
    sample
}

/// Write a sample of commits as CSV with columns `Repository`, `Commit` and
/// `Message` to `output`
pub async fn print_commit_sample<R: Read, W: Write>(
    package_list: R,
    min_commits: u64,
    sample_size: usize,
    github: &mut GitHubClient,
    output: W,
) -> Result<usize> {
    let commits = collect_commits(package_list, min_commits, github).await?;
    info!("Draw {} of {} commits", sample_size.min(commits.len()), commits.len());
    let sample = draw_sample(commits, sample_size, &mut rand::thread_rng());

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(output);
    writer.write_record(["Repository", "Commit", "Message"])?;
    for commit in &sample {
        writer.serialize(commit)?;
    }
    writer.flush()?;

    Ok(sample.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn commit(repository: &str, commit: &str) -> CommitInfo {
        CommitInfo {
            repository: repository.to_string(),
            commit: commit.to_string(),
            message: format!("Message of {commit}"),
        }
    }

    #[test]
    fn test_manifest_search() {
        assert_eq!(
            manifest_search("foo/bar", "com.example"),
            "repo:foo/bar filename:AndroidManifest.xml package=\"com.example\""
        );
    }

    #[test]
    fn test_draw_sample_keeps_small_population() {
        let commits = BTreeSet::from([commit("b/b", "2"), commit("a/a", "1")]);
        let sample = draw_sample(commits, 5, &mut StdRng::seed_from_u64(7));
        assert_eq!(sample, vec![commit("a/a", "1"), commit("b/b", "2")]);
    }

    #[test]
    fn test_draw_sample_is_sorted_subset() {
        let commits: BTreeSet<_> = (0..50).map(|i| commit("a/a", &format!("{i:02}"))).collect();
        let sample = draw_sample(commits.clone(), 10, &mut StdRng::seed_from_u64(7));

        assert_eq!(sample.len(), 10);
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
        assert!(sample.iter().all(|c| commits.contains(c)));
    }
}
