use super::column;
use crate::github::GitHubClient;
use crate::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Bare clone the default branch of `full_name` into
/// `<outdir>/<full_name>.git`
///
/// Returns the path of the clone, `None` if the repository cannot be found
/// or cloning fails.
pub async fn clone_repo(
    full_name: &str,
    outdir: &Path,
    github: &mut GitHubClient,
    git_bin: &Path,
) -> Result<Option<PathBuf>> {
    let Some(repo) = github.get_repo(full_name).await? else {
        warn!("Cannot get repository {} from GitHub", full_name);
        return Ok(None);
    };
    let Some(clone_url) = repo.clone_url.as_deref() else {
        warn!("Repository {} has no clone URL", full_name);
        return Ok(None);
    };

    let path = outdir.join(format!("{full_name}.git"));
    let branch = repo.default_branch.as_deref().unwrap_or_default();
    info!("Clone branch {} of {} into {}", branch, clone_url, path.display());

    let mut command = Command::new(git_bin);
    command.arg("clone").arg("--bare");
    if !branch.is_empty() {
        command.arg("--branch").arg(branch);
    }
    let output = command.arg(clone_url).arg(&path).output().await?;

    if output.status.success() {
        debug!("Successfully cloned into {}", path.display());
        Ok(Some(path))
    } else {
        error!(
            "Failed cloning {}: {}",
            clone_url,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(None)
    }
}

/// Clone all repositories in `repo_list` with at least `min_commits`
/// commits according to column `commit_count`
///
/// A `min_commits` of 0 clones every repository and does not require the
/// `commit_count` column.
pub async fn clone_repositories<R: Read>(
    repo_list: R,
    min_commits: u64,
    outdir: &Path,
    github: &mut GitHubClient,
    git_bin: &Path,
) -> Result<usize> {
    let mut reader = csv::Reader::from_reader(repo_list);
    let headers = reader.headers()?.clone();
    let full_name = column(&headers, "full_name")?;
    let commit_count = if min_commits > 0 {
        Some(column(&headers, "commit_count").map_err(|e| {
            error!("Cannot filter by commit count because input does not have a column `commit_count`");
            e
        })?)
    } else {
        None
    };

    let mut cloned = 0;
    for record in reader.records() {
        let record = record?;
        let name = record.get(full_name).unwrap_or_default();

        if let Some(index) = commit_count {
            let count = record.get(index).unwrap_or_default();
            let count: u64 = count.trim().parse().map_err(|_| {
                Error::Validation(format!("Invalid commit_count {count:?} for {name}"))
            })?;
            if count < min_commits {
                info!(
                    "Repository {} has {} commits. Required: {}",
                    name, count, min_commits
                );
                continue;
            }
        }

        if clone_repo(name, outdir, github, git_bin).await?.is_some() {
            cloned += 1;
        }
    }

    Ok(cloned)
}
