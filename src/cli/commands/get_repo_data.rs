use super::headerless_reader;
use crate::github::models::RepoMetadata;
use crate::github::GitHubClient;
use crate::Result;
use std::io::{Read, Write};
use tracing::{info, warn};

/// Metadata of a repository including the number of commits in its main
/// branch, `None` if the repository cannot be found
pub async fn download_repo_data(full_name: &str, github: &mut GitHubClient) -> Result<Option<RepoMetadata>> {
    let Some(repo) = github.get_repo(full_name).await? else {
        warn!("Cannot get repository {}", full_name);
        return Ok(None);
    };

    let mut data = repo.meta_data();
    data.commit_count = Some(github.count_commits(&repo, -1).await?);
    Ok(Some(data))
}

/// Write metadata of the repository in the second column of each row of
/// `package_list` to `output`
pub async fn get_repo_data<R: Read, W: Write>(
    package_list: R,
    github: &mut GitHubClient,
    output: W,
) -> Result<usize> {
    let mut reader = headerless_reader(package_list);
    let mut writer = csv::Writer::from_writer(output);
    let mut rows = 0;

    for record in reader.records() {
        let record = record?;
        let Some(repo_name) = record.get(1) else {
            warn!(
                "Package {} does not contain a repo name.",
                record.get(0).unwrap_or_default()
            );
            continue;
        };

        info!("Get data for {}", repo_name);
        if let Some(data) = download_repo_data(repo_name, github).await? {
            writer.serialize(&data)?;
            writer.flush()?;
            rows += 1;
        }
    }

    Ok(rows)
}
